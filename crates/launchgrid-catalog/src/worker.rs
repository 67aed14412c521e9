use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Condvar, Mutex, RwLock};

use crate::error::CatalogError;
use crate::model::CatalogSnapshot;
use crate::reconcile::Reconciler;

/// Identifies a reconcile request. A published snapshot covers a ticket once
/// its pass started after the request was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
struct Progress {
    covered: u64,
    passes: u64,
    stopped: bool,
}

struct Shared {
    published: RwLock<Arc<CatalogSnapshot>>,
    progress: Mutex<Progress>,
    progress_changed: Condvar,
    issued: AtomicU64,
    in_flight: AtomicBool,
}

impl Shared {
    fn current(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.published.read())
    }
}

/// Single background thread that runs reconciliation passes.
///
/// Requests go through a queue of depth one: a request made while another is
/// already waiting is folded into it, so any number of requests during a
/// pass causes at most one more pass.
pub struct ReconcileWorker {
    shared: Arc<Shared>,
    requests: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ReconcileWorker {
    pub fn spawn(reconciler: Reconciler) -> Result<Self, CatalogError> {
        let shared = Arc::new(Shared {
            published: RwLock::new(Arc::new(CatalogSnapshot::default())),
            progress: Mutex::new(Progress::default()),
            progress_changed: Condvar::new(),
            issued: AtomicU64::new(0),
            in_flight: AtomicBool::new(false),
        });
        let (tx, rx) = bounded(1);
        let shared_for_thread = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("launchgrid-reconcile".into())
            .spawn(move || run(shared_for_thread, reconciler, rx))
            .map_err(CatalogError::Worker)?;
        Ok(Self {
            shared,
            requests: Some(tx),
            handle: Some(handle),
        })
    }

    /// Asks for a pass that starts after this call.
    pub fn request(&self) -> Ticket {
        let ticket = Ticket(self.shared.issued.fetch_add(1, Ordering::SeqCst) + 1);
        if let Some(requests) = &self.requests {
            match requests.try_send(()) {
                Ok(()) => tracing::trace!(ticket = ticket.0, "reconcile queued"),
                Err(TrySendError::Full(())) => {
                    tracing::trace!(ticket = ticket.0, "reconcile coalesced with pending pass")
                }
                Err(TrySendError::Disconnected(())) => {
                    tracing::warn!("reconcile worker is gone; request dropped")
                }
            }
        }
        ticket
    }

    /// Latest published snapshot, without waiting.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.shared.current()
    }

    pub fn is_busy(&self) -> bool {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    pub fn has_published(&self) -> bool {
        self.shared.current().is_published()
    }

    /// Number of passes completed so far.
    pub fn passes(&self) -> u64 {
        self.shared.progress.lock().passes
    }

    /// Blocks until a snapshot covering `ticket` is published.
    pub fn wait_for(&self, ticket: Ticket) -> Arc<CatalogSnapshot> {
        let mut progress = self.shared.progress.lock();
        while progress.covered < ticket.0 && !progress.stopped {
            self.shared.progress_changed.wait(&mut progress);
        }
        drop(progress);
        self.shared.current()
    }

    /// Like [`wait_for`](Self::wait_for) but gives up after `timeout`.
    pub fn wait_timeout(&self, ticket: Ticket, timeout: Duration) -> Option<Arc<CatalogSnapshot>> {
        let deadline = Instant::now() + timeout;
        let mut progress = self.shared.progress.lock();
        while progress.covered < ticket.0 && !progress.stopped {
            if self
                .shared
                .progress_changed
                .wait_until(&mut progress, deadline)
                .timed_out()
            {
                break;
            }
        }
        let covered = progress.covered >= ticket.0;
        drop(progress);
        covered.then(|| self.shared.current())
    }

    /// Blocks until every request issued so far is covered.
    pub fn settle(&self) -> Arc<CatalogSnapshot> {
        let latest = Ticket(self.shared.issued.load(Ordering::SeqCst));
        self.wait_for(latest)
    }
}

impl Drop for ReconcileWorker {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("reconcile worker panicked");
            }
        }
    }
}

fn run(shared: Arc<Shared>, reconciler: Reconciler, requests: Receiver<()>) {
    while requests.recv().is_ok() {
        let started = shared.issued.load(Ordering::SeqCst);
        shared.in_flight.store(true, Ordering::SeqCst);
        let generation = shared.current().generation + 1;
        // A panicking enumerator or store must not take the worker down with
        // it; waiters are released with the previous snapshot.
        match panic::catch_unwind(AssertUnwindSafe(|| reconciler.run_pass(generation))) {
            Ok(snapshot) => *shared.published.write() = Arc::new(snapshot),
            Err(payload) => tracing::error!(
                generation,
                reason = panic_reason(payload.as_ref()),
                "reconcile pass panicked; keeping the previous snapshot"
            ),
        }
        shared.in_flight.store(false, Ordering::SeqCst);

        let mut progress = shared.progress.lock();
        progress.covered = progress.covered.max(started);
        progress.passes += 1;
        shared.progress_changed.notify_all();
    }

    shared.progress.lock().stopped = true;
    shared.progress_changed.notify_all();
    tracing::debug!("reconcile worker stopped");
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;

    use crossbeam_channel::{unbounded, Receiver as ChannelReceiver, Sender as ChannelSender};
    use launchgrid_store::MetadataStore;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::enumerate::{Candidate, Enumeration, ItemEnumerator};

    const WAIT: Duration = Duration::from_secs(5);

    /// Blocks inside every enumeration until the test lets it continue.
    struct GatedEnumerator {
        calls: AtomicUsize,
        entered: ChannelSender<usize>,
        gate: ChannelReceiver<()>,
    }

    impl ItemEnumerator for GatedEnumerator {
        fn enumerate(&self, _locations: &[PathBuf]) -> Enumeration {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = self.entered.send(call);
            let _ = self.gate.recv_timeout(WAIT);
            Enumeration {
                candidates: vec![Candidate::new(
                    Some(format!("com.pass{call}")),
                    format!("Pass {call}"),
                    "/virtual",
                )],
                failures: Vec::new(),
            }
        }

        fn location_exists(&self, _location: &str) -> bool {
            true
        }
    }

    type Harness = (
        ReconcileWorker,
        Arc<GatedEnumerator>,
        ChannelReceiver<usize>,
        ChannelSender<()>,
    );

    fn gated_worker() -> Harness {
        let (entered_tx, entered_rx) = unbounded();
        let (gate_tx, gate_rx) = unbounded();
        let enumerator = Arc::new(GatedEnumerator {
            calls: AtomicUsize::new(0),
            entered: entered_tx,
            gate: gate_rx,
        });
        let reconciler = Reconciler::new(
            Arc::new(MetadataStore::in_memory()),
            enumerator.clone(),
            Vec::new(),
        );
        let worker = ReconcileWorker::spawn(reconciler).unwrap();
        (worker, enumerator, entered_rx, gate_tx)
    }

    /// Panics on its first enumeration, then reports one item.
    struct PanicsOnce {
        calls: AtomicUsize,
    }

    impl ItemEnumerator for PanicsOnce {
        fn enumerate(&self, _locations: &[PathBuf]) -> Enumeration {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("enumerator blew up");
            }
            Enumeration {
                candidates: vec![Candidate::new(Some("com.ok".into()), "Ok", "/virtual")],
                failures: Vec::new(),
            }
        }

        fn location_exists(&self, _location: &str) -> bool {
            true
        }
    }

    #[test]
    fn panicking_pass_keeps_the_worker_alive() {
        let reconciler = Reconciler::new(
            Arc::new(MetadataStore::in_memory()),
            Arc::new(PanicsOnce {
                calls: AtomicUsize::new(0),
            }),
            Vec::new(),
        );
        let worker = ReconcileWorker::spawn(reconciler).unwrap();

        let failed = worker.request();
        let kept = worker
            .wait_timeout(failed, WAIT)
            .expect("waiters released after a panicking pass");
        assert_eq!(kept.generation, 0);
        assert!(!worker.is_busy());
        assert_eq!(worker.passes(), 1);

        let retry = worker.request();
        let snapshot = worker.wait_timeout(retry, WAIT).expect("next pass published");
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.items[0].id, "com.ok");
    }

    #[test]
    fn panic_reason_reads_common_payloads() {
        let literal: Box<dyn Any + Send> = Box::new("static message");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_reason(literal.as_ref()), "static message");
        assert_eq!(panic_reason(owned.as_ref()), "owned message");
        assert_eq!(panic_reason(other.as_ref()), "unknown panic");
    }

    #[test]
    fn nothing_published_before_first_pass() {
        let (worker, _, _, _) = gated_worker();
        assert!(!worker.has_published());
        assert_eq!(worker.snapshot().generation, 0);
        assert_eq!(worker.passes(), 0);
    }

    #[test]
    fn requests_during_a_pass_coalesce_into_one() {
        let (worker, enumerator, entered, gate) = gated_worker();

        worker.request();
        assert_eq!(entered.recv_timeout(WAIT).unwrap(), 1);
        assert!(worker.is_busy());

        let mut last = worker.request();
        for _ in 0..5 {
            last = worker.request();
        }
        gate.send(()).unwrap();
        gate.send(()).unwrap();

        let snapshot = worker.wait_timeout(last, WAIT).expect("second pass published");
        assert_eq!(snapshot.generation, 2);
        assert_eq!(snapshot.items[0].id, "com.pass2");
        assert_eq!(enumerator.calls.load(Ordering::SeqCst), 2);
        assert_eq!(worker.passes(), 2);
    }

    #[test]
    fn settle_waits_for_all_requests() {
        let (worker, _, _, gate) = gated_worker();
        for _ in 0..3 {
            gate.send(()).unwrap();
        }
        worker.request();
        worker.request();
        let snapshot = worker.settle();
        assert!(snapshot.is_published());
        assert!(worker.passes() >= 1);
    }

    #[test]
    fn wait_timeout_gives_up() {
        let (worker, _, entered, _gate) = gated_worker();
        let ticket = worker.request();
        entered.recv_timeout(WAIT).unwrap();
        assert!(worker
            .wait_timeout(ticket, Duration::from_millis(20))
            .is_none());
    }
}
