#![allow(dead_code)]

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use launchgrid_catalog::{
    Candidate, Catalog, Enumeration, EnumerationError, ItemEnumerator, KeyValueStore,
    MemoryStore, MetadataStore, StoreError,
};
use parking_lot::Mutex;

pub const WAIT: Duration = Duration::from_secs(5);

/// Enumerator whose output the test sets directly.
#[derive(Default)]
pub struct ScriptedEnumerator {
    candidates: Mutex<Vec<Candidate>>,
    failures: Mutex<Vec<EnumerationError>>,
    calls: AtomicUsize,
}

impl ScriptedEnumerator {
    pub fn with_apps(apps: &[(&str, &str)]) -> Arc<Self> {
        let enumerator = Arc::new(Self::default());
        enumerator.set_apps(apps);
        enumerator
    }

    pub fn set_apps(&self, apps: &[(&str, &str)]) {
        *self.candidates.lock() = apps
            .iter()
            .map(|(id, name)| {
                Candidate::new(Some(id.to_string()), *name, format!("/Applications/{name}.app"))
            })
            .collect();
    }

    pub fn fail_location(&self, location: &str, reason: &str) {
        self.failures
            .lock()
            .push(EnumerationError::new(location, reason));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ItemEnumerator for ScriptedEnumerator {
    fn enumerate(&self, _locations: &[PathBuf]) -> Enumeration {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Enumeration {
            candidates: self.candidates.lock().clone(),
            failures: self.failures.lock().clone(),
        }
    }

    fn location_exists(&self, _location: &str) -> bool {
        true
    }
}

/// Holds every enumeration until the test opens the gate once for it.
pub struct GatedEnumerator {
    calls: AtomicUsize,
    entered: Sender<usize>,
    gate: Receiver<()>,
}

impl GatedEnumerator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ItemEnumerator for GatedEnumerator {
    fn enumerate(&self, _locations: &[PathBuf]) -> Enumeration {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.entered.send(call);
        let _ = self.gate.recv_timeout(WAIT);
        Enumeration {
            candidates: vec![Candidate::new(Some("com.a".into()), "A", "/Applications/A.app")],
            failures: Vec::new(),
        }
    }

    fn location_exists(&self, _location: &str) -> bool {
        true
    }
}

pub struct Gated {
    pub catalog: Catalog,
    pub enumerator: Arc<GatedEnumerator>,
    /// Receives the call number each time an enumeration starts.
    pub entered: Receiver<usize>,
    /// One message lets one enumeration finish.
    pub gate: Sender<()>,
}

impl Gated {
    pub fn wait_entered(&self) -> usize {
        self.entered
            .recv_timeout(WAIT)
            .expect("enumeration did not start")
    }
}

pub fn gated() -> Gated {
    let (entered_tx, entered) = unbounded();
    let (gate, gate_rx) = unbounded();
    let enumerator = Arc::new(GatedEnumerator {
        calls: AtomicUsize::new(0),
        entered: entered_tx,
        gate: gate_rx,
    });
    let store = Arc::new(MetadataStore::in_memory());
    let catalog = Catalog::new(store, enumerator.clone(), Vec::new()).unwrap();
    Gated {
        catalog,
        enumerator,
        entered,
        gate,
    }
}

/// Panics on its first enumeration and behaves like [`ScriptedEnumerator`]
/// afterwards.
pub struct PanicsOnce {
    panicked: AtomicBool,
    pub inner: Arc<ScriptedEnumerator>,
}

impl PanicsOnce {
    pub fn with_apps(apps: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            panicked: AtomicBool::new(false),
            inner: ScriptedEnumerator::with_apps(apps),
        })
    }
}

impl ItemEnumerator for PanicsOnce {
    fn enumerate(&self, locations: &[PathBuf]) -> Enumeration {
        if !self.panicked.swap(true, Ordering::SeqCst) {
            panic!("enumerator lost its mount");
        }
        self.inner.enumerate(locations)
    }

    fn location_exists(&self, location: &str) -> bool {
        self.inner.location_exists(location)
    }
}

/// Memory store whose writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn put_raw(&self, key: &str, value: &[u8]) {
        self.inner.set(key, value).unwrap();
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Write {
                key: key.to_owned(),
                source: io::Error::new(io::ErrorKind::Other, "disk full"),
            });
        }
        self.inner.set(key, value)
    }
}

pub struct Harness {
    pub catalog: Catalog,
    pub enumerator: Arc<ScriptedEnumerator>,
    pub backend: Arc<FlakyStore>,
}

pub fn harness(apps: &[(&str, &str)]) -> Harness {
    let enumerator = ScriptedEnumerator::with_apps(apps);
    let backend = Arc::new(FlakyStore::default());
    let store = Arc::new(MetadataStore::new(backend.clone()));
    let catalog = Catalog::new(store, enumerator.clone(), vec![PathBuf::from("/Applications")])
        .unwrap();
    Harness {
        catalog,
        enumerator,
        backend,
    }
}

pub fn top_level(catalog: &Catalog) -> Vec<String> {
    catalog
        .settle()
        .entries
        .iter()
        .map(|entry| entry.name().to_string())
        .collect()
}
