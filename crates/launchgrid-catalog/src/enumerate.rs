use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::config::CatalogConfig;

/// Raw output of an enumerator before any metadata is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Bundle identifier, when the item declares one.
    pub identity: Option<String>,
    pub name: String,
    pub location: String,
}

impl Candidate {
    pub fn new(
        identity: Option<String>,
        name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            name: name.into(),
            location: location.into(),
        }
    }
}

/// A search location that could not be read. The rest of the pass goes on
/// without it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to read {}: {reason}", .location.display())]
pub struct EnumerationError {
    pub location: PathBuf,
    pub reason: String,
}

impl EnumerationError {
    pub fn new(location: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    pub candidates: Vec<Candidate>,
    pub failures: Vec<EnumerationError>,
}

/// Host capability that lists installable items under a set of locations.
pub trait ItemEnumerator: Send + Sync {
    fn enumerate(&self, locations: &[PathBuf]) -> Enumeration;

    /// Whether a candidate's location is still on disk.
    fn location_exists(&self, location: &str) -> bool {
        Path::new(location).exists()
    }
}

/// Stable id of a candidate: its identity when present and non-empty,
/// otherwise its location.
pub fn derive_item_id(candidate: &Candidate) -> Option<String> {
    candidate
        .identity
        .as_deref()
        .filter(|identity| !identity.is_empty())
        .or_else(|| Some(candidate.location.as_str()).filter(|location| !location.is_empty()))
        .map(str::to_owned)
}

/// Finds application bundles (`*.app` by default) under each location and
/// reads their identifier from `Contents/Info.plist`.
#[derive(Debug, Clone)]
pub struct BundleEnumerator {
    extension: String,
    max_depth: usize,
}

impl Default for BundleEnumerator {
    fn default() -> Self {
        Self::new("app", 1)
    }
}

impl BundleEnumerator {
    pub fn new(extension: impl Into<String>, max_depth: usize) -> Self {
        Self {
            extension: extension.into(),
            max_depth: max_depth.max(1),
        }
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(config.bundle_extension.clone(), config.max_depth)
    }

    fn is_bundle(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }

    fn scan_location(&self, root: &Path, enumeration: &mut Enumeration) {
        if !root.exists() {
            tracing::debug!(location = %root.display(), "search location does not exist");
            return;
        }
        if let Err(err) = fs::read_dir(root) {
            enumeration.failures.push(EnumerationError::new(root, err));
            return;
        }

        let mut walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(self.max_depth)
            .sort_by_file_name()
            .into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(location = %root.display(), %err, "skipping entry");
                    continue;
                }
            };
            if !self.is_bundle(entry.path()) {
                continue;
            }
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            enumeration.candidates.push(read_bundle(entry.path()));
        }
    }
}

impl ItemEnumerator for BundleEnumerator {
    fn enumerate(&self, locations: &[PathBuf]) -> Enumeration {
        let mut enumeration = Enumeration::default();
        for root in locations {
            self.scan_location(root, &mut enumeration);
        }
        tracing::debug!(
            candidates = enumeration.candidates.len(),
            failures = enumeration.failures.len(),
            "bundle enumeration finished"
        );
        enumeration
    }
}

fn read_bundle(path: &Path) -> Candidate {
    let info = read_info_plist(path);
    let string = |key: &str| {
        info.as_ref()
            .and_then(|dict| dict.get(key))
            .and_then(plist::Value::as_string)
            .filter(|value| !value.trim().is_empty())
            .map(str::to_owned)
    };
    let name = string("CFBundleDisplayName")
        .or_else(|| string("CFBundleName"))
        .or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_default();
    Candidate {
        identity: string("CFBundleIdentifier"),
        name,
        location: path.to_string_lossy().into_owned(),
    }
}

fn read_info_plist(bundle: &Path) -> Option<plist::Dictionary> {
    let info = bundle.join("Contents").join("Info.plist");
    if !info.is_file() {
        return None;
    }
    match plist::Value::from_file(&info) {
        Ok(value) => value.into_dictionary(),
        Err(err) => {
            tracing::debug!(path = %info.display(), %err, "unreadable Info.plist");
            None
        }
    }
}
