//! Donor resolution index.
//!
//! Maps fully-qualified object paths to the package file that can supply
//! them. Built once per run (from a persisted JSON index plus a scan of the
//! donor directory) and read-only while porting.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::Container;
use crate::package::PackageIo;
use crate::util::Result;

/// Path prefixes that are never offered as donor content.
const UNINDEXED_PREFIXES: &[&str] = &["theworld", "objectreferencer"];

/// One registration: which package supplies a path, and whether it is a general donor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorRecord {
    /// Index into the package table.
    pub package: u32,
    /// Non-indexed records are known but not offered by [`DonorIndex::resolve`].
    pub indexed: bool,
}

/// Path -> donor package lookup.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DonorIndex {
    /// Package locators, referenced by position from records.
    packages: Vec<String>,
    /// Lower-cased object path -> record.
    records: BTreeMap<String, DonorRecord>,
    /// Base directory for relative locators (not persisted).
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// Result of scanning a donor directory.
pub struct DonorScan {
    /// Packages that were indexed.
    pub indexed: usize,
    /// Packages that could not be opened.
    pub failed: Vec<PathBuf>,
    /// The helper package, kept open for the whole run.
    pub helper: Option<Container>,
}

impl DonorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a persisted index.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Persist the index as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Resolve relative locators against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Register `path` as suppliable by `locator`. Re-registering a path replaces
    /// the previous record.
    pub fn register(&mut self, path: &str, locator: impl AsRef<Path>, indexed: bool) {
        let locator = locator.as_ref().to_string_lossy().into_owned();
        let package = match self.packages.iter().position(|p| *p == locator) {
            Some(i) => i as u32,
            None => {
                self.packages.push(locator);
                (self.packages.len() - 1) as u32
            }
        };
        self.records.insert(path.to_ascii_lowercase(), DonorRecord { package, indexed });
    }

    /// Package that supplies `path`, if a general donor is registered for it.
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        match self.lookup(path)? {
            (locator, true) => Some(locator),
            (_, false) => None,
        }
    }

    /// Registered package for `path` regardless of its indexed flag.
    pub fn lookup(&self, path: &str) -> Option<(PathBuf, bool)> {
        let record = self.records.get(&path.to_ascii_lowercase())?;
        let locator = Path::new(self.packages.get(record.package as usize)?);
        let full = match &self.base_dir {
            Some(base) if locator.is_relative() => base.join(locator),
            _ => locator.to_path_buf(),
        };
        Some((full, record.indexed))
    }

    /// Number of registered paths.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct donor packages.
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// Register every export of `container` under `locator`.
    pub fn index_container(&mut self, container: &Container, locator: &Path, indexed: bool) -> usize {
        let mut added = 0;
        for (r, _) in container.exports() {
            let Ok(path) = container.path_of(r) else { continue };
            let lower = path.to_ascii_lowercase();
            if UNINDEXED_PREFIXES.iter().any(|p| lower.starts_with(p)) {
                continue;
            }
            self.register(&path, locator, indexed);
            added += 1;
        }
        added
    }

    /// Scan a donor directory once.
    ///
    /// Every package is indexed except the one whose base name equals `helper_name`:
    /// its paths are registered as non-indexed and the package itself is returned,
    /// open, for the caller to keep.
    pub fn scan_dir(&mut self, dir: &Path, io: &dyn PackageIo, helper_name: &str) -> Result<DonorScan> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| io.is_package_file(p))
            .collect();
        files.sort();

        let mut scan = DonorScan { indexed: 0, failed: Vec::new(), helper: None };
        for file in files {
            let is_helper = file
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s.eq_ignore_ascii_case(helper_name));

            let container = match io.open(&file) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(path = %file.display(), error = %e, "donor could not be opened");
                    scan.failed.push(file);
                    continue;
                }
            };

            if is_helper {
                tracing::info!(path = %file.display(), "inventorying helper package");
                self.index_container(&container, &file, false);
                scan.helper = Some(container);
            } else {
                let n = self.index_container(&container, &file, true);
                tracing::info!(path = %file.display(), objects = n, "inventorying donor");
                io.close(&container);
                scan.indexed += 1;
            }
        }
        Ok(scan)
    }
}
