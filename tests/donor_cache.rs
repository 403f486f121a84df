//! Integration tests for the donor index and the bounded donor cache.

use std::cell::Cell;
use std::path::{Path, PathBuf};

use worldport::core::ContainerCache;
use worldport::donor::DonorIndex;
use worldport::model::{Container, ObjectEntry, ObjectName};
use worldport::package::{BinaryPackageIo, Format, PackageIo};
use worldport::Result;

use tempfile::TempDir;

/// Package I/O that counts how many packages are open at once.
#[derive(Default)]
struct CountingIo {
    inner: BinaryPackageIo,
    open: Cell<usize>,
    peak: Cell<usize>,
}

impl PackageIo for CountingIo {
    fn is_package_file(&self, path: &Path) -> bool {
        self.inner.is_package_file(path)
    }

    fn open(&self, path: &Path) -> Result<Container> {
        let c = self.inner.open(path)?;
        self.open.set(self.open.get() + 1);
        self.peak.set(self.peak.get().max(self.open.get()));
        Ok(c)
    }

    fn save(&self, container: &Container, path: &Path, compressed: bool) -> Result<()> {
        self.inner.save(container, path, compressed)
    }

    fn close(&self, _container: &Container) {
        self.open.set(self.open.get() - 1);
    }
}

/// Write `names.len()` donor packages, each supplying `<name>.Asset`.
fn write_donors(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    let io = BinaryPackageIo::default();
    names
        .iter()
        .map(|name| {
            let mut c = Container::new(Format::Le3);
            let pkg = c
                .add_export(ObjectEntry::new("Package", ObjectName::new(*name, 0)))
                .expect("Failed to add package");
            c.add_export(ObjectEntry::new("Texture2D", ObjectName::new("Asset", 0)).with_parent(pkg))
                .expect("Failed to add asset");
            let path = dir.join(format!("{name}.pcc"));
            io.save(&c, &path, true).expect("Failed to save donor");
            path
        })
        .collect()
}

#[test]
fn test_cache_never_exceeds_bound() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let paths = write_donors(dir.path(), &["A", "B", "C", "D"]);
    let io = CountingIo::default();

    {
        let mut cache = ContainerCache::new(&io, 2).expect("Failed to create cache");
        for i in [0, 1, 0, 2, 3, 0, 1, 2] {
            let c = cache.get_or_open(&paths[i]).expect("Failed to open donor");
            assert!(c.find_export(&format!("{}.Asset", ["A", "B", "C", "D"][i])).is_some());
            assert!(cache.len() <= 2);
        }
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.opened, 7);
        assert_eq!(stats.evicted, 5);
    }

    assert_eq!(io.peak.get(), 2);
    assert_eq!(io.open.get(), 0, "dropping the cache closes everything");
}

#[test]
fn test_lru_order() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let paths = write_donors(dir.path(), &["A", "B", "C"]);
    let io = BinaryPackageIo::default();
    let mut cache = ContainerCache::new(&io, 2).expect("Failed to create cache");

    cache.get_or_open(&paths[0]).unwrap();
    cache.get_or_open(&paths[1]).unwrap();
    cache.get_or_open(&paths[0]).unwrap();
    cache.get_or_open(&paths[2]).unwrap();

    assert!(cache.contains(&paths[0]));
    assert!(!cache.contains(&paths[1]));
    assert!(cache.contains(&paths[2]));
}

#[test]
fn test_scan_and_persist_index() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let paths = write_donors(dir.path(), &["Rocks", "VTestHelper"]);
    std::fs::write(dir.path().join("Junk.pcc"), b"not a package").expect("write");

    let io = BinaryPackageIo::default();
    let mut index = DonorIndex::new();
    let scan = index.scan_dir(dir.path(), &io, "VTestHelper").expect("Failed to scan");
    assert_eq!(scan.indexed, 1);
    assert!(scan.failed.is_empty(), "junk is not sniffed as a package");
    assert!(scan.helper.is_some());

    assert_eq!(index.resolve("rocks.asset"), Some(paths[0].clone()));
    assert_eq!(index.resolve("VTestHelper.Asset"), None);
    assert_eq!(index.lookup("VTestHelper.Asset"), Some((paths[1].clone(), false)));

    let saved = dir.path().join("index.json");
    index.save(&saved).expect("Failed to save index");
    let loaded = DonorIndex::load(&saved).expect("Failed to load index");
    assert_eq!(loaded.len(), index.len());
    assert_eq!(loaded.resolve("Rocks.Asset"), Some(paths[0].clone()));
}

#[test]
fn test_relative_locators_use_base_dir() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut index = DonorIndex::new();
    index.register("Rocks.Asset", "donors/Rocks.pcc", true);

    let saved = dir.path().join("index.json");
    index.save(&saved).expect("Failed to save index");
    let loaded = DonorIndex::load(&saved).expect("Failed to load index").with_base_dir(dir.path());

    assert_eq!(loaded.resolve("Rocks.Asset"), Some(dir.path().join("donors/Rocks.pcc")));
}
