//! Integration tests for cloning objects across containers with donor fallback.

use std::cell::RefCell;
use std::path::Path;

use worldport::core::ContainerCache;
use worldport::donor::DonorIndex;
use worldport::model::{AttrValue, Container, Import, ObjectEntry, ObjectName, Reference};
use worldport::package::{encode_package, BinaryPackageIo, Format, PackageIo};
use worldport::relink::{Diagnostic, Relinker};
use worldport::Result;

use tempfile::TempDir;

fn add_actor(c: &mut Container, class: &str, number: u32) -> Reference {
    let level = c.persistent_level().expect("level template has a persistent level");
    c.add_export(ObjectEntry::new(class, ObjectName::new(class, number)).with_parent(level))
        .expect("Failed to add actor")
}

/// Donor package supplying `BIOG_Rocks.Boulder`, which references `BIOG_Rocks.Materials.Granite`
/// and a native class.
fn write_rock_donor(dir: &Path, io: &BinaryPackageIo) {
    let mut donor = Container::new(Format::Le3);
    let native = donor.add_import(Import::new("Class", "Engine.StaticMesh"));
    let pkg = donor
        .add_export(ObjectEntry::new("Package", ObjectName::new("BIOG_Rocks", 0)))
        .expect("Failed to add package");
    let mats = donor
        .add_export(ObjectEntry::new("Package", ObjectName::new("Materials", 0)).with_parent(pkg))
        .expect("Failed to add package");
    let granite = donor
        .add_export(ObjectEntry::new("Material", ObjectName::new("Granite", 0)).with_parent(mats))
        .expect("Failed to add material");
    let mut boulder = ObjectEntry::new("StaticMesh", ObjectName::new("Boulder", 0)).with_parent(pkg);
    boulder.class_ref = native;
    boulder.attributes.set("Material", AttrValue::Object(granite));
    donor.add_export(boulder).expect("Failed to add mesh");
    io.save(&donor, &dir.join("Rocks.pcc"), false).expect("Failed to save donor");
}

/// Source level with one mesh actor whose component references `BIOG_Rocks.Boulder` by import.
fn rock_source() -> (Container, Reference) {
    let mut source = Container::new_level(Format::Le1);
    let mesh = source.add_import(Import::new("StaticMesh", "BIOG_Rocks.Boulder"));
    let actor = add_actor(&mut source, "StaticMeshActor", 3);
    let mut comp = ObjectEntry::new("StaticMeshComponent", ObjectName::new("StaticMeshComponent", 1)).with_parent(actor);
    comp.attributes.set("StaticMesh", AttrValue::Object(mesh));
    let comp = source.add_export(comp).expect("Failed to add component");
    source
        .get_mut(actor)
        .expect("actor exists")
        .attributes
        .set("StaticMeshComponent", AttrValue::Object(comp));
    (source, actor)
}

/// Every reference held by every destination export addresses a real entry.
fn assert_reference_closure(c: &Container) {
    for (r, e) in c.exports() {
        for target in e.references().expect("payload decodes") {
            assert!(target.is_null() || c.is_valid(target), "{} holds dangling {}", c.path_of(r).unwrap(), target);
        }
    }
}

#[test]
fn test_missing_dependency_comes_from_donor() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let io = BinaryPackageIo::default();
    write_rock_donor(dir.path(), &io);

    let mut index = DonorIndex::new();
    index.scan_dir(dir.path(), &io, "VTestHelper").expect("Failed to scan donors");
    let natives = vec!["Engine".to_string()];
    let mut cache = ContainerCache::new(&io, 4).expect("Failed to create cache");

    let (source, actor) = rock_source();
    let mut dest = Container::new_level(Format::Le3);
    let level = dest.persistent_level();

    {
        let mut relinker = Relinker::new(&index, &mut cache).with_native_packages(&natives);
        let cloned = relinker.clone_object(&source, actor, &mut dest, level).expect("Failed to clone");

        assert!(relinker.diagnostics().is_empty(), "unexpected: {:?}", relinker.diagnostics());
        let comp = dest.get(cloned).unwrap().attributes.object("StaticMeshComponent").unwrap();
        let mesh = dest.get(comp).unwrap().attributes.object("StaticMesh").unwrap();
        assert!(mesh.is_export(), "donor content is cloned, not imported");
        assert_eq!(dest.path_of(mesh).unwrap(), "BIOG_Rocks.Boulder");

        let granite = dest.get(mesh).unwrap().attributes.object("Material").unwrap();
        assert_eq!(dest.path_of(granite).unwrap(), "BIOG_Rocks.Materials.Granite");
        let class = dest.get(mesh).unwrap().class_ref;
        assert_eq!(dest.path_of(class).unwrap(), "Engine.StaticMesh");
    }

    assert_reference_closure(&dest);
    assert_eq!(cache.stats().opened, 1);
}

#[test]
fn test_source_is_not_mutated() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let io = BinaryPackageIo::default();
    write_rock_donor(dir.path(), &io);
    let mut index = DonorIndex::new();
    index.scan_dir(dir.path(), &io, "VTestHelper").expect("Failed to scan donors");
    let mut cache = ContainerCache::new(&io, 4).expect("Failed to create cache");

    let (source, actor) = rock_source();
    let before = encode_package(&source, false).expect("encode");

    let mut dest = Container::new_level(Format::Le3);
    let level = dest.persistent_level();
    let mut relinker = Relinker::new(&index, &mut cache);
    relinker.clone_object(&source, actor, &mut dest, level).expect("Failed to clone");

    assert_eq!(encode_package(&source, false).expect("encode"), before);
}

#[test]
fn test_shared_dependency_is_cloned_once() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let io = BinaryPackageIo::default();
    write_rock_donor(dir.path(), &io);
    let mut index = DonorIndex::new();
    index.scan_dir(dir.path(), &io, "VTestHelper").expect("Failed to scan donors");
    let mut cache = ContainerCache::new(&io, 4).expect("Failed to create cache");

    let (mut source, first) = rock_source();
    let mesh = source.find_import("BIOG_Rocks.Boulder").unwrap();
    let second = add_actor(&mut source, "StaticMeshActor", 9);
    source.get_mut(second).unwrap().attributes.set("StaticMesh", AttrValue::Object(mesh));

    let mut dest = Container::new_level(Format::Le3);
    let level = dest.persistent_level();
    let mut relinker = Relinker::new(&index, &mut cache);
    relinker.clone_object(&source, first, &mut dest, level).expect("Failed to clone");
    let count = dest.export_count();
    let cloned = relinker.clone_object(&source, second, &mut dest, level).expect("Failed to clone");

    assert_eq!(dest.export_count(), count + 1, "only the second actor is new");
    let boulder = dest.find_export("BIOG_Rocks.Boulder").unwrap();
    assert_eq!(dest.get(cloned).unwrap().attributes.object("StaticMesh"), Some(boulder));
}

#[test]
fn test_reference_cycle_between_actors() {
    let index = DonorIndex::new();
    let io = BinaryPackageIo::default();
    let mut cache = ContainerCache::new(&io, 1).expect("Failed to create cache");

    let mut source = Container::new_level(Format::Le1);
    let a = add_actor(&mut source, "InterpActor", 1);
    let b = add_actor(&mut source, "InterpActor", 2);
    source.get_mut(a).unwrap().attributes.set("Attached", AttrValue::ObjectArray(vec![b]));
    source.get_mut(b).unwrap().attributes.set("Base", AttrValue::Object(a));

    let mut dest = Container::new_level(Format::Le3);
    let level = dest.persistent_level();
    let mut relinker = Relinker::new(&index, &mut cache);
    let da = relinker.clone_object(&source, a, &mut dest, level).expect("Failed to clone");

    let db = dest.find_export("TheWorld.PersistentLevel.InterpActor_1").expect("referenced actor cloned");
    assert_eq!(dest.get(da).unwrap().attributes.object_array("Attached"), Some(&[db][..]));
    assert_eq!(dest.get(db).unwrap().attributes.object("Base"), Some(da));
    assert_reference_closure(&dest);

    // Porting the second actor afterwards reuses the clone.
    assert_eq!(relinker.clone_object(&source, b, &mut dest, level).unwrap(), db);
}

#[test]
fn test_stale_index_reports_missing_donor() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let io = BinaryPackageIo::default();
    write_rock_donor(dir.path(), &io);

    let mut index = DonorIndex::new();
    index.register("BIOG_Rocks.Pebble", dir.path().join("Rocks.pcc"), true);
    let mut cache = ContainerCache::new(&io, 4).expect("Failed to create cache");

    let mut source = Container::new_level(Format::Le1);
    let pebble = source.add_import(Import::new("StaticMesh", "BIOG_Rocks.Pebble"));
    let actor = add_actor(&mut source, "StaticMeshActor", 1);
    source.get_mut(actor).unwrap().attributes.set("StaticMesh", AttrValue::Object(pebble));

    let mut dest = Container::new_level(Format::Le3);
    let level = dest.persistent_level();
    let mut relinker = Relinker::new(&index, &mut cache);
    let cloned = relinker.clone_object(&source, actor, &mut dest, level).expect("Failed to clone");

    let kept = dest.get(cloned).unwrap().attributes.object("StaticMesh").unwrap();
    assert!(kept.is_import());
    assert!(matches!(
        relinker.diagnostics().iter().next(),
        Some(Diagnostic::MissingDonor { path, .. }) if path == "BIOG_Rocks.Pebble"
    ));
}

#[test]
fn test_helper_supplies_unindexed_content() {
    let index = DonorIndex::new();
    let io = BinaryPackageIo::default();
    let mut cache = ContainerCache::new(&io, 1).expect("Failed to create cache");

    let mut helper = Container::new(Format::Le3);
    helper
        .add_export(ObjectEntry::new("Texture2D", ObjectName::new("StartIcon", 0)))
        .expect("Failed to add texture");

    let mut source = Container::new_level(Format::Le1);
    let icon = source.add_import(Import::new("Texture2D", "StartIcon"));
    let actor = add_actor(&mut source, "StaticMeshActor", 1);
    source.get_mut(actor).unwrap().attributes.set("Icon", AttrValue::Object(icon));

    let mut dest = Container::new_level(Format::Le3);
    let level = dest.persistent_level();
    let mut relinker = Relinker::new(&index, &mut cache).with_helper(Some(&helper));
    let cloned = relinker.clone_object(&source, actor, &mut dest, level).expect("Failed to clone");

    let r = dest.get(cloned).unwrap().attributes.object("Icon").unwrap();
    assert!(r.is_export());
    assert!(relinker.diagnostics().is_empty());
}

/// Package I/O that logs every open and close in order.
#[derive(Default)]
struct EventIo {
    inner: BinaryPackageIo,
    events: RefCell<Vec<String>>,
}

impl PackageIo for EventIo {
    fn is_package_file(&self, path: &Path) -> bool {
        self.inner.is_package_file(path)
    }

    fn open(&self, path: &Path) -> Result<Container> {
        let c = self.inner.open(path)?;
        self.events.borrow_mut().push(format!("open {}", c.base_name().unwrap_or("?")));
        Ok(c)
    }

    fn save(&self, container: &Container, path: &Path, compressed: bool) -> Result<()> {
        self.inner.save(container, path, compressed)
    }

    fn close(&self, container: &Container) {
        self.events.borrow_mut().push(format!("close {}", container.base_name().unwrap_or("?")));
    }
}

#[test]
fn test_chained_donors_with_single_slot_cache() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let plain = BinaryPackageIo::default();

    let mut mats = Container::new(Format::Le3);
    let pkg = mats
        .add_export(ObjectEntry::new("Package", ObjectName::new("BIOG_Mats", 0)))
        .expect("Failed to add package");
    mats.add_export(ObjectEntry::new("Material", ObjectName::new("Granite", 0)).with_parent(pkg))
        .expect("Failed to add material");
    plain.save(&mats, &dir.path().join("Mats.pcc"), false).expect("Failed to save donor");

    let mut rocks = Container::new(Format::Le3);
    let granite = rocks.add_import(Import::new("Material", "BIOG_Mats.Granite"));
    let pkg = rocks
        .add_export(ObjectEntry::new("Package", ObjectName::new("BIOG_Rocks", 0)))
        .expect("Failed to add package");
    let mut boulder = ObjectEntry::new("StaticMesh", ObjectName::new("Boulder", 0)).with_parent(pkg);
    boulder.attributes.set("Material", AttrValue::Object(granite));
    boulder.attributes.set("Collision", AttrValue::Bool(true));
    rocks.add_export(boulder).expect("Failed to add mesh");
    plain.save(&rocks, &dir.path().join("Rocks.pcc"), false).expect("Failed to save donor");

    let mut index = DonorIndex::new();
    index.scan_dir(dir.path(), &plain, "VTestHelper").expect("Failed to scan donors");

    let io = EventIo::default();
    let (source, actor) = rock_source();
    let mut dest = Container::new_level(Format::Le3);
    let level = dest.persistent_level();
    {
        let mut cache = ContainerCache::new(&io, 1).expect("Failed to create cache");
        let mut relinker = Relinker::new(&index, &mut cache);
        relinker.clone_object(&source, actor, &mut dest, level).expect("Failed to clone");
        assert!(relinker.diagnostics().is_empty(), "unexpected: {:?}", relinker.diagnostics());
    }

    let boulder = dest.find_export("BIOG_Rocks.Boulder").expect("mesh cloned");
    let material = dest.get(boulder).unwrap().attributes.object("Material").unwrap();
    assert_eq!(dest.path_of(material).unwrap(), "BIOG_Mats.Granite");
    assert_reference_closure(&dest);

    // Rocks stays open while its mesh is still being relinked after Mats is opened.
    let events = io.events.borrow();
    assert_eq!(events[..2], ["open Rocks", "open Mats"]);
    assert_eq!(events.iter().filter(|e| e.starts_with("close")).count(), 2);
}
