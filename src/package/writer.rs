//! Package writer implementation.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};

use super::format::*;
use crate::core::compress;
use crate::model::{AttrValue, Attributes, Container, Reference};
use crate::util::Result;

/// zlib level used for compressed bodies.
const COMPRESSION_LEVEL: u32 = 6;

/// Encode a container into package bytes.
pub fn encode_package(container: &Container, compressed: bool) -> Result<Vec<u8>> {
    let mut body = BodyWriter::default();

    body.u32(container.import_count() as u32);
    body.u32(container.export_count() as u32);

    for import in container.imports() {
        body.string(&import.class);
        body.string(&import.path);
    }

    for (_, entry) in container.exports() {
        body.string(&entry.class);
        body.i32(entry.class_ref.0);
        body.i32(entry.archetype.0);
        body.i32(entry.parent().unwrap_or(Reference::NULL).0);
        body.string(&entry.name.base);
        body.u32(entry.name.number);
        body.attributes(&entry.attributes);
        body.bytes(entry.raw_payload());
    }

    let body = body.buf;
    let body_len = body.len() as u64;
    let (flags, stored) = if compressed {
        (FLAG_COMPRESSED, compress(&body, COMPRESSION_LEVEL)?)
    } else {
        (0, body)
    };

    let mut out = Vec::with_capacity(HEADER_SIZE + stored.len());
    out.extend_from_slice(PACKAGE_MAGIC);
    out.write_u16::<LittleEndian>(container.format().version())?;
    out.write_u16::<LittleEndian>(flags)?;
    out.write_u64::<LittleEndian>(body_len)?;
    out.extend_from_slice(&stored);
    Ok(out)
}

/// Save a container to disk.
///
/// Bytes go to a sibling temporary file that is renamed over `path` only
/// after a complete write, so a failed save never leaves a partial package.
pub fn save_package(container: &Container, path: impl AsRef<Path>, compressed: bool) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_package(container, compressed)?;
    let tmp = temp_path(path);

    let written = (|| -> Result<()> {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::with_capacity(2 * 1024 * 1024, file);
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    })();

    if let Err(e) = written.and_then(|_| fs::rename(&tmp, path).map_err(Into::into)) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

#[derive(Default)]
struct BodyWriter {
    buf: Vec<u8>,
}

// Writes into a Vec cannot fail, so results are discarded.
impl BodyWriter {
    fn u8(&mut self, v: u8) {
        let _ = self.buf.write_u8(v);
    }

    fn u32(&mut self, v: u32) {
        let _ = self.buf.write_u32::<LittleEndian>(v);
    }

    fn i32(&mut self, v: i32) {
        let _ = self.buf.write_i32::<LittleEndian>(v);
    }

    fn f32(&mut self, v: f32) {
        let _ = self.buf.write_f32::<LittleEndian>(v);
    }

    fn bytes(&mut self, data: &[u8]) {
        self.u32(data.len() as u32);
        self.buf.extend_from_slice(data);
    }

    fn string(&mut self, s: &str) {
        self.bytes(s.as_bytes());
    }

    fn attributes(&mut self, attrs: &Attributes) {
        self.u32(attrs.len() as u32);
        for attr in attrs.iter() {
            self.string(&attr.name);
            match &attr.value {
                AttrValue::Bool(b) => {
                    self.u8(attr_tag::BOOL);
                    self.u8(*b as u8);
                }
                AttrValue::Int(i) => {
                    self.u8(attr_tag::INT);
                    self.i32(*i);
                }
                AttrValue::Float(f) => {
                    self.u8(attr_tag::FLOAT);
                    self.f32(*f);
                }
                AttrValue::Name(s) => {
                    self.u8(attr_tag::NAME);
                    self.string(s);
                }
                AttrValue::Str(s) => {
                    self.u8(attr_tag::STR);
                    self.string(s);
                }
                AttrValue::Object(r) => {
                    self.u8(attr_tag::OBJECT);
                    self.i32(r.0);
                }
                AttrValue::ObjectArray(refs) => {
                    self.u8(attr_tag::OBJECT_ARRAY);
                    self.u32(refs.len() as u32);
                    for r in refs {
                        self.i32(r.0);
                    }
                }
                AttrValue::Vector(v) => {
                    self.u8(attr_tag::VECTOR);
                    self.f32(v.x);
                    self.f32(v.y);
                    self.f32(v.z);
                }
                AttrValue::Struct(inner) => {
                    self.u8(attr_tag::STRUCT);
                    self.attributes(inner);
                }
                AttrValue::NameArray(names) => {
                    self.u8(attr_tag::NAME_ARRAY);
                    self.u32(names.len() as u32);
                    for n in names {
                        self.string(n);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::reader::{decode_package, open_package};

    #[test]
    fn test_empty_package_header() {
        let c = Container::new(Format::Le2);
        let bytes = encode_package(&c, false).unwrap();

        assert_eq!(&bytes[0..4], PACKAGE_MAGIC);
        assert_eq!(bytes[VERSION_OFFSET], 2);
        assert_eq!(bytes[FLAGS_OFFSET], 0);
        assert_eq!(bytes.len(), HEADER_SIZE + 8);
    }

    #[test]
    fn test_level_template_survives_save() {
        let c = Container::new_level(Format::Le3);
        let plain = decode_package(&encode_package(&c, false).unwrap()).unwrap();
        let packed = decode_package(&encode_package(&c, true).unwrap()).unwrap();

        for decoded in [plain, packed] {
            assert_eq!(decoded.format(), Format::Le3);
            assert_eq!(decoded.export_count(), c.export_count());
            let level = decoded.persistent_level().unwrap();
            assert_eq!(
                decoded.get(level).unwrap().raw_payload(),
                c.get(level).unwrap().raw_payload()
            );
            assert!(decoded.find_export("TheWorld.PersistentLevel.BioWorldInfo_2").is_some());
        }
    }

    #[test]
    fn test_save_replaces_atomically() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("BioP_Test.pcc");

        save_package(&Container::new_level(Format::Le3), &path, false)?;
        assert!(path.exists());
        assert!(!temp_path(&path).exists());

        let reopened = open_package(&path)?;
        assert_eq!(reopened.base_name(), Some("BioP_Test"));
        Ok(())
    }

    #[test]
    fn test_save_into_missing_dir_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("Out.pcc");
        assert!(save_package(&Container::new(Format::Le3), &path, false).is_err());
        assert!(!path.exists());
    }
}
