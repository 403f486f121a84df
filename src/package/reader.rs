//! Package reader implementation.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;

use super::format::*;
use crate::core::{decompress, is_compressed};
use crate::model::{AttrValue, Attributes, Container, Import, ObjectEntry, ObjectName, Reference};
use crate::util::{Error, Result, Vec3};

/// Deepest struct nesting accepted when decoding attributes.
const MAX_STRUCT_DEPTH: usize = 32;

/// Parsed package header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub format: Format,
    pub flags: u16,
    pub body_len: u64,
}

impl Header {
    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }
}

/// Parse and validate the package header.
pub fn parse_header(data: &[u8]) -> Result<Header> {
    if data.len() < HEADER_SIZE {
        return Err(Error::UnexpectedEof(data.len() as u64));
    }

    if &data[0..4] != PACKAGE_MAGIC {
        return Err(Error::InvalidMagic);
    }

    let version = u16::from_le_bytes([data[VERSION_OFFSET], data[VERSION_OFFSET + 1]]);
    let format = Format::from_version(version).ok_or(Error::UnsupportedVersion(version))?;
    let flags = u16::from_le_bytes([data[FLAGS_OFFSET], data[FLAGS_OFFSET + 1]]);
    let mut len = [0u8; 8];
    len.copy_from_slice(&data[BODY_LEN_OFFSET..BODY_LEN_OFFSET + 8]);

    Ok(Header { format, flags, body_len: u64::from_le_bytes(len) })
}

/// Open and fully decode a package file.
///
/// The file is memory-mapped read-only for the duration of the decode.
pub fn open_package(path: impl AsRef<Path>) -> Result<Container> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })?;

    let size = file.metadata()?.len();
    if size < HEADER_SIZE as u64 {
        return Err(Error::UnexpectedEof(size));
    }

    // Safety: the file is opened read-only and the mapping does not outlive this call.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
    let mut container = decode_package(&mmap)?;
    container.set_locator(path);
    Ok(container)
}

/// Decode a package from bytes.
pub fn decode_package(data: &[u8]) -> Result<Container> {
    let header = parse_header(data)?;
    let raw_body = &data[HEADER_SIZE..];

    let inflated;
    let body: &[u8] = if header.is_compressed() {
        if !is_compressed(raw_body) {
            return Err(Error::invalid("body flagged compressed but is not a zlib stream"));
        }
        inflated = decompress(raw_body, header.body_len)?;
        &inflated
    } else {
        if raw_body.len() as u64 != header.body_len {
            return Err(Error::UnexpectedEof(HEADER_SIZE as u64 + raw_body.len() as u64));
        }
        raw_body
    };

    let mut r = BodyReader { cursor: Cursor::new(body) };

    let import_count = r.u32()? as usize;
    let export_count = r.u32()? as usize;

    let mut imports = Vec::with_capacity(import_count.min(body.len()));
    for _ in 0..import_count {
        let class = r.string()?;
        let path = r.string()?;
        imports.push(Import { class, path });
    }

    let mut exports = Vec::with_capacity(export_count.min(body.len()));
    for _ in 0..export_count {
        exports.push(r.export(import_count, export_count)?);
    }

    if r.remaining() != 0 {
        return Err(Error::invalid(format!("{} trailing bytes after export table", r.remaining())));
    }

    Ok(Container::from_tables(header.format, imports, exports))
}

struct BodyReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl BodyReader<'_> {
    fn remaining(&self) -> u64 {
        self.cursor.get_ref().len() as u64 - self.cursor.position()
    }

    fn eof(&self) -> Error {
        Error::UnexpectedEof(self.cursor.position())
    }

    fn u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(|_| self.eof())
    }

    fn u32(&mut self) -> Result<u32> {
        self.cursor.read_u32::<LittleEndian>().map_err(|_| self.eof())
    }

    fn i32(&mut self) -> Result<i32> {
        self.cursor.read_i32::<LittleEndian>().map_err(|_| self.eof())
    }

    fn f32(&mut self) -> Result<f32> {
        self.cursor.read_f32::<LittleEndian>().map_err(|_| self.eof())
    }

    fn bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.u32()? as u64;
        if len > self.remaining() {
            return Err(Error::UnexpectedEof(self.cursor.position() + len));
        }
        let mut buf = vec![0u8; len as usize];
        self.cursor.read_exact(&mut buf).map_err(|_| self.eof())?;
        Ok(buf)
    }

    fn string(&mut self) -> Result<String> {
        Ok(String::from_utf8(self.bytes()?)?)
    }

    fn reference(&mut self, imports: usize, exports: usize) -> Result<Reference> {
        let r = Reference(self.i32()?);
        let in_range = match (r.export_slot(), r.import_slot()) {
            (Some(slot), _) => slot < exports,
            (_, Some(slot)) => slot < imports,
            _ => true,
        };
        if !in_range {
            return Err(Error::HandleOutOfBounds { handle: r.0, exports, imports });
        }
        Ok(r)
    }

    fn export(&mut self, imports: usize, exports: usize) -> Result<ObjectEntry> {
        let class = self.string()?;
        let class_ref = self.reference(imports, exports)?;
        let archetype = self.reference(imports, exports)?;
        let parent = self.reference(imports, exports)?;
        if parent.is_import() {
            return Err(Error::invalid(format!("export '{class}' is parented to import {parent}")));
        }
        let base = self.string()?;
        let number = self.u32()?;
        let attributes = self.attributes(0)?;
        let payload = self.bytes()?;

        let mut entry = ObjectEntry::new(class, ObjectName::new(base, number)).with_attributes(attributes);
        entry.class_ref = class_ref;
        entry.archetype = archetype;
        entry.parent = Some(parent).filter(|p| p.is_export());
        entry.payload = payload;
        Ok(entry)
    }

    fn attributes(&mut self, depth: usize) -> Result<Attributes> {
        if depth > MAX_STRUCT_DEPTH {
            return Err(Error::invalid("attribute structs nested too deeply"));
        }
        let count = self.u32()? as usize;
        let mut attrs = Attributes::new();
        for _ in 0..count {
            let name = self.string()?;
            let tag = self.u8()?;
            let value = match tag {
                attr_tag::BOOL => AttrValue::Bool(self.u8()? != 0),
                attr_tag::INT => AttrValue::Int(self.i32()?),
                attr_tag::FLOAT => AttrValue::Float(self.f32()?),
                attr_tag::NAME => AttrValue::Name(self.string()?),
                attr_tag::STR => AttrValue::Str(self.string()?),
                // Attribute references are range-checked by the relinker, not here.
                attr_tag::OBJECT => AttrValue::Object(Reference(self.i32()?)),
                attr_tag::OBJECT_ARRAY => {
                    let n = self.u32()? as u64;
                    if n * 4 > self.remaining() {
                        return Err(Error::UnexpectedEof(self.cursor.position() + n * 4));
                    }
                    let mut refs = Vec::with_capacity(n as usize);
                    for _ in 0..n {
                        refs.push(Reference(self.i32()?));
                    }
                    AttrValue::ObjectArray(refs)
                }
                attr_tag::VECTOR => AttrValue::Vector(Vec3::new(self.f32()?, self.f32()?, self.f32()?)),
                attr_tag::STRUCT => AttrValue::Struct(Box::new(self.attributes(depth + 1)?)),
                attr_tag::NAME_ARRAY => {
                    let n = self.u32()?;
                    let mut names = Vec::new();
                    for _ in 0..n {
                        names.push(self.string()?);
                    }
                    AttrValue::NameArray(names)
                }
                tag => return Err(Error::UnknownAttributeTag { name, tag }),
            };
            attrs.set(name, value);
        }
        Ok(attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_parsing() {
        let mut header = [0u8; HEADER_SIZE];
        header[0..4].copy_from_slice(PACKAGE_MAGIC);
        header[VERSION_OFFSET] = 3;
        header[FLAGS_OFFSET] = FLAG_COMPRESSED as u8;
        header[BODY_LEN_OFFSET] = 42;

        let h = parse_header(&header).unwrap();
        assert_eq!(h.format, Format::Le3);
        assert!(h.is_compressed());
        assert_eq!(h.body_len, 42);
    }

    #[test]
    fn test_invalid_magic() {
        let header = [0u8; HEADER_SIZE];
        assert!(matches!(parse_header(&header), Err(Error::InvalidMagic)));
    }

    #[test]
    fn test_unsupported_version() {
        let mut header = [0u8; HEADER_SIZE];
        header[0..4].copy_from_slice(PACKAGE_MAGIC);
        header[VERSION_OFFSET] = 99;
        assert!(matches!(parse_header(&header), Err(Error::UnsupportedVersion(99))));
    }

    #[test]
    fn test_truncated_body() {
        let mut data = vec![0u8; HEADER_SIZE];
        data[0..4].copy_from_slice(PACKAGE_MAGIC);
        data[VERSION_OFFSET] = 1;
        data[BODY_LEN_OFFSET] = 8;
        data.extend_from_slice(&[0, 0, 0, 0]);
        assert!(matches!(decode_package(&data), Err(Error::UnexpectedEof(_))));
    }

    #[test]
    fn test_compressed_body_with_absurd_length() {
        let mut data = vec![0u8; HEADER_SIZE];
        data[0..4].copy_from_slice(PACKAGE_MAGIC);
        data[VERSION_OFFSET] = 1;
        data[FLAGS_OFFSET] = FLAG_COMPRESSED as u8;
        data[BODY_LEN_OFFSET..BODY_LEN_OFFSET + 8].copy_from_slice(&u64::MAX.to_le_bytes());
        data.extend_from_slice(&[0x78, 0x9C, 0, 0]);
        assert!(decode_package(&data).is_err());

        // Flagged compressed, but the body is not zlib at all.
        data.truncate(HEADER_SIZE);
        data.extend_from_slice(b"plain");
        assert!(matches!(decode_package(&data), Err(Error::InvalidStructure(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = open_package("/definitely/not/here.pcc");
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }
}
