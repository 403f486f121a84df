//! Class-specific binary payloads.
//!
//! Each entry may carry an opaque byte blob whose layout depends on its
//! class category. Known categories decode into typed schemas; everything
//! else stays opaque and round-trips byte for byte.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{ClassCategory, Reference};
use crate::util::{Error, Mat4, Result};

/// Level payload: ordered member list followed by bytes this tool does not interpret.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LevelBinary {
    pub actors: Vec<Reference>,
    pub tail: Vec<u8>,
}

/// Collection actor payload: one local-to-world transform per member slot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollectionBinary {
    pub transforms: Vec<Mat4>,
}

/// Decoded payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Payload {
    #[default]
    None,
    Level(LevelBinary),
    Collection(CollectionBinary),
    Opaque(Vec<u8>),
}

impl Payload {
    /// Decode raw bytes according to a class category.
    pub fn decode(category: ClassCategory, bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Ok(Self::None);
        }
        match category {
            ClassCategory::Level => decode_level(bytes).map(Self::Level),
            ClassCategory::MeshCollection | ClassCategory::LightCollection => {
                decode_collection(bytes).map(Self::Collection)
            }
            _ => Ok(Self::Opaque(bytes.to_vec())),
        }
    }

    /// Encode to raw bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::None => Vec::new(),
            Self::Opaque(bytes) => bytes.clone(),
            Self::Level(level) => {
                let mut out = Vec::with_capacity(4 + level.actors.len() * 4 + level.tail.len());
                // Writing into a Vec cannot fail.
                let _ = out.write_u32::<LittleEndian>(level.actors.len() as u32);
                for r in &level.actors {
                    let _ = out.write_i32::<LittleEndian>(r.0);
                }
                out.extend_from_slice(&level.tail);
                out
            }
            Self::Collection(coll) => {
                let mut out = Vec::with_capacity(4 + coll.transforms.len() * 64);
                let _ = out.write_u32::<LittleEndian>(coll.transforms.len() as u32);
                for m in &coll.transforms {
                    for v in m.to_cols_array() {
                        let _ = out.write_f32::<LittleEndian>(v);
                    }
                }
                out
            }
        }
    }

    /// Visit every reference stored in the payload.
    pub fn for_each_reference(&self, f: &mut impl FnMut(Reference)) {
        if let Self::Level(level) = self {
            level.actors.iter().copied().for_each(f);
        }
    }

    /// Rewrite every reference stored in the payload.
    pub fn map_references(&mut self, f: &mut impl FnMut(Reference) -> Reference) {
        if let Self::Level(level) = self {
            for r in level.actors.iter_mut() {
                *r = f(*r);
            }
        }
    }

    /// Level schema, if this is one.
    pub fn as_level(&self) -> Option<&LevelBinary> {
        match self {
            Self::Level(l) => Some(l),
            _ => None,
        }
    }

    /// Collection schema, if this is one.
    pub fn as_collection(&self) -> Option<&CollectionBinary> {
        match self {
            Self::Collection(c) => Some(c),
            _ => None,
        }
    }
}

fn read_count(cursor: &mut Cursor<&[u8]>, elem_size: usize) -> Result<usize> {
    let pos = cursor.position();
    let count = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| Error::UnexpectedEof(pos))? as usize;
    let remaining = cursor.get_ref().len() as u64 - cursor.position();
    if (count as u64).saturating_mul(elem_size as u64) > remaining {
        return Err(Error::invalid(format!(
            "payload table of {count} entries exceeds {remaining} remaining bytes"
        )));
    }
    Ok(count)
}

fn decode_level(bytes: &[u8]) -> Result<LevelBinary> {
    let mut cursor = Cursor::new(bytes);
    let count = read_count(&mut cursor, 4)?;
    let mut actors = Vec::with_capacity(count);
    for _ in 0..count {
        actors.push(Reference(cursor.read_i32::<LittleEndian>()?));
    }
    let mut tail = Vec::new();
    cursor.read_to_end(&mut tail)?;
    Ok(LevelBinary { actors, tail })
}

fn decode_collection(bytes: &[u8]) -> Result<CollectionBinary> {
    let mut cursor = Cursor::new(bytes);
    let count = read_count(&mut cursor, 64)?;
    let mut transforms = Vec::with_capacity(count);
    let mut cols = [0f32; 16];
    for _ in 0..count {
        cursor.read_f32_into::<LittleEndian>(&mut cols)?;
        transforms.push(Mat4::from_cols_array(&cols));
    }
    if cursor.position() != bytes.len() as u64 {
        return Err(Error::invalid("trailing bytes after collection transform table"));
    }
    Ok(CollectionBinary { transforms })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{compose, Quat, Vec3};

    #[test]
    fn test_level_keeps_tail() {
        let level = Payload::Level(LevelBinary {
            actors: vec![Reference(3), Reference::NULL, Reference(7)],
            tail: vec![0xAA, 0xBB],
        });
        let bytes = level.encode();
        assert_eq!(bytes.len(), 4 + 12 + 2);
        assert_eq!(Payload::decode(ClassCategory::Level, &bytes).unwrap(), level);
    }

    #[test]
    fn test_collection_transforms() {
        let m = compose(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_z(0.25), Vec3::splat(2.0));
        let coll = Payload::Collection(CollectionBinary { transforms: vec![Mat4::IDENTITY, m] });
        let decoded = Payload::decode(ClassCategory::LightCollection, &coll.encode()).unwrap();
        assert_eq!(decoded, coll);
    }

    #[test]
    fn test_unknown_is_opaque() {
        let bytes = vec![1, 2, 3, 4, 5];
        let decoded = Payload::decode(ClassCategory::Other, &bytes).unwrap();
        assert_eq!(decoded, Payload::Opaque(bytes.clone()));
        assert_eq!(decoded.encode(), bytes);
    }

    #[test]
    fn test_truncated_level_is_error() {
        let bytes = [10u8, 0, 0, 0, 1, 0, 0, 0];
        assert!(Payload::decode(ClassCategory::Level, &bytes).is_err());
    }
}
