//! Package format constants and structures.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Magic bytes at the start of a package file.
pub const PACKAGE_MAGIC: &[u8; 4] = b"WPKG";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Offset of the format version in the header.
pub const VERSION_OFFSET: usize = 4;

/// Offset of the flags word in the header.
pub const FLAGS_OFFSET: usize = 6;

/// Offset of the uncompressed body length in the header.
pub const BODY_LEN_OFFSET: usize = 8;

/// Flag bit: body is zlib-compressed.
pub const FLAG_COMPRESSED: u16 = 1;

/// Extension used when none is configured.
pub const DEFAULT_EXTENSION: &str = "pcc";

/// Attribute value tags.
pub mod attr_tag {
    pub const BOOL: u8 = 0;
    pub const INT: u8 = 1;
    pub const FLOAT: u8 = 2;
    pub const NAME: u8 = 3;
    pub const STR: u8 = 4;
    pub const OBJECT: u8 = 5;
    pub const OBJECT_ARRAY: u8 = 6;
    pub const VECTOR: u8 = 7;
    pub const STRUCT: u8 = 8;
    pub const NAME_ARRAY: u8 = 9;
}

/// Package format generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    #[serde(rename = "LE1")]
    Le1,
    #[serde(rename = "LE2")]
    Le2,
    #[serde(rename = "LE3")]
    Le3,
}

impl Format {
    /// Supported (source, target) port pairs.
    pub const PORT_PAIRS: &'static [(Format, Format)] = &[(Format::Le1, Format::Le2), (Format::Le1, Format::Le3)];

    /// Version number stored in the header.
    pub const fn version(self) -> u16 {
        match self {
            Self::Le1 => 1,
            Self::Le2 => 2,
            Self::Le3 => 3,
        }
    }

    /// Format for a header version number.
    pub const fn from_version(version: u16) -> Option<Self> {
        match version {
            1 => Some(Self::Le1),
            2 => Some(Self::Le2),
            3 => Some(Self::Le3),
            _ => None,
        }
    }

    /// Whether `self -> target` is a supported port.
    pub fn can_port_to(self, target: Format) -> bool {
        Self::PORT_PAIRS.contains(&(self, target))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Le1 => "LE1",
            Self::Le2 => "LE2",
            Self::Le3 => "LE3",
        })
    }
}
