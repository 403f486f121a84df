//! Error types for the porting library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for porting operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid magic bytes at start of file
    #[error("Invalid package file: expected WPKG magic bytes")]
    InvalidMagic,

    /// Unsupported package format version
    #[error("Unsupported package format version: {0}")]
    UnsupportedVersion(u16),

    /// File is truncated or corrupted
    #[error("Unexpected end of data at position {0}")]
    UnexpectedEof(u64),

    /// Invalid data structure in file
    #[error("Invalid package structure: {0}")]
    InvalidStructure(String),

    /// Attribute value tag not known to the codec
    #[error("Unknown attribute tag {tag} on '{name}'")]
    UnknownAttributeTag { name: String, tag: u8 },

    /// Object not found by path
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Handle does not address an entry of this container
    #[error("Handle {handle} out of bounds (exports: {exports}, imports: {imports})")]
    HandleOutOfBounds { handle: i32, exports: usize, imports: usize },

    /// Parent chain loops back on itself
    #[error("Structural cycle in parent chain of {path}")]
    StructuralCycle { path: String },

    /// Collection actor member list and transform table disagree
    #[error("Collection table mismatch: {members} members, {transforms} transforms")]
    CollectionMismatch { members: usize, transforms: usize },

    /// Source/destination formats are not a supported port pair
    #[error("Unsupported port pair: {source_format} -> {target}")]
    UnsupportedPort { source_format: String, target: String },

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// JSON (config or donor index) error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Result type alias for porting operations.
pub type Result<T> = std::result::Result<T, Error>;
