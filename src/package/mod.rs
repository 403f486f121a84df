//! Binary package format.
//!
//! A package file is a 16-byte header followed by a (optionally zlib
//! compressed) body holding the import table and the export table:
//!
//! ```text
//! [0..4)   magic "WPKG"
//! [4..6)   format version (u16 LE)
//! [6..8)   flags (bit 0: compressed body)
//! [8..16)  uncompressed body length (u64 LE)
//! body:    import_count u32, export_count u32, imports..., exports...
//! ```

pub mod format;
pub mod reader;
pub mod writer;
mod io;

pub use format::Format;
pub use io::{BinaryPackageIo, PackageIo};
pub use reader::{decode_package, open_package};
pub use writer::{encode_package, save_package};
