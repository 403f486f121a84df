//! Core services shared by the porting pipeline.
//!
//! This module provides:
//! - [`ContainerCache`] - bounded LRU cache of opened donor packages
//! - [`compress`] / [`decompress`] - zlib helpers for package bodies

mod cache;
mod compression;

pub use cache::{CacheStats, ContainerCache};
pub use compression::{compress, decompress, is_compressed};
