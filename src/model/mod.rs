//! Object model of a world package.
//!
//! - [`Container`] - arena of [`ObjectEntry`]s plus an import table
//! - [`Reference`] - signed handle (export > 0, import < 0, null = 0)
//! - [`ObjectName`] - base name plus disambiguation counter
//! - [`Attributes`] - ordered named attribute bag
//! - [`ClassCategory`] / [`Payload`] - class-driven binary payload decoding

mod attributes;
mod class;
mod container;
mod entry;
mod payload;

pub use attributes::{AttrValue, Attribute, Attributes};
pub use class::{tags, ClassCategory};
pub use container::{Container, PERSISTENT_LEVEL_PATH};
pub use entry::{Import, ObjectEntry, ObjectName, Reference};
pub use payload::{CollectionBinary, LevelBinary, Payload};
