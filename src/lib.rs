//! # worldport
//!
//! Ports level packages between format generations: selects the placeable
//! objects of each source level, clones them with their full dependency
//! closure into a fresh destination level, pulls anything the destination
//! lacks from donor packages, and rebuilds the level's membership lists.
//!
//! ## Modules
//!
//! - [`util`] - Errors and transform math
//! - [`core`] - Donor container cache and body compression
//! - [`model`] - Container arena, entries, references, payload schemas
//! - [`package`] - On-disk package codec and the [`package::PackageIo`] trait
//! - [`donor`] - Path to donor package index
//! - [`relink`] - Clone/relink engine and diagnostics
//! - [`geom`] - Collection member and actor placement
//! - [`level`] - Placeable and streaming list rebuilds
//! - [`port`] - Run configuration and orchestration
//!
//! ## Example
//!
//! ```ignore
//! use worldport::prelude::*;
//!
//! let config = PortConfig::load("port.json")?;
//! let io = BinaryPackageIo::default();
//! let report = Porter::new(config, &io)?.run()?;
//! println!("{} ported, {} failed", report.ported(), report.failed());
//! ```

pub mod util;
pub mod core;
pub mod model;
pub mod package;
pub mod donor;
pub mod relink;
pub mod geom;
pub mod level;
pub mod port;

// Re-export commonly used types
pub use util::{Error, Result};
pub use model::{Container, ObjectEntry, ObjectName, Reference};

/// Build date embedded by the build script.
pub const BUILD_DATE: &str = env!("WORLDPORT_BUILD_DATE");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result};
    pub use crate::core::ContainerCache;
    pub use crate::donor::DonorIndex;
    pub use crate::model::{Container, ObjectEntry, ObjectName, Reference};
    pub use crate::package::{BinaryPackageIo, Format, PackageIo};
    pub use crate::relink::{Diagnostic, Diagnostics, Relinker};
    pub use crate::level::AssemblyOptions;
    pub use crate::port::{LevelSet, PortConfig, PortReport, Porter};
}
