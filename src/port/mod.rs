//! Run configuration and the per-file port driver.

mod config;
mod orchestrator;

pub use config::{LevelSet, PortConfig};
pub use orchestrator::{FileOutcome, FileStatus, PortReport, Porter};
