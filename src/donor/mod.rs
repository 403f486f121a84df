//! Donor packages: where objects missing from a destination come from.

mod index;

pub use index::{DonorIndex, DonorRecord, DonorScan};
