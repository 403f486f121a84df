//! Cross-container cloning with reference remapping.
//!
//! - [`Relinker`] - clones objects and their dependency closure into a destination
//! - [`IdentityPolicy`] - counter reconciliation for objects shared across files
//! - [`Diagnostics`] - recoverable outcomes collected during a port

mod clone;
mod diagnostics;
mod identity;

pub use clone::Relinker;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use identity::{CanonicalException, CounterRule, IdentityPolicy, CANONICAL_EXCEPTIONS};
