//! Identity reconciliation: which disambiguation counter a cloned object gets.
//!
//! By default a clone keeps its source counter. Some objects must carry the
//! same counter in every ported file so that files referencing "the same"
//! object agree on its path; those are pinned here by source path.

use std::collections::HashMap;

use super::{Diagnostic, Diagnostics};
use crate::model::{tags, Container, Reference};
use crate::util::Result;

/// Class whose single per-level instance is pinned to a fixed counter.
#[derive(Clone, Copy, Debug)]
pub struct CanonicalException {
    pub class: &'static str,
    pub counter: u32,
}

/// Objects shared across every ported file. `Model` at counter 4 is `Model_3`,
/// the model the empty level template already carries.
pub const CANONICAL_EXCEPTIONS: &[CanonicalException] = &[CanonicalException { class: tags::MODEL, counter: 4 }];

/// How to choose the counter of a clone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CounterRule {
    /// Keep the source counter, renumbering only on collision.
    Preserve,
    /// Force this counter.
    Fixed(u32),
}

/// Counter overrides keyed by source path (case-insensitive).
#[derive(Clone, Debug, Default)]
pub struct IdentityPolicy {
    pinned: HashMap<String, u32>,
}

impl IdentityPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the clone of `source_path` to use `counter`.
    pub fn pin(&mut self, source_path: &str, counter: u32) {
        self.pinned.insert(source_path.to_ascii_lowercase(), counter);
    }

    pub fn rule_for(&self, source_path: &str) -> CounterRule {
        match self.pinned.get(&source_path.to_ascii_lowercase()) {
            Some(&n) => CounterRule::Fixed(n),
            None => CounterRule::Preserve,
        }
    }

    /// Apply [`CANONICAL_EXCEPTIONS`] to the objects a source level lists.
    ///
    /// A class with exactly one instance gets pinned. More than one instance cannot be
    /// reconciled automatically and is reported instead.
    pub fn reconcile_canonical(
        &mut self,
        source: &Container,
        level: Reference,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let members = level_members(source, level)?;
        for exception in CANONICAL_EXCEPTIONS {
            let mut candidates = Vec::new();
            for &r in &members {
                if source.entry(r).is_some_and(|e| e.class == exception.class) {
                    candidates.push(source.path_of(r)?);
                }
            }
            match candidates.as_slice() {
                [] => tracing::debug!(class = exception.class, "no canonical candidate"),
                [only] => {
                    tracing::debug!(path = %only, counter = exception.counter, "pinning canonical object");
                    self.pin(only, exception.counter);
                }
                _ => diagnostics.push(Diagnostic::AmbiguousCanonical {
                    class: exception.class.to_string(),
                    candidates,
                }),
            }
        }
        Ok(())
    }
}

/// Positive entries of the level's member table, or its structural children when
/// the level carries no member table.
fn level_members(source: &Container, level: Reference) -> Result<Vec<Reference>> {
    let entry = source.get(level)?;
    Ok(match entry.payload()?.as_level() {
        Some(binary) => binary.actors.iter().copied().filter(|r| r.is_export()).collect(),
        None => source.children_of(level),
    })
}
