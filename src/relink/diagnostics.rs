//! Recoverable porting outcomes.
//!
//! Nothing here aborts a port. Every diagnostic is logged when recorded and
//! kept so the run can print a summary at the end.

use std::collections::BTreeSet;
use std::fmt;

/// One recoverable problem found while porting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// A dependency could not be found in any donor.
    MissingDonor { path: String, referenced_by: String },
    /// More than one candidate for a canonical shared-counter object.
    AmbiguousCanonical { class: String, candidates: Vec<String> },
    /// The destination has no world settings object to receive the streaming list.
    MissingWorldSettings { container: String },
    /// A source reference pointed outside its own container's tables.
    DanglingReference { from: String, handle: i32 },
    /// A structural parent chain loops back on itself.
    StructuralCycle { path: String },
    /// Cloning one object failed; the object was skipped.
    CloneFailed { path: String, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDonor { path, referenced_by } => {
                write!(f, "no donor for {path} (referenced by {referenced_by})")
            }
            Self::AmbiguousCanonical { class, candidates } => write!(
                f,
                "{} {class} objects found ({}); fix manually",
                candidates.len(),
                candidates.join(", ")
            ),
            Self::MissingWorldSettings { container } => {
                write!(f, "no world settings object found in {container}")
            }
            Self::DanglingReference { from, handle } => {
                write!(f, "{from} holds dangling reference #{handle}; nulled")
            }
            Self::StructuralCycle { path } => write!(f, "structural cycle at {path}; not cloned"),
            Self::CloneFailed { path, reason } => write!(f, "failed to clone {path}: {reason}"),
        }
    }
}

/// Collector for [`Diagnostic`]s.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{diagnostic}");
        self.entries.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Sorted, de-duplicated paths that had no donor.
    pub fn missing_donors(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter_map(|d| match d {
                Diagnostic::MissingDonor { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Move every entry out, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.entries)
    }

    /// Append entries from another collector without logging them again.
    pub fn extend(&mut self, other: Vec<Diagnostic>) {
        self.entries.extend(other);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_donor_summary() {
        let mut d = Diagnostics::new();
        for path in ["B.Mesh", "A.Tex", "B.Mesh"] {
            d.push(Diagnostic::MissingDonor { path: path.into(), referenced_by: "X".into() });
        }
        d.push(Diagnostic::MissingWorldSettings { container: "Out".into() });

        assert_eq!(d.len(), 4);
        let summary: Vec<_> = d.missing_donors().into_iter().collect();
        assert_eq!(summary, vec!["A.Tex".to_string(), "B.Mesh".to_string()]);
    }

    #[test]
    fn test_display() {
        let d = Diagnostic::AmbiguousCanonical {
            class: "Model".into(),
            candidates: vec!["TheWorld.PersistentLevel.Model_0".into(), "TheWorld.PersistentLevel.Model_1".into()],
        };
        assert!(d.to_string().starts_with("2 Model objects found"));
        assert!(d.to_string().ends_with("fix manually"));
    }

    #[test]
    fn test_take_empties() {
        let mut d = Diagnostics::new();
        d.push(Diagnostic::StructuralCycle { path: "A.B".into() });
        let taken = d.take();
        assert_eq!(taken.len(), 1);
        assert!(d.is_empty());
    }
}
