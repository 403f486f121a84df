//! Graph clone and relink.
//!
//! Copies one object, its structural subtree and everything it references
//! from a source container into a destination, rewriting every reference to
//! point at destination handles.
//!
//! Handles are reserved before any reference is resolved: an entry is added
//! to the destination as soon as it is placed and its attributes/payload are
//! written once the references they contain have been resolved. Reference
//! cycles therefore close on already-reserved handles and no reference is
//! ever written that points at an unallocated slot.

use std::collections::{HashMap, VecDeque};

use super::{CounterRule, Diagnostic, Diagnostics, IdentityPolicy};
use crate::core::ContainerCache;
use crate::donor::DonorIndex;
use crate::model::{Container, Import, ObjectEntry, ObjectName, Payload, Reference};
use crate::util::{Error, Result};

/// Per-source bookkeeping for one clone operation.
struct Session<'s> {
    source: &'s Container,
    /// Source handle -> destination handle.
    map: HashMap<Reference, Reference>,
    /// Placed entries whose attributes and payload still need writing.
    pending: VecDeque<(Reference, Reference)>,
}

impl<'s> Session<'s> {
    fn new(source: &'s Container) -> Self {
        Self { source, map: HashMap::new(), pending: VecDeque::new() }
    }
}

/// Clone/relink engine.
///
/// Holds the run-wide donor index and container cache by reference, plus the
/// per-file identity policy and diagnostics.
pub struct Relinker<'a, 'io> {
    index: &'a DonorIndex,
    cache: &'a mut ContainerCache<'io>,
    helper: Option<&'a Container>,
    native_packages: &'a [String],
    identity: IdentityPolicy,
    diagnostics: Diagnostics,
}

impl<'a, 'io> Relinker<'a, 'io> {
    pub fn new(index: &'a DonorIndex, cache: &'a mut ContainerCache<'io>) -> Self {
        Self {
            index,
            cache,
            helper: None,
            native_packages: &[],
            identity: IdentityPolicy::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Fallback supplier consulted after the donor index.
    pub fn with_helper(mut self, helper: Option<&'a Container>) -> Self {
        self.helper = helper;
        self
    }

    /// Packages whose imports are carried over as imports without a donor lookup.
    pub fn with_native_packages(mut self, packages: &'a [String]) -> Self {
        self.native_packages = packages;
        self
    }

    pub fn identity_mut(&mut self) -> &mut IdentityPolicy {
        &mut self.identity
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Move the collected diagnostics out.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    /// Pin canonical shared objects of `source`'s level (see [`IdentityPolicy::reconcile_canonical`]).
    pub fn reconcile_canonical(&mut self, source: &Container, level: Reference) -> Result<()> {
        self.identity.reconcile_canonical(source, level, &mut self.diagnostics)
    }

    /// Clone `root` from `source` into `dest` under `dest_parent`.
    ///
    /// If `dest` already holds an object of the same class at the target path, that
    /// object is returned and nothing is copied. Fails with
    /// [`Error::StructuralCycle`] when `root`'s parent chain loops.
    pub fn clone_object(
        &mut self,
        source: &Container,
        root: Reference,
        dest: &mut Container,
        dest_parent: Option<Reference>,
    ) -> Result<Reference> {
        source.parent_chain(root)?;
        let mut session = Session::new(source);
        let cloned = self.clone_tree(&mut session, dest, root, dest_parent)?;
        self.relink_pending(&mut session, dest)?;
        Ok(cloned)
    }

    /// Clone `src` at its own path, creating missing ancestors as bare anchors.
    fn clone_dependency(&mut self, source: &Container, src: Reference, dest: &mut Container) -> Result<Reference> {
        let mut session = Session::new(source);
        let cloned = self.clone_referenced(&mut session, dest, src)?;
        self.relink_pending(&mut session, dest)?;
        Ok(cloned)
    }

    fn clone_referenced(&mut self, sess: &mut Session<'_>, dest: &mut Container, src: Reference) -> Result<Reference> {
        if let Some(&d) = sess.map.get(&src) {
            return Ok(d);
        }
        sess.source.parent_chain(src)?;
        let parent = match sess.source.get(src)?.parent() {
            Some(p) => Some(self.anchor(sess, dest, p)?),
            None => None,
        };
        self.clone_tree(sess, dest, src, parent)
    }

    /// Place `src` and its whole structural subtree.
    fn clone_tree(
        &mut self,
        sess: &mut Session<'_>,
        dest: &mut Container,
        src: Reference,
        dest_parent: Option<Reference>,
    ) -> Result<Reference> {
        let (dst, reused) = self.place(sess, dest, src, dest_parent)?;
        if reused {
            return Ok(dst);
        }
        for child in sess.source.children_of(src) {
            if !sess.map.contains_key(&child) {
                self.clone_tree(sess, dest, child, Some(dst))?;
            }
        }
        Ok(dst)
    }

    /// Place `src` alone (no subtree), after its ancestors.
    fn anchor(&mut self, sess: &mut Session<'_>, dest: &mut Container, src: Reference) -> Result<Reference> {
        if let Some(&d) = sess.map.get(&src) {
            return Ok(d);
        }
        let parent = match sess.source.get(src)?.parent() {
            Some(p) => Some(self.anchor(sess, dest, p)?),
            None => None,
        };
        Ok(self.place(sess, dest, src, parent)?.0)
    }

    /// Reuse or reserve the destination entry for `src`. Returns the handle and
    /// whether an existing entry was reused.
    fn place(
        &mut self,
        sess: &mut Session<'_>,
        dest: &mut Container,
        src: Reference,
        dest_parent: Option<Reference>,
    ) -> Result<(Reference, bool)> {
        let source = sess.source;
        let entry = source.get(src)?;
        let src_path = source.path_of(src)?;

        let mut name = match self.identity.rule_for(&src_path) {
            CounterRule::Preserve => entry.name.clone(),
            CounterRule::Fixed(n) => entry.name.with_number(n),
        };
        let dest_path = child_path(dest, dest_parent, &name)?;

        if let Some(existing) = dest.find_export(&dest_path) {
            if dest.get(existing)?.class.eq_ignore_ascii_case(&entry.class) {
                tracing::debug!(path = %dest_path, "already present, reusing");
                sess.map.insert(src, existing);
                return Ok((existing, true));
            }
            name.number = dest.next_free_counter(dest_parent, &name.base, name.number + 1)?;
            tracing::debug!(path = %dest_path, renamed = %name, "name taken by another class, renumbered");
        }

        let mut placed = ObjectEntry::new(entry.class.clone(), name);
        placed.parent = dest_parent;
        let dst = dest.add_export(placed)?;
        tracing::debug!(from = %src_path, to = %dst, "cloned");

        sess.map.insert(src, dst);
        sess.pending.push_back((src, dst));
        Ok((dst, false))
    }

    fn relink_pending(&mut self, sess: &mut Session<'_>, dest: &mut Container) -> Result<()> {
        while let Some((src, dst)) = sess.pending.pop_front() {
            self.relink_entry(sess, dest, src, dst)?;
        }
        Ok(())
    }

    /// Write `src`'s attributes and payload onto `dst` with every reference remapped.
    fn relink_entry(&mut self, sess: &mut Session<'_>, dest: &mut Container, src: Reference, dst: Reference) -> Result<()> {
        let source = sess.source;
        let entry = source.get(src)?;
        let from = source.path_of(src)?;

        let mut payload = match entry.payload() {
            Ok(p) => p,
            Err(e) => {
                self.diagnostics.push(Diagnostic::CloneFailed { path: from.clone(), reason: e.to_string() });
                Payload::None
            }
        };

        let mut refs = vec![entry.class_ref, entry.archetype];
        entry.attributes.for_each_reference(&mut |r| refs.push(r));
        payload.for_each_reference(&mut |r| refs.push(r));

        let mut remap: HashMap<Reference, Reference> = HashMap::new();
        for r in refs {
            if !remap.contains_key(&r) {
                let resolved = self.resolve(sess, dest, r, &from);
                tracing::trace!(%from, %r, to = %resolved, "remapped");
                remap.insert(r, resolved);
            }
        }
        let mut lookup = |r: Reference| remap.get(&r).copied().unwrap_or(Reference::NULL);

        let mut attributes = entry.attributes.clone();
        attributes.map_references(&mut lookup);
        payload.map_references(&mut lookup);

        let target = dest.get_mut(dst)?;
        target.class_ref = lookup(entry.class_ref);
        target.archetype = lookup(entry.archetype);
        target.attributes = attributes;
        target.set_payload(&payload);
        Ok(())
    }

    /// Destination handle for a source reference. Failures become diagnostics and null.
    fn resolve(&mut self, sess: &mut Session<'_>, dest: &mut Container, r: Reference, from: &str) -> Reference {
        if r.is_null() {
            return Reference::NULL;
        }
        if r.is_import() {
            return match sess.source.import(r) {
                Some(import) => self.resolve_import(dest, import, from),
                None => self.dangling(from, r),
            };
        }
        if sess.source.entry(r).is_none() {
            return self.dangling(from, r);
        }
        match self.clone_referenced(sess, dest, r) {
            Ok(d) => d,
            Err(Error::StructuralCycle { path }) => {
                self.diagnostics.push(Diagnostic::StructuralCycle { path });
                Reference::NULL
            }
            Err(e) => {
                let path = sess.source.path_of(r).unwrap_or_else(|_| r.to_string());
                self.diagnostics.push(Diagnostic::CloneFailed { path, reason: e.to_string() });
                Reference::NULL
            }
        }
    }

    fn dangling(&mut self, from: &str, r: Reference) -> Reference {
        self.diagnostics.push(Diagnostic::DanglingReference { from: from.to_string(), handle: r.0 });
        Reference::NULL
    }

    /// Resolve a source import: existing destination export, native import, donor
    /// clone, or (on a miss) the import itself plus a diagnostic.
    fn resolve_import(&mut self, dest: &mut Container, import: &Import, from: &str) -> Reference {
        if let Some(existing) = dest.find_export(&import.path) {
            return existing;
        }
        let package = import.package();
        if self.native_packages.iter().any(|p| p.eq_ignore_ascii_case(package)) {
            return dest.add_import(import.clone());
        }
        match self.clone_from_donor(dest, &import.path) {
            Ok(Some(d)) => d,
            Ok(None) => {
                self.diagnostics.push(Diagnostic::MissingDonor {
                    path: import.path.clone(),
                    referenced_by: from.to_string(),
                });
                dest.add_import(import.clone())
            }
            Err(e) => {
                self.diagnostics.push(Diagnostic::CloneFailed { path: import.path.clone(), reason: e.to_string() });
                dest.add_import(import.clone())
            }
        }
    }

    fn clone_from_donor(&mut self, dest: &mut Container, path: &str) -> Result<Option<Reference>> {
        if let Some(file) = self.index.resolve(path) {
            let donor = self.cache.get_or_open(&file)?;
            match donor.find_export(path) {
                Some(r) => {
                    tracing::debug!(%path, donor = %file.display(), "cloning from donor");
                    return self.clone_dependency(&donor, r, dest).map(Some);
                }
                None => tracing::debug!(%path, donor = %file.display(), "indexed donor lacks object"),
            }
        }
        if let Some(helper) = self.helper {
            if let Some(r) = helper.find_export(path) {
                tracing::debug!(%path, "cloning from helper package");
                return self.clone_dependency(helper, r, dest).map(Some);
            }
        }
        Ok(None)
    }
}

/// Path `name` would have under `parent` in `dest`.
fn child_path(dest: &Container, parent: Option<Reference>, name: &ObjectName) -> Result<String> {
    Ok(match parent {
        Some(p) => format!("{}.{}", dest.path_of(p)?, name.instanced()),
        None => name.instanced(),
    })
}
