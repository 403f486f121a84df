//! Container: an arena of object entries plus an import table.
//!
//! Exports are addressed by positive [`Reference`]s into the arena; the
//! structural parent of each export is stored as a reference to another
//! export, forming a tree. A path index (case-insensitive, like the engine's
//! own name lookups) maps fully-qualified paths back to exports.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::class::tags;
use super::{Attributes, AttrValue, Import, LevelBinary, ObjectEntry, ObjectName, Payload, Reference};
use crate::package::Format;
use crate::util::{Error, Result};

/// Path of the persistent level inside a level package.
pub const PERSISTENT_LEVEL_PATH: &str = "TheWorld.PersistentLevel";

/// An addressable graph of object entries.
#[derive(Clone, Debug)]
pub struct Container {
    format: Format,
    locator: Option<PathBuf>,
    imports: Vec<Import>,
    exports: Vec<ObjectEntry>,
    path_index: HashMap<String, Reference>,
}

impl Container {
    /// Create an empty container.
    pub fn new(format: Format) -> Self {
        Self {
            format,
            locator: None,
            imports: Vec::new(),
            exports: Vec::new(),
            path_index: HashMap::new(),
        }
    }

    /// Create the empty level template every destination package starts from.
    ///
    /// Contains `TheWorld`, its persistent level, the world settings object
    /// (`BioWorldInfo_2`) and the level model (`Model_3`). The level's member
    /// list holds the world settings object.
    pub fn new_level(format: Format) -> Self {
        let mut c = Self::new(format);
        let world = c.push_unchecked(ObjectEntry::new(tags::WORLD, ObjectName::new("TheWorld", 0)));
        let level = c.push_unchecked(
            ObjectEntry::new(tags::LEVEL, ObjectName::new("PersistentLevel", 0)).with_parent(world),
        );
        let mut settings = Attributes::new();
        settings.set(Attributes::STREAMING_LEVELS, AttrValue::ObjectArray(Vec::new()));
        let world_info = c.push_unchecked(
            ObjectEntry::new(tags::WORLD_SETTINGS, ObjectName::new("BioWorldInfo", 3))
                .with_parent(level)
                .with_attributes(settings),
        );
        c.push_unchecked(ObjectEntry::new(tags::MODEL, ObjectName::new("Model", 4)).with_parent(level));

        let payload = Payload::Level(LevelBinary { actors: vec![world_info], tail: Vec::new() });
        c.exports[level.0 as usize - 1].set_payload(&payload);
        c
    }

    /// Rebuild a container from decoded tables. Parent links are not validated here;
    /// cycles surface when paths are walked.
    pub(crate) fn from_tables(format: Format, imports: Vec<Import>, exports: Vec<ObjectEntry>) -> Self {
        let mut c = Self {
            format,
            locator: None,
            imports,
            exports,
            path_index: HashMap::new(),
        };
        c.reindex();
        c
    }

    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    /// File this container was opened from or will be saved to.
    #[inline]
    pub fn locator(&self) -> Option<&Path> {
        self.locator.as_deref()
    }

    pub fn set_locator(&mut self, path: impl Into<PathBuf>) {
        self.locator = Some(path.into());
    }

    /// Base file name of the locator, without extension.
    pub fn base_name(&self) -> Option<&str> {
        self.locator.as_deref()?.file_stem()?.to_str()
    }

    #[inline]
    pub fn export_count(&self) -> usize {
        self.exports.len()
    }

    #[inline]
    pub fn import_count(&self) -> usize {
        self.imports.len()
    }

    #[inline]
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// Iterate over exports with their references, in arena order.
    pub fn exports(&self) -> impl Iterator<Item = (Reference, &ObjectEntry)> {
        self.exports.iter().enumerate().map(|(i, e)| (Reference::export(i), e))
    }

    /// Export by reference.
    pub fn entry(&self, r: Reference) -> Option<&ObjectEntry> {
        self.exports.get(r.export_slot()?)
    }

    /// Mutable export by reference.
    pub fn entry_mut(&mut self, r: Reference) -> Option<&mut ObjectEntry> {
        let slot = r.export_slot()?;
        self.exports.get_mut(slot)
    }

    /// Export by reference, or an out-of-bounds error.
    pub fn get(&self, r: Reference) -> Result<&ObjectEntry> {
        self.entry(r).ok_or_else(|| self.out_of_bounds(r))
    }

    /// Mutable export by reference, or an out-of-bounds error.
    pub fn get_mut(&mut self, r: Reference) -> Result<&mut ObjectEntry> {
        let err = self.out_of_bounds(r);
        self.entry_mut(r).ok_or(err)
    }

    /// Import by reference.
    pub fn import(&self, r: Reference) -> Option<&Import> {
        self.imports.get(r.import_slot()?)
    }

    /// Check whether a reference addresses an existing export or import.
    pub fn is_valid(&self, r: Reference) -> bool {
        self.entry(r).is_some() || self.import(r).is_some()
    }

    fn out_of_bounds(&self, r: Reference) -> Error {
        Error::HandleOutOfBounds {
            handle: r.0,
            exports: self.exports.len(),
            imports: self.imports.len(),
        }
    }

    /// Find an export by fully-qualified path.
    pub fn find_export(&self, path: &str) -> Option<Reference> {
        self.path_index.get(&path.to_ascii_lowercase()).copied()
    }

    /// Find an import by fully-qualified path.
    pub fn find_import(&self, path: &str) -> Option<Reference> {
        self.imports
            .iter()
            .position(|i| i.path.eq_ignore_ascii_case(path))
            .map(Reference::import)
    }

    /// The persistent level export, if present.
    pub fn persistent_level(&self) -> Option<Reference> {
        self.find_export(PERSISTENT_LEVEL_PATH)
    }

    /// Structural parent of an export.
    pub fn parent_of(&self, r: Reference) -> Option<Reference> {
        self.entry(r)?.parent
    }

    /// Direct structural children of an export, in arena order.
    pub fn children_of(&self, r: Reference) -> Vec<Reference> {
        self.exports()
            .filter(|(_, e)| e.parent == Some(r))
            .map(|(c, _)| c)
            .collect()
    }

    /// Ancestors of an export, nearest first. Fails on a cycle or a dangling link.
    pub fn parent_chain(&self, r: Reference) -> Result<Vec<Reference>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([r]);
        let mut current = self.get(r)?.parent;
        while let Some(p) = current {
            if !seen.insert(p) {
                return Err(Error::StructuralCycle { path: self.partial_path(r) });
            }
            chain.push(p);
            current = self.get(p)?.parent;
        }
        Ok(chain)
    }

    /// Fully-qualified path of an export or import.
    pub fn path_of(&self, r: Reference) -> Result<String> {
        if let Some(import) = self.import(r) {
            return Ok(import.path.clone());
        }
        let entry = self.get(r)?;
        let chain = self.parent_chain(r)?;
        let mut parts = Vec::with_capacity(chain.len() + 1);
        for p in chain.iter().rev() {
            parts.push(self.get(*p)?.name.instanced());
        }
        parts.push(entry.name.instanced());
        Ok(parts.join("."))
    }

    /// Best-effort path for diagnostics (stops at cycles).
    fn partial_path(&self, r: Reference) -> String {
        let mut parts = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(r);
        while let Some(c) = current {
            if !seen.insert(c) {
                parts.push("...".to_string());
                break;
            }
            match self.entry(c) {
                Some(e) => {
                    parts.push(e.name.instanced());
                    current = e.parent;
                }
                None => break,
            }
        }
        parts.reverse();
        parts.join(".")
    }

    /// Append an export. Its parent, if any, must already exist.
    pub fn add_export(&mut self, entry: ObjectEntry) -> Result<Reference> {
        if let Some(p) = entry.parent {
            self.get(p)?;
        }
        Ok(self.push_unchecked(entry))
    }

    fn push_unchecked(&mut self, entry: ObjectEntry) -> Reference {
        self.exports.push(entry);
        let r = Reference::export(self.exports.len() - 1);
        if let Ok(path) = self.path_of(r) {
            self.path_index.entry(path.to_ascii_lowercase()).or_insert(r);
        }
        r
    }

    /// Add an import, reusing an existing one with the same path.
    pub fn add_import(&mut self, import: Import) -> Reference {
        if let Some(r) = self.find_import(&import.path) {
            return r;
        }
        self.imports.push(import);
        Reference::import(self.imports.len() - 1)
    }

    /// Re-parent an export, rejecting links that would form a cycle.
    pub fn set_parent(&mut self, r: Reference, parent: Option<Reference>) -> Result<()> {
        self.get(r)?;
        if let Some(p) = parent {
            self.get(p)?;
            if p == r || self.parent_chain(p)?.contains(&r) {
                return Err(Error::StructuralCycle { path: self.partial_path(r) });
            }
        }
        self.set_parent_unchecked(r, parent);
        Ok(())
    }

    /// Re-parent without the cycle check.
    pub(crate) fn set_parent_unchecked(&mut self, r: Reference, parent: Option<Reference>) {
        if let Some(entry) = self.entry_mut(r) {
            entry.parent = parent.filter(|p| p.is_export());
        }
        self.reindex();
    }

    /// Change the disambiguation counter of an export.
    pub fn set_counter(&mut self, r: Reference, number: u32) -> Result<()> {
        self.get_mut(r)?.name.number = number;
        self.reindex();
        Ok(())
    }

    /// Smallest counter `>= start` for which `parent.base_{n}` is free.
    pub fn next_free_counter(&self, parent: Option<Reference>, base: &str, start: u32) -> Result<u32> {
        let prefix = match parent {
            Some(p) => format!("{}.", self.path_of(p)?),
            None => String::new(),
        };
        let mut number = start.max(1);
        loop {
            let candidate = format!("{prefix}{}", ObjectName::new(base, number).instanced());
            if self.find_export(&candidate).is_none() {
                return Ok(number);
            }
            number += 1;
        }
    }

    fn reindex(&mut self) {
        self.path_index.clear();
        for i in 0..self.exports.len() {
            let r = Reference::export(i);
            if let Ok(path) = self.path_of(r) {
                self.path_index.entry(path.to_ascii_lowercase()).or_insert(r);
            }
        }
    }
}
