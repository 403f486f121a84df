//! Object entries, references and names.

use std::fmt;

use super::{Attributes, ClassCategory, Payload};
use crate::util::Result;

/// Signed handle to an entry of the same container.
///
/// Positive values address exports (1-based), negative values address
/// imports (`-1` is the first import) and zero is null. Only positive
/// values may ever be dereferenced as local entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference(pub i32);

impl Reference {
    /// The null reference.
    pub const NULL: Self = Self(0);

    /// Reference to the export stored at a 0-based arena slot.
    #[inline]
    pub fn export(slot: usize) -> Self {
        Self(slot as i32 + 1)
    }

    /// Reference to the import stored at a 0-based table slot.
    #[inline]
    pub fn import(slot: usize) -> Self {
        Self(-(slot as i32) - 1)
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_export(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn is_import(self) -> bool {
        self.0 < 0
    }

    /// 0-based arena slot for exports.
    #[inline]
    pub fn export_slot(self) -> Option<usize> {
        self.is_export().then(|| (self.0 - 1) as usize)
    }

    /// 0-based table slot for imports.
    #[inline]
    pub fn import_slot(self) -> Option<usize> {
        self.is_import().then(|| (-self.0 - 1) as usize)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Object name with its disambiguation counter.
///
/// A counter of 0 means "no suffix"; counter `n > 0` renders as `base_{n-1}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectName {
    pub base: String,
    pub number: u32,
}

impl ObjectName {
    pub fn new(base: impl Into<String>, number: u32) -> Self {
        Self { base: base.into(), number }
    }

    /// Parse an instanced name (`StaticMeshActor_12` -> base + counter 13).
    pub fn parse(instanced: &str) -> Self {
        if let Some(pos) = instanced.rfind('_') {
            let (base, digits) = (&instanced[..pos], &instanced[pos + 1..]);
            let canonical = !digits.is_empty()
                && digits.bytes().all(|b| b.is_ascii_digit())
                && (digits == "0" || !digits.starts_with('0'));
            if canonical && !base.is_empty() {
                if let Ok(n) = digits.parse::<u32>() {
                    if let Some(number) = n.checked_add(1) {
                        return Self::new(base, number);
                    }
                }
            }
        }
        Self::new(instanced, 0)
    }

    /// Name with the counter suffix applied.
    pub fn instanced(&self) -> String {
        if self.number == 0 {
            self.base.clone()
        } else {
            format!("{}_{}", self.base, self.number - 1)
        }
    }

    /// Same name with a different counter.
    pub fn with_number(&self, number: u32) -> Self {
        Self::new(self.base.clone(), number)
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.number == 0 {
            f.write_str(&self.base)
        } else {
            write!(f, "{}_{}", self.base, self.number - 1)
        }
    }
}

/// External reference recorded in a container's import table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    pub class: String,
    /// Fully-qualified path of the referenced object.
    pub path: String,
}

impl Import {
    pub fn new(class: impl Into<String>, path: impl Into<String>) -> Self {
        Self { class: class.into(), path: path.into() }
    }

    /// First path segment (the package the object lives in).
    pub fn package(&self) -> &str {
        self.path.split('.').next().unwrap_or(&self.path)
    }
}

/// A typed node of a container's object graph.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectEntry {
    /// Class tag.
    pub class: String,
    /// Class definition object, null for native classes.
    pub class_ref: Reference,
    /// Template object this entry was instanced from.
    pub archetype: Reference,
    pub name: ObjectName,
    pub attributes: Attributes,
    pub(crate) parent: Option<Reference>,
    pub(crate) payload: Vec<u8>,
}

impl ObjectEntry {
    /// Create an entry with no parent, attributes or payload.
    pub fn new(class: impl Into<String>, name: ObjectName) -> Self {
        Self {
            class: class.into(),
            class_ref: Reference::NULL,
            archetype: Reference::NULL,
            name,
            attributes: Attributes::new(),
            parent: None,
            payload: Vec::new(),
        }
    }

    /// Builder: set the structural parent (an export).
    pub fn with_parent(mut self, parent: Reference) -> Self {
        self.parent = Some(parent).filter(|p| p.is_export());
        self
    }

    /// Builder: set the attributes.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Builder: set the encoded payload.
    pub fn with_payload(mut self, payload: &Payload) -> Self {
        self.payload = payload.encode();
        self
    }

    /// Structural parent, if any.
    #[inline]
    pub fn parent(&self) -> Option<Reference> {
        self.parent
    }

    /// Class category of this entry.
    #[inline]
    pub fn category(&self) -> ClassCategory {
        ClassCategory::of(&self.class)
    }

    /// Raw payload bytes as stored in the package.
    #[inline]
    pub fn raw_payload(&self) -> &[u8] {
        &self.payload
    }

    /// Replace the raw payload bytes.
    pub fn set_raw_payload(&mut self, bytes: Vec<u8>) {
        self.payload = bytes;
    }

    /// Decode the payload according to the class category.
    pub fn payload(&self) -> Result<Payload> {
        Payload::decode(self.category(), &self.payload)
    }

    /// Encode and store a payload.
    pub fn set_payload(&mut self, payload: &Payload) {
        self.payload = payload.encode();
    }

    /// Every reference this entry holds outside its parent link, in a stable order:
    /// class, archetype, attributes, then payload.
    pub fn references(&self) -> Result<Vec<Reference>> {
        let mut out = vec![self.class_ref, self.archetype];
        self.attributes.for_each_reference(&mut |r| out.push(r));
        self.payload()?.for_each_reference(&mut |r| out.push(r));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_slots() {
        assert_eq!(Reference::export(0), Reference(1));
        assert_eq!(Reference::import(0), Reference(-1));
        assert_eq!(Reference(5).export_slot(), Some(4));
        assert_eq!(Reference(-3).import_slot(), Some(2));
        assert_eq!(Reference::NULL.export_slot(), None);
        assert_eq!(Reference(-3).export_slot(), None);
    }

    #[test]
    fn test_name_parse_and_render() {
        let n = ObjectName::parse("StaticMeshActor_12");
        assert_eq!(n, ObjectName::new("StaticMeshActor", 13));
        assert_eq!(n.instanced(), "StaticMeshActor_12");

        let n = ObjectName::parse("Model_3");
        assert_eq!(n.number, 4);

        assert_eq!(ObjectName::parse("TheWorld"), ObjectName::new("TheWorld", 0));
        assert_eq!(ObjectName::parse("Thing_07"), ObjectName::new("Thing_07", 0));
        assert_eq!(ObjectName::parse("Trailing_"), ObjectName::new("Trailing_", 0));
        assert_eq!(ObjectName::new("Light", 1).to_string(), "Light_0");
    }
}
