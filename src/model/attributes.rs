//! Named attributes attached to object entries.
//!
//! Attributes are stored as an ordered list of name/value pairs. Order is
//! preserved on write so that saved packages diff cleanly between runs.

use smallvec::SmallVec;
use std::fmt;

use super::Reference;
use crate::util::Vec3;

/// Value of a single attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    /// Name-table style identifier (e.g. a package name).
    Name(String),
    Str(String),
    /// Reference to another entry of the same container.
    Object(Reference),
    ObjectArray(Vec<Reference>),
    Vector(Vec3),
    /// Nested attributes (struct property).
    Struct(Box<Attributes>),
    NameArray(Vec<String>),
}

impl AttrValue {
    /// Short type label used in listings.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Name(_) => "name",
            Self::Str(_) => "str",
            Self::Object(_) => "object",
            Self::ObjectArray(_) => "object[]",
            Self::Vector(_) => "vector",
            Self::Struct(_) => "struct",
            Self::NameArray(_) => "name[]",
        }
    }

    /// Visit every reference held by this value, including nested structs.
    pub fn for_each_reference(&self, f: &mut impl FnMut(Reference)) {
        match self {
            Self::Object(r) => f(*r),
            Self::ObjectArray(refs) => refs.iter().copied().for_each(f),
            Self::Struct(inner) => inner.for_each_reference(f),
            _ => {}
        }
    }

    /// Rewrite every reference held by this value, including nested structs.
    pub fn map_references(&mut self, f: &mut impl FnMut(Reference) -> Reference) {
        match self {
            Self::Object(r) => *r = f(*r),
            Self::ObjectArray(refs) => {
                for r in refs.iter_mut() {
                    *r = f(*r);
                }
            }
            Self::Struct(inner) => inner.map_references(f),
            _ => {}
        }
    }
}

/// A named attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttrValue,
}

/// Ordered attribute bag.
///
/// Uses SmallVec optimization for the common case of few entries.
#[derive(Clone, Default, PartialEq)]
pub struct Attributes {
    entries: SmallVec<[Attribute; 4]>,
}

impl Attributes {
    // === Well-known attribute names ===

    pub const LOCATION: &'static str = "Location";
    pub const DRAW_SCALE_3D: &'static str = "DrawScale3D";
    pub const LIGHT_COMPONENT: &'static str = "LightComponent";
    pub const STATIC_MESH_COMPONENTS: &'static str = "StaticMeshComponents";
    pub const LIGHT_COMPONENTS: &'static str = "LightComponents";
    pub const PACKAGE_NAME: &'static str = "PackageName";
    pub const STREAMING_LEVELS: &'static str = "StreamingLevels";
    pub const KILL_Z: &'static str = "KillZ";

    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, replacing an existing one of the same name in place.
    ///
    /// Names compare case-insensitively; a replaced attribute keeps its stored name.
    pub fn set(&mut self, name: impl Into<String>, value: AttrValue) {
        let name = name.into();
        match self.get_mut(&name) {
            Some(existing) => *existing = value,
            None => self.entries.push(Attribute { name, value }),
        }
    }

    /// Get an attribute value by name.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| &a.value)
    }

    /// Get a mutable attribute value by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut AttrValue> {
        self.entries
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| &mut a.value)
    }

    /// Check if an attribute exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove an attribute and return its value.
    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        let pos = self.entries.iter().position(|a| a.name.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(pos).value)
    }

    /// Object reference attribute.
    pub fn object(&self, name: &str) -> Option<Reference> {
        match self.get(name)? {
            AttrValue::Object(r) => Some(*r),
            _ => None,
        }
    }

    /// Object array attribute.
    pub fn object_array(&self, name: &str) -> Option<&[Reference]> {
        match self.get(name)? {
            AttrValue::ObjectArray(refs) => Some(refs),
            _ => None,
        }
    }

    /// Name or string attribute.
    pub fn name(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            AttrValue::Name(s) | AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Vector attribute.
    pub fn vector(&self, name: &str) -> Option<Vec3> {
        match self.get(name)? {
            AttrValue::Vector(v) => Some(*v),
            _ => None,
        }
    }

    /// Float attribute (ints are widened).
    pub fn float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            AttrValue::Float(f) => Some(*f),
            AttrValue::Int(i) => Some(*i as f32),
            _ => None,
        }
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over attributes in stored order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.entries.iter()
    }

    /// Visit every reference held by any attribute.
    pub fn for_each_reference(&self, f: &mut impl FnMut(Reference)) {
        for attr in &self.entries {
            attr.value.for_each_reference(f);
        }
    }

    /// Rewrite every reference held by any attribute.
    pub fn map_references(&mut self, f: &mut impl FnMut(Reference) -> Reference) {
        for attr in &mut self.entries {
            attr.value.map_references(f);
        }
    }

    /// All references in stored order.
    pub fn references(&self) -> Vec<Reference> {
        let mut out = Vec::new();
        self.for_each_reference(&mut |r| out.push(r));
        out
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|a| (&a.name, &a.value)))
            .finish()
    }
}

impl FromIterator<(String, AttrValue)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (String, AttrValue)>>(iter: T) -> Self {
        let mut attrs = Self::new();
        for (k, v) in iter {
            attrs.set(k, v);
        }
        attrs
    }
}
