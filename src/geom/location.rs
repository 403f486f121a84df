//! Placement of individual objects.
//!
//! A component owned by a collection actor is positioned through the
//! collection's transform table; anything else through its own `Location`
//! and `DrawScale3D` attributes.

use super::collection::{get_member_location, set_member_location, set_member_scale};
use crate::model::{AttrValue, Attributes, ClassCategory, Container, Reference};
use crate::util::{Point3, Result, Vec3};

/// Owning collection actor, if `r` is a component parented to one.
fn owning_collection(c: &Container, r: Reference) -> Result<Option<Reference>> {
    let entry = c.get(r)?;
    if entry.category() != ClassCategory::Component {
        return Ok(None);
    }
    Ok(entry.parent().filter(|&p| c.entry(p).is_some_and(|e| e.category().is_collection())))
}

fn is_component(c: &Container, r: Reference) -> Result<bool> {
    Ok(c.get(r)?.category() == ClassCategory::Component)
}

/// World location of an object. Objects without a location read as the origin.
pub fn get_location(c: &Container, r: Reference) -> Result<Point3> {
    if let Some(collection) = owning_collection(c, r)? {
        return Ok(get_member_location(c, collection, r)?.unwrap_or(Vec3::ZERO));
    }
    Ok(c.get(r)?.attributes.vector(Attributes::LOCATION).unwrap_or(Vec3::ZERO))
}

/// Move an object. Components outside a collection have no location of their own
/// and are left untouched; the return value says whether anything changed.
pub fn set_location(c: &mut Container, r: Reference, location: Point3) -> Result<bool> {
    if let Some(collection) = owning_collection(c, r)? {
        return set_member_location(c, collection, r, location);
    }
    if is_component(c, r)? {
        return Ok(false);
    }
    c.get_mut(r)?.attributes.set(Attributes::LOCATION, AttrValue::Vector(location));
    Ok(true)
}

/// Set the 3D draw scale of an object, with the same dispatch as [`set_location`].
pub fn set_draw_scale(c: &mut Container, r: Reference, scale: Vec3) -> Result<bool> {
    if let Some(collection) = owning_collection(c, r)? {
        return set_member_scale(c, collection, r, scale);
    }
    if is_component(c, r)? {
        return Ok(false);
    }
    c.get_mut(r)?.attributes.set(Attributes::DRAW_SCALE_3D, AttrValue::Vector(scale));
    Ok(true)
}
