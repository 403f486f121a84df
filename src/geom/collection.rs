//! Collection actor member transforms.
//!
//! A collection actor keeps its members in a reference-list attribute and
//! their local-to-world transforms in a parallel table in its payload. Slot
//! `i` of the table belongs to slot `i` of the member list.

use crate::model::{CollectionBinary, Container, Payload, Reference};
use crate::util::{translation_of, with_scale, with_translation, Error, Mat4, Result, Vec3};

/// Member list and transform table of a collection actor, checked for alignment.
fn member_table(c: &Container, collection: Reference) -> Result<Option<(Vec<Reference>, CollectionBinary)>> {
    let entry = c.get(collection)?;
    let Some(attr) = entry.category().member_attribute() else {
        return Ok(None);
    };
    let members = entry.attributes.object_array(attr).map(<[Reference]>::to_vec).unwrap_or_default();
    let binary = match entry.payload()? {
        Payload::Collection(b) => b,
        Payload::None => CollectionBinary::default(),
        _ => return Ok(None),
    };
    if members.len() != binary.transforms.len() {
        return Err(Error::CollectionMismatch { members: members.len(), transforms: binary.transforms.len() });
    }
    Ok(Some((members, binary)))
}

/// Slot of `member` in the collection, if the collection lists it.
pub fn member_slot(c: &Container, collection: Reference, member: Reference) -> Result<Option<usize>> {
    if member.is_null() {
        return Ok(None);
    }
    Ok(member_table(c, collection)?.and_then(|(members, _)| members.iter().position(|&m| m == member)))
}

/// World translation of `member`, or `None` when it is not part of the collection.
pub fn get_member_location(c: &Container, collection: Reference, member: Reference) -> Result<Option<Vec3>> {
    if member.is_null() {
        return Ok(None);
    }
    let Some((members, binary)) = member_table(c, collection)? else {
        return Ok(None);
    };
    Ok(members.iter().position(|&m| m == member).map(|i| translation_of(&binary.transforms[i])))
}

/// Replace the translation of `member`'s transform. Returns `false` (and changes
/// nothing) when `member` is not part of the collection.
pub fn set_member_location(c: &mut Container, collection: Reference, member: Reference, location: Vec3) -> Result<bool> {
    update_member(c, collection, member, |m| with_translation(m, location))
}

/// Replace the scale of `member`'s transform, keeping rotation and translation.
pub fn set_member_scale(c: &mut Container, collection: Reference, member: Reference, scale: Vec3) -> Result<bool> {
    update_member(c, collection, member, |m| with_scale(m, scale))
}

fn update_member(
    c: &mut Container,
    collection: Reference,
    member: Reference,
    update: impl FnOnce(&Mat4) -> Mat4,
) -> Result<bool> {
    if member.is_null() {
        return Ok(false);
    }
    let Some((members, mut binary)) = member_table(c, collection)? else {
        return Ok(false);
    };
    let Some(slot) = members.iter().position(|&m| m == member) else {
        return Ok(false);
    };
    binary.transforms[slot] = update(&binary.transforms[slot]);
    c.get_mut(collection)?.set_payload(&Payload::Collection(binary));
    Ok(true)
}
