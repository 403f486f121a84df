//! Rebuilding a level's ordered membership lists from its object graph.
//!
//! Both rebuilds are pure functions of the current graph: running them again
//! on their own output changes nothing.

use std::cmp::Ordering;

use crate::model::{tags, AttrValue, Attributes, ClassCategory, Container, LevelBinary, Payload, Reference};
use crate::relink::{Diagnostic, Diagnostics};
use crate::util::{Error, Result};

/// Legacy slot in the placeable list that always holds null.
pub const RESERVED_SLOT: usize = 1;

/// Options for the placeable-list rebuild.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssemblyOptions {
    /// List lights individually and drop light collections from the list instead of
    /// the other way round.
    pub unpack_light_collections: bool,
}

impl AssemblyOptions {
    /// Unpacking is a debug-build-only mode.
    pub fn new(debug_build: bool, debug_convert_static_lighting: bool) -> Self {
        Self { unpack_light_collections: debug_build && debug_convert_static_lighting }
    }
}

/// Whether `actor` is a light represented by a light collection.
fn is_collected_light(c: &Container, actor: Reference) -> bool {
    let Some(component) = c.entry(actor).and_then(|e| e.attributes.object(Attributes::LIGHT_COMPONENT)) else {
        return false;
    };
    c.parent_of(component)
        .and_then(|p| c.entry(p))
        .is_some_and(|owner| owner.category() == ClassCategory::LightCollection)
}

/// Rebuild the level's placeable list and write it back into the level payload.
///
/// The list holds every placeable object parented to the level in arena order,
/// minus the excluded lighting objects, with a null at [`RESERVED_SLOT`].
pub fn rebuild_level_actors(c: &mut Container, level: Reference, options: AssemblyOptions) -> Result<Vec<Reference>> {
    let mut actors = Vec::new();
    for (r, entry) in c.exports() {
        if entry.parent() != Some(level) {
            continue;
        }
        let category = entry.category();
        if !category.is_placeable() {
            continue;
        }
        if options.unpack_light_collections {
            if category == ClassCategory::LightCollection {
                continue;
            }
        } else if is_collected_light(c, r) {
            tracing::trace!(actor = %r, "light lives in a collection, not listed");
            continue;
        }
        actors.push(r);
    }

    if actors.is_empty() {
        actors.push(Reference::NULL);
    }
    actors.insert(RESERVED_SLOT, Reference::NULL);

    let entry = c.get_mut(level)?;
    let tail = match entry.payload()? {
        Payload::Level(binary) => binary.tail,
        Payload::None => Vec::new(),
        _ => return Err(Error::invalid(format!("{} is not a level", entry.name))),
    };
    entry.set_payload(&Payload::Level(LevelBinary { actors: actors.clone(), tail }));
    tracing::debug!(count = actors.len(), "placeable list rebuilt");
    Ok(actors)
}

/// Rebuild the streaming list on the world settings object.
///
/// Markers are ordered by their `PackageName` (byte-wise), ties by handle.
/// Returns `None`, after recording a diagnostic, when the container has no world
/// settings object.
pub fn rebuild_streaming_levels(c: &mut Container, diagnostics: &mut Diagnostics) -> Result<Option<Vec<Reference>>> {
    let mut world_settings = None;
    let mut markers: Vec<(String, Reference)> = Vec::new();
    for (r, entry) in c.exports() {
        match entry.class.as_str() {
            tags::WORLD_SETTINGS if entry.name.base == tags::WORLD_SETTINGS => {
                world_settings.get_or_insert(r);
            }
            tags::STREAMING_MARKER if entry.name.base == tags::STREAMING_MARKER => {
                let package = entry.attributes.name(Attributes::PACKAGE_NAME).unwrap_or_default();
                markers.push((package.to_string(), r));
            }
            _ => {}
        }
    }

    let Some(world_settings) = world_settings else {
        diagnostics.push(Diagnostic::MissingWorldSettings {
            container: c.base_name().unwrap_or("<unsaved>").to_string(),
        });
        return Ok(None);
    };

    markers.sort_by(|a, b| match a.0.cmp(&b.0) {
        Ordering::Equal => a.1.cmp(&b.1),
        other => other,
    });
    let list: Vec<Reference> = markers.into_iter().map(|(_, r)| r).collect();

    c.get_mut(world_settings)?
        .attributes
        .set(Attributes::STREAMING_LEVELS, AttrValue::ObjectArray(list.clone()));
    tracing::debug!(count = list.len(), "streaming list rebuilt");
    Ok(Some(list))
}

/// Run both rebuilds on the container's persistent level.
pub fn assemble_level(c: &mut Container, options: AssemblyOptions, diagnostics: &mut Diagnostics) -> Result<()> {
    let level = c
        .persistent_level()
        .ok_or_else(|| Error::ObjectNotFound(crate::model::PERSISTENT_LEVEL_PATH.to_string()))?;
    rebuild_streaming_levels(c, diagnostics)?;
    rebuild_level_actors(c, level, options)?;
    Ok(())
}
