//! Class tags and their categories.

/// Well-known class tags.
pub mod tags {
    pub const WORLD: &str = "World";
    pub const LEVEL: &str = "Level";
    pub const WORLD_SETTINGS: &str = "BioWorldInfo";
    pub const STREAMING_MARKER: &str = "LevelStreamingKismet";
    pub const MESH_COLLECTION: &str = "StaticMeshCollectionActor";
    pub const LIGHT_COLLECTION: &str = "StaticLightCollectionActor";
    pub const MODEL: &str = "Model";
    pub const PACKAGE: &str = "Package";
    pub const START_LOCATION: &str = "BioStartLocation";
    pub const TRIGGER_STREAM: &str = "BioTriggerStream";
}

/// Actor classes that do not follow the naming suffix conventions.
const ACTOR_CLASSES: &[&str] = &[
    "Actor",
    "Brush",
    "Emitter",
    "HeightFog",
    "LensFlareSource",
    "Note",
    "PathNode",
    "CoverLink",
    "PlayerStart",
    "BioStartLocation",
    "BioTriggerStream",
    "BioPathPoint",
    "BioSunActor",
    "WorldInfo",
];

/// Closed set of class categories the porting core distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassCategory {
    World,
    Level,
    WorldSettings,
    StreamingMarker,
    MeshCollection,
    LightCollection,
    Model,
    Actor,
    Component,
    Package,
    Other,
}

impl ClassCategory {
    /// Classify a class tag.
    pub fn of(class: &str) -> Self {
        match class {
            tags::WORLD => Self::World,
            tags::LEVEL => Self::Level,
            tags::WORLD_SETTINGS | "WorldInfo" => Self::WorldSettings,
            tags::MESH_COLLECTION => Self::MeshCollection,
            tags::LIGHT_COLLECTION => Self::LightCollection,
            tags::MODEL => Self::Model,
            tags::PACKAGE => Self::Package,
            c if c.starts_with("LevelStreaming") => Self::StreamingMarker,
            c if c.ends_with("Component") => Self::Component,
            c if is_actor_tag(c) => Self::Actor,
            _ => Self::Other,
        }
    }

    /// Objects of this category belong in a level's placeable list.
    #[inline]
    pub fn is_placeable(self) -> bool {
        matches!(
            self,
            Self::WorldSettings | Self::MeshCollection | Self::LightCollection | Self::Actor
        )
    }

    /// Collection actors carry a parallel transform table.
    #[inline]
    pub fn is_collection(self) -> bool {
        matches!(self, Self::MeshCollection | Self::LightCollection)
    }

    /// Attribute holding the ordered member list of a collection category.
    pub fn member_attribute(self) -> Option<&'static str> {
        match self {
            Self::MeshCollection => Some(super::Attributes::STATIC_MESH_COMPONENTS),
            Self::LightCollection => Some(super::Attributes::LIGHT_COMPONENTS),
            _ => None,
        }
    }
}

fn is_actor_tag(class: &str) -> bool {
    ACTOR_CLASSES.contains(&class)
        || class.ends_with("Actor")
        || class.ends_with("Volume")
        || class.ends_with("Light")
        || class.ends_with("LightToggleable")
        || class.ends_with("LightMovable")
}
