//! Level assembly.

mod assembly;

pub use assembly::{
    assemble_level, rebuild_level_actors, rebuild_streaming_levels, AssemblyOptions, RESERVED_SLOT,
};
