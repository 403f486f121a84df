//! Object placement: collection member transforms and standalone locations.

mod collection;
mod location;

pub use collection::{get_member_location, member_slot, set_member_location, set_member_scale};
pub use location::{get_location, set_draw_scale, set_location};
