//! Presentation model of the refresh-rate choices
//!
//! [`build_model`] is a pure function from a decoded [`MonitorsState`] to a
//! [`PresentationModel`]; [`compatible`] tells a UI whether a new model can be
//! applied by re-highlighting or needs a rebuild.
//!
//! [`MonitorsState`]: crate::display::MonitorsState

mod compat;
mod describe;
mod grouping;

pub use compat::{compatible, SelectionIndex, SelectionKey, SelectionPosition};
pub use describe::{entry_caption, marked_caption};
pub use grouping::{
    build_model, group_modes, ModeEntry, ModeGroup, ModelOptions, MonitorModel, PresentationModel,
};
