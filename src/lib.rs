//! # refresh-switch
//!
//! Refresh-rate and underscan switching for GNOME through Mutter's
//! `org.gnome.Mutter.DisplayConfig` D-Bus interface.
//!
//! # Architecture
//!
//! ```text
//! refresh-switch
//!   ├─> mutter::MutterDisplayConfig (GetCurrentState / ApplyMonitorsConfig / MonitorsChanged)
//!   ├─> display (typed MonitorsState, change requests)
//!   ├─> model (mode groups, labels, compatibility)
//!   └─> switcher (live state, echo suppression, watcher)
//! ```
//!
//! # Data Flow
//!
//! **Read Path:** Mutter → decode → MonitorsState → PresentationModel → UI
//!
//! **Change Path:** UI selection → MonitorsState::change_mode → ApplyRequest → Mutter
//!
//! **Notification Path:** MonitorsChanged → re-fetch → Rebuild / Refresh / EchoSuppressed

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Configuration file handling
pub mod config;

/// Typed display state decoded from Mutter, and change requests built from it
pub mod display;

/// Error types
pub mod error;

/// Presentation model: refresh-rate groups and their labels
///
/// Pure functions from a [`display::MonitorsState`] to a
/// [`model::PresentationModel`]; no I/O.
pub mod model;

/// Mutter DisplayConfig D-Bus API (GNOME only)
pub mod mutter;

/// Refresh-rate rounding and label formatting
pub mod rounding;

/// Engine owning the live state
pub mod switcher;

/// Utility functions
pub mod utils;

pub use error::{Result, SwitchError};
