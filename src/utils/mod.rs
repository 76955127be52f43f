//! Utility Functions and Diagnostics
//!
//! Startup diagnostics and user-friendly error formatting for the CLI.
//!
//! ## Error Formatting
//!
//! ```rust
//! use refresh_switch::utils::format_user_error;
//!
//! let error = anyhow::anyhow!("Failed to parse config file");
//! eprintln!("{}", format_user_error(&error));
//! ```
//!
//! Error categories with context-aware help:
//! - D-Bus errors → not a GNOME session, missing session bus, wrong service name
//! - Apply errors → stale serial, unusable mode
//! - Lookup errors → unknown connector or refresh rate
//! - Config errors → syntax, invalid values

pub mod diagnostics;
pub mod errors;

pub use diagnostics::{log_startup_diagnostics, DesktopSession, SystemInfo};
pub use errors::{categorize, format_user_error, ErrorCategory};
