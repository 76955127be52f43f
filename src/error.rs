//! Error types shared by the decoder, grouping engine and switcher.

use thiserror::Error;

/// Refresh switch result type
pub type Result<T> = std::result::Result<T, SwitchError>;

/// Refresh switch error types
#[derive(Error, Debug)]
pub enum SwitchError {
    /// The compositor snapshot does not have the expected shape
    #[error("Malformed display state: {0}")]
    Decode(String),

    /// A monitor reported no modes at all
    #[error("Monitor {0} has no modes")]
    NoModes(String),

    /// No monitor with this connector in the current state
    #[error("Unknown monitor: {0}")]
    UnknownMonitor(String),

    /// The monitor has no mode with this id
    #[error("Monitor {connector} has no mode {mode_id}")]
    UnknownMode {
        /// Monitor connector
        connector: String,
        /// Requested mode id
        mode_id: String,
    },

    /// A group/entry position that is not in the presented model
    #[error("No selectable mode at {connector} group {group} entry {entry}")]
    UnknownSelection {
        /// Monitor connector
        connector: String,
        /// Group index
        group: usize,
        /// Entry index within the group
        entry: usize,
    },

    /// No group with this label on the monitor, or no entry with the requested flags
    #[error("Monitor {connector} has no {label} Hz choice{detail}")]
    UnknownLabel {
        /// Monitor connector
        connector: String,
        /// Requested group label
        label: String,
        /// Requested submode, empty for the plain entry
        detail: String,
    },

    /// A logical monitor references a monitor without a current mode
    #[error("Monitor {0} has no current mode")]
    NoCurrentMode(String),

    /// The compositor rejected ApplyMonitorsConfig
    #[error("Failed to apply monitors config: {0}")]
    Apply(String),

    /// D-Bus transport error
    #[error("D-Bus error: {0}")]
    DBus(#[from] zbus::Error),
}
