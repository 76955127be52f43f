//! Mode-Change Request Builder
//!
//! Flips the current markers of a [`MonitorsState`] for a user's choice and
//! rebuilds the full `ApplyMonitorsConfig` argument list from it. Mutter wants
//! every logical monitor back, not just the one that changed.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::state::MonitorsState;
use crate::error::{Result, SwitchError};

/// `method` argument of `ApplyMonitorsConfig`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyMethod {
    /// Only check the config, change nothing
    Verify,
    /// Apply until the session ends
    Temporary,
    /// Apply and store in monitors.xml
    Persistent,
}

impl ApplyMethod {
    /// Wire value
    pub fn as_u32(self) -> u32 {
        match self {
            ApplyMethod::Verify => 0,
            ApplyMethod::Temporary => 1,
            ApplyMethod::Persistent => 2,
        }
    }
}

/// `(ssa{sv})` entry of a logical monitor
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyMonitor {
    /// Connector name
    pub connector: String,
    /// Mode to drive the monitor with
    pub mode_id: String,
    /// `enable-underscanning`, only for monitors that support it
    pub underscan: Option<bool>,
}

/// `(iiduba(ssa{sv}))`
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyLogicalMonitor {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// UI scale
    pub scale: f64,
    /// Rotation/flip, unchanged from the current layout
    pub transform: u32,
    /// Holds the top bar
    pub primary: bool,
    /// Monitors mirrored in this logical monitor
    pub monitors: Vec<ApplyMonitor>,
}

/// Arguments of one `ApplyMonitorsConfig` call
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyRequest {
    /// Serial of the state the request was built from
    pub serial: u32,
    /// How Mutter should apply it
    pub method: ApplyMethod,
    /// Complete new layout
    pub logical_monitors: Vec<ApplyLogicalMonitor>,
    /// Passed through only when Mutter supports changing the layout mode
    pub layout_mode: Option<u32>,
}

impl MonitorsState {
    /// Make `mode_id` (with `underscan`) current on `connector`
    ///
    /// Returns `false` when that is already the case. Underscan requested on a
    /// monitor without the capability is dropped rather than refused. Nothing
    /// is modified when the monitor or mode is unknown.
    pub fn change_mode(&mut self, connector: &str, mode_id: &str, underscan: bool) -> Result<bool> {
        let monitor = self
            .monitor_mut(connector)
            .ok_or_else(|| SwitchError::UnknownMonitor(connector.to_string()))?;

        if !monitor.modes.contains_key(mode_id) {
            return Err(SwitchError::UnknownMode {
                connector: connector.to_string(),
                mode_id: mode_id.to_string(),
            });
        }

        let underscan = if underscan && !monitor.can_underscan() {
            warn!("{} cannot underscan, ignoring the underscan request", connector);
            false
        } else {
            underscan
        };

        if monitor.current_mode_id() == Some(mode_id) && monitor.is_underscanning() == underscan {
            debug!("{} already in mode {} (underscan {})", connector, mode_id, underscan);
            return Ok(false);
        }

        info!(
            "Switching {} from {:?} to {}{}",
            connector,
            monitor.current_mode_id(),
            mode_id,
            if underscan { " (underscan)" } else { "" }
        );
        monitor.set_current_mode(mode_id);
        if monitor.can_underscan() {
            monitor.underscanning = Some(underscan);
        }

        Ok(true)
    }

    /// Rebuild the complete apply arguments from this state
    pub fn apply_request(&self, method: ApplyMethod) -> Result<ApplyRequest> {
        let logical_monitors = self
            .logical_monitors
            .iter()
            .map(|lm| {
                let monitors = lm
                    .monitors
                    .iter()
                    .map(|spec| {
                        let monitor = self
                            .monitor_by_spec(spec)
                            .ok_or_else(|| SwitchError::UnknownMonitor(spec.connector.clone()))?;
                        let mode_id = monitor
                            .current_mode_id()
                            .ok_or_else(|| SwitchError::NoCurrentMode(spec.connector.clone()))?;
                        Ok(ApplyMonitor {
                            connector: spec.connector.clone(),
                            mode_id: mode_id.to_string(),
                            underscan: monitor.underscanning,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                Ok(ApplyLogicalMonitor {
                    x: lm.x,
                    y: lm.y,
                    scale: lm.scale,
                    transform: lm.transform,
                    primary: lm.primary,
                    monitors,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let layout_mode = if self.properties.supports_changing_layout_mode {
            self.properties.layout_mode
        } else {
            None
        };

        Ok(ApplyRequest {
            serial: self.serial,
            method,
            logical_monitors,
            layout_mode,
        })
    }
}
