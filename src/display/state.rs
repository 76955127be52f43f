//! Typed display state as reported by Mutter's `GetCurrentState`.

use indexmap::IndexMap;
use serde::Serialize;

/// One hardware-reported display mode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mode {
    /// Opaque mode id, stable for the lifetime of the monitor
    pub id: String,
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
    /// Refresh rate in Hz
    pub refresh_rate: f64,
    /// Scale Mutter would pick for this mode
    pub preferred_scale: f64,
    /// Scales usable with this mode
    pub supported_scales: Vec<f64>,
    /// Interlaced scan-out
    pub interlaced: bool,
    /// Mode preferred by the monitor (EDID)
    pub preferred: bool,
    /// Mode currently in use
    pub current: bool,
}

impl Mode {
    /// Same resolution as `other`
    pub fn same_size(&self, other: &Mode) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// Identity tuple of a physical monitor
///
/// Logical monitors reference physical ones by this tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MonitorSpec {
    /// Connector name, e.g. `HDMI-1`
    pub connector: String,
    /// EDID vendor
    pub vendor: String,
    /// EDID product
    pub product: String,
    /// EDID serial
    pub serial: String,
}

/// One physical display output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Monitor {
    /// Identity tuple
    pub spec: MonitorSpec,
    /// Modes keyed by id, in the order Mutter reported them
    pub modes: IndexMap<String, Mode>,
    /// `Some` only when the monitor supports underscanning
    pub underscanning: Option<bool>,
    /// Human readable name, if Mutter supplied one
    pub display_name: Option<String>,
    /// Built-in panel (laptop)
    pub is_builtin: bool,
    current_mode_id: Option<String>,
}

impl Monitor {
    /// Build a monitor and cache its current mode
    pub fn new(
        spec: MonitorSpec,
        modes: IndexMap<String, Mode>,
        underscanning: Option<bool>,
        display_name: Option<String>,
        is_builtin: bool,
    ) -> Self {
        let mut monitor = Self {
            spec,
            modes,
            underscanning,
            display_name,
            is_builtin,
            current_mode_id: None,
        };
        monitor.recompute_current_mode();
        monitor
    }

    /// Connector name
    pub fn connector(&self) -> &str {
        &self.spec.connector
    }

    /// Whether the compositor advertises underscan control for this monitor
    pub fn can_underscan(&self) -> bool {
        self.underscanning.is_some()
    }

    /// Underscanning currently enabled
    pub fn is_underscanning(&self) -> bool {
        self.underscanning.unwrap_or(false)
    }

    /// Id of the mode flagged current, if any
    pub fn current_mode_id(&self) -> Option<&str> {
        self.current_mode_id.as_deref()
    }

    /// Mode flagged current, if any
    pub fn current_mode(&self) -> Option<&Mode> {
        self.current_mode_id
            .as_ref()
            .and_then(|id| self.modes.get(id))
    }

    /// First mode flagged preferred
    pub fn preferred_mode(&self) -> Option<&Mode> {
        self.modes.values().find(|m| m.preferred)
    }

    /// Mode whose resolution the refresh choices are taken from
    ///
    /// Current, else preferred, else the first reported mode.
    pub fn reference_mode(&self) -> Option<&Mode> {
        self.current_mode()
            .or_else(|| self.preferred_mode())
            .or_else(|| self.modes.values().next())
    }

    /// Modes sharing the reference mode's resolution, in reported order
    pub fn modes_at_current_resolution(&self) -> Vec<&Mode> {
        match self.reference_mode() {
            Some(reference) => self
                .modes
                .values()
                .filter(|m| m.same_size(reference))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Refresh the cached current mode id from the modes' flags
    pub(crate) fn recompute_current_mode(&mut self) {
        self.current_mode_id = self
            .modes
            .values()
            .find(|m| m.current)
            .map(|m| m.id.clone());
    }

    /// Flag `mode_id` as the only current mode
    pub(crate) fn set_current_mode(&mut self, mode_id: &str) {
        for mode in self.modes.values_mut() {
            mode.current = mode.id == mode_id;
        }
        self.recompute_current_mode();
    }
}

/// Compositor-level placement of one or more physical monitors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogicalMonitor {
    /// Left edge in the global layout
    pub x: i32,
    /// Top edge in the global layout
    pub y: i32,
    /// UI scale
    pub scale: f64,
    /// Mutter transform (0 = normal .. 7 = flipped-270)
    pub transform: u32,
    /// Holds the top bar
    pub primary: bool,
    /// Physical monitors shown in this logical monitor (more than one when mirroring)
    pub monitors: Vec<MonitorSpec>,
}

/// Compositor-wide properties
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalProperties {
    /// 1 = logical, 2 = physical
    pub layout_mode: Option<u32>,
    /// `layout-mode` may be sent back with a new configuration
    pub supports_changing_layout_mode: bool,
    /// All logical monitors must share one scale
    pub global_scale_required: bool,
    /// Scale used by X11 clients
    pub legacy_ui_scaling_factor: Option<i32>,
}

/// Snapshot of the whole display configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorsState {
    /// Token echoed back on apply so Mutter can reject stale configs
    pub serial: u32,
    /// Physical monitors in Mutter's order
    pub monitors: Vec<Monitor>,
    /// Current layout
    pub logical_monitors: Vec<LogicalMonitor>,
    /// Compositor-wide properties
    pub properties: GlobalProperties,
}

impl MonitorsState {
    /// Monitor by connector
    pub fn monitor(&self, connector: &str) -> Option<&Monitor> {
        self.monitors.iter().find(|m| m.connector() == connector)
    }

    pub(crate) fn monitor_mut(&mut self, connector: &str) -> Option<&mut Monitor> {
        self.monitors.iter_mut().find(|m| m.connector() == connector)
    }

    /// Monitor by identity tuple, as referenced from a logical monitor
    pub fn monitor_by_spec(&self, spec: &MonitorSpec) -> Option<&Monitor> {
        self.monitors.iter().find(|m| &m.spec == spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(id: &str, width: i32, refresh_rate: f64, preferred: bool, current: bool) -> Mode {
        Mode {
            id: id.to_string(),
            width,
            height: 1080,
            refresh_rate,
            preferred_scale: 1.0,
            supported_scales: vec![1.0],
            interlaced: false,
            preferred,
            current,
        }
    }

    fn monitor(modes: Vec<Mode>) -> Monitor {
        let spec = MonitorSpec {
            connector: "DP-1".to_string(),
            vendor: "DEL".to_string(),
            product: "U2720Q".to_string(),
            serial: "1234".to_string(),
        };
        Monitor::new(
            spec,
            modes.into_iter().map(|m| (m.id.clone(), m)).collect(),
            None,
            None,
            false,
        )
    }

    #[test]
    fn test_reference_mode_prefers_current() {
        let m = monitor(vec![
            mode("a", 1920, 60.0, true, false),
            mode("b", 1280, 60.0, false, true),
        ]);
        assert_eq!(m.current_mode_id(), Some("b"));
        assert_eq!(m.reference_mode().map(|m| m.id.as_str()), Some("b"));
    }

    #[test]
    fn test_reference_mode_fallbacks() {
        let m = monitor(vec![
            mode("a", 1920, 60.0, false, false),
            mode("b", 1280, 60.0, true, false),
        ]);
        assert_eq!(m.reference_mode().map(|m| m.id.as_str()), Some("b"));

        let m = monitor(vec![mode("a", 1920, 60.0, false, false)]);
        assert_eq!(m.reference_mode().map(|m| m.id.as_str()), Some("a"));

        let m = monitor(vec![]);
        assert!(m.reference_mode().is_none());
    }

    #[test]
    fn test_modes_at_current_resolution() {
        let m = monitor(vec![
            mode("a", 1920, 60.0, false, true),
            mode("b", 1280, 60.0, false, false),
            mode("c", 1920, 50.0, false, false),
        ]);
        let ids: Vec<_> = m
            .modes_at_current_resolution()
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_set_current_mode_keeps_single_current() {
        let mut m = monitor(vec![
            mode("a", 1920, 60.0, false, true),
            mode("b", 1920, 50.0, false, false),
        ]);
        m.set_current_mode("b");
        assert_eq!(m.current_mode_id(), Some("b"));
        assert_eq!(m.modes.values().filter(|m| m.current).count(), 1);
    }
}
