//! Raw State Decoder
//!
//! Turns the `GetCurrentState` reply into [`MonitorsState`]. This is the only
//! place that knows Mutter's property keys or deals with variant boxing.
//!
//! Reply signature: `(ua((ssss)a(siiddada{sv})a{sv})a(iiduba(ssss)a{sv})a{sv})`
//!
//! A malformed mode, monitor or logical monitor is logged and dropped from its
//! list; only a malformed set of global properties fails the whole decode.

use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{debug, warn};
use zbus::zvariant::{OwnedValue, Value};

use super::state::{GlobalProperties, LogicalMonitor, Mode, Monitor, MonitorSpec, MonitorsState};
use crate::error::{Result, SwitchError};

/// `a{sv}` property bag
pub type RawProperties = HashMap<String, OwnedValue>;

/// `(ssss)` connector, vendor, product, serial
pub type RawMonitorSpec = (String, String, String, String);

/// `(siiddada{sv})` id, width, height, refresh, preferred scale, supported scales, properties
pub type RawMode = (String, i32, i32, f64, f64, Vec<f64>, RawProperties);

/// `((ssss)a(siiddada{sv})a{sv})`
pub type RawMonitor = (RawMonitorSpec, Vec<RawMode>, RawProperties);

/// `(iiduba(ssss)a{sv})` x, y, scale, transform, primary, monitors, properties
pub type RawLogicalMonitor = (i32, i32, f64, u32, bool, Vec<RawMonitorSpec>, RawProperties);

/// Full `GetCurrentState` reply
pub type RawMonitorsState = (u32, Vec<RawMonitor>, Vec<RawLogicalMonitor>, RawProperties);

// Mode properties
const IS_CURRENT: &str = "is-current";
const IS_PREFERRED: &str = "is-preferred";
const IS_INTERLACED: &str = "is-interlaced";

// Monitor properties
const IS_UNDERSCANNING: &str = "is-underscanning";
const DISPLAY_NAME: &str = "display-name";
const IS_BUILTIN: &str = "is-builtin";

// Global properties
const LAYOUT_MODE: &str = "layout-mode";
const SUPPORTS_CHANGING_LAYOUT_MODE: &str = "supports-changing-layout-mode";
const GLOBAL_SCALE_REQUIRED: &str = "global-scale-required";
const LEGACY_UI_SCALING_FACTOR: &str = "legacy-ui-scaling-factor";

/// Highest valid Mutter transform (flipped-270)
const MAX_TRANSFORM: u32 = 7;

/// Decode a full `GetCurrentState` reply
pub fn decode_state(raw: RawMonitorsState) -> Result<MonitorsState> {
    let (serial, raw_monitors, raw_logical_monitors, raw_properties) = raw;

    let properties = decode_global_properties(&raw_properties).map_err(SwitchError::Decode)?;
    let monitors = decode_all(raw_monitors, decode_monitor, "monitor");
    let logical_monitors = decode_all(raw_logical_monitors, decode_logical_monitor, "logical monitor");

    debug!(
        "Decoded state serial {}: {} monitors, {} logical monitors",
        serial,
        monitors.len(),
        logical_monitors.len()
    );

    Ok(MonitorsState {
        serial,
        monitors,
        logical_monitors,
        properties,
    })
}

/// Decode every element, logging and dropping the ones that fail
fn decode_all<R, T>(
    raw: Vec<R>,
    decode: impl Fn(R) -> std::result::Result<T, String>,
    what: &str,
) -> Vec<T> {
    if raw.is_empty() {
        debug!("Empty source list for {}s", what);
    }
    raw.into_iter()
        .enumerate()
        .filter_map(|(idx, r)| match decode(r) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Dropping {} #{}: {}", what, idx, e);
                None
            }
        })
        .collect()
}

fn decode_spec(raw: RawMonitorSpec) -> std::result::Result<MonitorSpec, String> {
    let (connector, vendor, product, serial) = raw;
    if connector.is_empty() {
        return Err("empty connector".to_string());
    }
    Ok(MonitorSpec {
        connector,
        vendor,
        product,
        serial,
    })
}

fn decode_mode(raw: RawMode) -> std::result::Result<Mode, String> {
    let (id, width, height, refresh_rate, preferred_scale, supported_scales, raw_props) = raw;
    if id.is_empty() {
        return Err("empty mode id".to_string());
    }
    if width <= 0 || height <= 0 {
        return Err(format!("mode {} has invalid size {}x{}", id, width, height));
    }
    if !refresh_rate.is_finite() || refresh_rate <= 0.0 {
        return Err(format!("mode {} has invalid refresh rate {}", id, refresh_rate));
    }

    let props = Properties(&raw_props);
    Ok(Mode {
        current: props.bool(IS_CURRENT)?.unwrap_or(false),
        preferred: props.bool(IS_PREFERRED)?.unwrap_or(false),
        interlaced: props.bool(IS_INTERLACED)?.unwrap_or(false),
        id,
        width,
        height,
        refresh_rate,
        preferred_scale,
        supported_scales,
    })
}

fn decode_monitor(raw: RawMonitor) -> std::result::Result<Monitor, String> {
    let (raw_spec, raw_modes, raw_props) = raw;
    let spec = decode_spec(raw_spec)?;
    let props = Properties(&raw_props);

    let underscanning = props.bool(IS_UNDERSCANNING)?;
    let display_name = props.string(DISPLAY_NAME)?;
    let is_builtin = props.bool(IS_BUILTIN)?.unwrap_or(false);

    let mut modes = IndexMap::new();
    for mode in decode_all(raw_modes, decode_mode, "mode") {
        if modes.contains_key(&mode.id) {
            warn!("Monitor {} reports mode {} twice", spec.connector, mode.id);
            continue;
        }
        modes.insert(mode.id.clone(), mode);
    }

    let current = modes.values().filter(|m| m.current).count();
    if current > 1 {
        return Err(format!(
            "monitor {} reports {} current modes",
            spec.connector, current
        ));
    }

    Ok(Monitor::new(spec, modes, underscanning, display_name, is_builtin))
}

fn decode_logical_monitor(raw: RawLogicalMonitor) -> std::result::Result<LogicalMonitor, String> {
    let (x, y, scale, transform, primary, raw_specs, _properties) = raw;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(format!("invalid scale {}", scale));
    }
    if transform > MAX_TRANSFORM {
        return Err(format!("invalid transform {}", transform));
    }
    let monitors = decode_all(raw_specs, decode_spec, "monitor reference");
    if monitors.is_empty() {
        return Err("no monitors".to_string());
    }

    Ok(LogicalMonitor {
        x,
        y,
        scale,
        transform,
        primary,
        monitors,
    })
}

fn decode_global_properties(raw: &RawProperties) -> std::result::Result<GlobalProperties, String> {
    let props = Properties(raw);
    Ok(GlobalProperties {
        layout_mode: props.u32(LAYOUT_MODE)?,
        supports_changing_layout_mode: props.bool(SUPPORTS_CHANGING_LAYOUT_MODE)?.unwrap_or(false),
        global_scale_required: props.bool(GLOBAL_SCALE_REQUIRED)?.unwrap_or(false),
        legacy_ui_scaling_factor: props.i32(LEGACY_UI_SCALING_FACTOR)?,
    })
}

/// Typed reads from an `a{sv}` bag
///
/// Absent keys read as `None`, present keys of the wrong type are an error.
struct Properties<'a>(&'a RawProperties);

impl<'a> Properties<'a> {
    fn get(&self, key: &str) -> Option<&'a Value<'static>> {
        self.0.get(key).map(|v| unbox(v))
    }

    fn bool(&self, key: &str) -> std::result::Result<Option<bool>, String> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(wrong_type(key, "b", other)),
        }
    }

    fn u32(&self, key: &str) -> std::result::Result<Option<u32>, String> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::U32(v)) => Ok(Some(*v)),
            Some(other) => Err(wrong_type(key, "u", other)),
        }
    }

    fn i32(&self, key: &str) -> std::result::Result<Option<i32>, String> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::I32(v)) => Ok(Some(*v)),
            Some(other) => Err(wrong_type(key, "i", other)),
        }
    }

    fn string(&self, key: &str) -> std::result::Result<Option<String>, String> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.to_string())),
            Some(other) => Err(wrong_type(key, "s", other)),
        }
    }
}

/// Strip any number of `v` wrappers
fn unbox<'v>(value: &'v Value<'static>) -> &'v Value<'static> {
    match value {
        Value::Value(inner) => unbox(inner),
        other => other,
    }
}

fn wrong_type(key: &str, expected: &str, value: &Value<'_>) -> String {
    format!(
        "property '{}' should be '{}', got '{}'",
        key,
        expected,
        value.value_signature()
    )
}
