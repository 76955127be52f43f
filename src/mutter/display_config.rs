//! Mutter DisplayConfig D-Bus Interface
//!
//! Proxy for `org.gnome.Mutter.DisplayConfig`, the interface gnome-control-center
//! uses to read and change monitor configuration.
//!
//! Only the monitors API is used (`GetCurrentState`, `ApplyMonitorsConfig`,
//! `MonitorsChanged`); the legacy CRTC based `GetResources` API is not.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::collections::HashMap;
use tracing::{debug, info};
use zbus::zvariant::Value;
use zbus::Connection;

use crate::display::{decode_state, ApplyRequest, MonitorsState, RawMonitorsState};
use crate::error::{Result, SwitchError};
use crate::switcher::DisplayConfigBackend;

/// Well-known name and interface of the DisplayConfig service
pub const DISPLAY_CONFIG_SERVICE: &str = "org.gnome.Mutter.DisplayConfig";

/// Object path of the DisplayConfig service
pub const DISPLAY_CONFIG_PATH: &str = "/org/gnome/Mutter/DisplayConfig";

const UNDERSCAN_PROPERTY: &str = "enable-underscanning";
const LAYOUT_MODE_PROPERTY: &str = "layout-mode";

/// `(ssa{sv})`
pub type WireMonitor = (String, String, HashMap<String, Value<'static>>);

/// `(iiduba(ssa{sv}))`
pub type WireLogicalMonitor = (i32, i32, f64, u32, bool, Vec<WireMonitor>);

/// `(uua(iiduba(ssa{sv}))a{sv})`
pub type WireApplyArgs = (
    u32,
    u32,
    Vec<WireLogicalMonitor>,
    HashMap<String, Value<'static>>,
);

/// DisplayConfig interface proxy
///
/// Service: org.gnome.Mutter.DisplayConfig
/// Path: /org/gnome/Mutter/DisplayConfig
#[derive(Debug, Clone)]
pub struct MutterDisplayConfig {
    proxy: zbus::Proxy<'static>,
}

impl MutterDisplayConfig {
    /// Create a proxy for the default service name and path
    pub async fn new(connection: &Connection) -> Result<Self> {
        Self::with_names(connection, DISPLAY_CONFIG_SERVICE, DISPLAY_CONFIG_PATH).await
    }

    /// Create a proxy for a service exported under another name or path
    pub async fn with_names(connection: &Connection, destination: &str, path: &str) -> Result<Self> {
        let proxy = zbus::ProxyBuilder::new(connection)
            .interface(DISPLAY_CONFIG_SERVICE)?
            .path(path.to_owned())?
            .destination(destination.to_owned())?
            .build()
            .await?;

        debug!("DisplayConfig proxy created for {} at {}", destination, path);
        Ok(Self { proxy })
    }

    /// Call `GetCurrentState` and return the undecoded reply
    pub async fn get_raw_state(&self) -> Result<RawMonitorsState> {
        let response = self.proxy.call_method("GetCurrentState", &()).await?;

        let body = response.body();
        body.deserialize::<RawMonitorsState>()
            .map_err(|e| SwitchError::Decode(format!("GetCurrentState reply: {}", e)))
    }

    /// Subscribe to `MonitorsChanged`
    ///
    /// The signal has no arguments; every item means "state changed, fetch it
    /// again". The subscription ends when the stream is dropped.
    pub async fn receive_monitors_changed(&self) -> Result<BoxStream<'static, ()>> {
        let signals = self.proxy.receive_signal("MonitorsChanged").await?;
        Ok(signals.map(|_| ()).boxed())
    }
}

#[async_trait]
impl DisplayConfigBackend for MutterDisplayConfig {
    async fn get_current_state(&self) -> Result<MonitorsState> {
        decode_state(self.get_raw_state().await?)
    }

    async fn apply_monitors_config(&self, request: &ApplyRequest) -> Result<()> {
        info!(
            "ApplyMonitorsConfig serial {} method {:?} ({} logical monitors)",
            request.serial,
            request.method,
            request.logical_monitors.len()
        );
        self.proxy
            .call_method("ApplyMonitorsConfig", &encode_request(request))
            .await
            .map_err(|e| SwitchError::Apply(e.to_string()))?;

        Ok(())
    }
}

/// Arguments of `ApplyMonitorsConfig` for `request`
pub fn encode_request(request: &ApplyRequest) -> WireApplyArgs {
    let logical_monitors = request
        .logical_monitors
        .iter()
        .map(|lm| {
            let monitors = lm
                .monitors
                .iter()
                .map(|m| {
                    let mut properties = HashMap::new();
                    if let Some(underscan) = m.underscan {
                        properties.insert(UNDERSCAN_PROPERTY.to_string(), Value::Bool(underscan));
                    }
                    (m.connector.clone(), m.mode_id.clone(), properties)
                })
                .collect();
            (lm.x, lm.y, lm.scale, lm.transform, lm.primary, monitors)
        })
        .collect();

    let mut properties = HashMap::new();
    if let Some(layout_mode) = request.layout_mode {
        properties.insert(LAYOUT_MODE_PROPERTY.to_string(), Value::U32(layout_mode));
    }

    (
        request.serial,
        request.method.as_u32(),
        logical_monitors,
        properties,
    )
}
