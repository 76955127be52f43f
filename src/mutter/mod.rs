//! Mutter D-Bus API Integration (GNOME Only)
//!
//! Direct access to GNOME Mutter's `org.gnome.Mutter.DisplayConfig` interface,
//! the same one the Displays panel of gnome-control-center talks to.
//!
//! # Compatibility
//!
//! - GNOME 3.24+: monitors API (`GetCurrentState`, `ApplyMonitorsConfig`)
//! - GNOME 3.26+: `enable-underscanning` monitor property
//!
//! # Usage
//!
//! ```rust,no_run
//! # async fn run() -> refresh_switch::error::Result<()> {
//! use refresh_switch::mutter::MutterDisplayConfig;
//! use refresh_switch::switcher::DisplayConfigBackend;
//!
//! let conn = zbus::Connection::session().await?;
//! let display_config = MutterDisplayConfig::new(&conn).await?;
//! let state = display_config.get_current_state().await?;
//! # Ok(())
//! # }
//! ```

pub mod display_config;

pub use display_config::{
    encode_request, MutterDisplayConfig, DISPLAY_CONFIG_PATH, DISPLAY_CONFIG_SERVICE,
};

/// Check if Mutter DisplayConfig API is available
///
/// Returns true if org.gnome.Mutter.DisplayConfig answers `GetCurrentState`
/// on the session bus.
pub async fn is_display_config_available() -> bool {
    use crate::switcher::DisplayConfigBackend;

    let Ok(conn) = zbus::Connection::session().await else {
        return false;
    };
    match MutterDisplayConfig::new(&conn).await {
        Ok(proxy) => proxy.get_current_state().await.is_ok(),
        Err(_) => false,
    }
}
