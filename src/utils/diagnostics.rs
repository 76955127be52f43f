//! System Diagnostics
//!
//! Startup logging of the host and the desktop session, so that a failing
//! DisplayConfig call can be told apart from "not on GNOME at all".

use sysinfo::System;
use tracing::{info, warn};

/// System information for diagnostics
#[derive(Debug, Clone)]
pub struct SystemInfo {
    /// Operating system name (e.g., "Fedora Linux")
    pub os_name: String,
    /// Operating system version string
    pub os_version: String,

    /// Kernel version string
    pub kernel_version: String,

    /// System hostname
    pub hostname: String,
}

impl SystemInfo {
    /// Gather system information
    pub fn gather() -> Self {
        Self {
            os_name: System::name().unwrap_or_else(|| "Unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "Unknown".to_string()),
            kernel_version: System::kernel_version().unwrap_or_else(|| "Unknown".to_string()),
            hostname: System::host_name().unwrap_or_else(|| "Unknown".to_string()),
        }
    }

    /// Log system information
    pub fn log(&self) {
        info!("=== System Information ===");
        info!("  OS: {} {}", self.os_name, self.os_version);
        info!("  Kernel: {}", self.kernel_version);
        info!("  Hostname: {}", self.hostname);
    }
}

/// Desktop session as advertised by the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopSession {
    /// `XDG_CURRENT_DESKTOP`, e.g. "GNOME" or "ubuntu:GNOME"
    pub current_desktop: Option<String>,
    /// `XDG_SESSION_TYPE`, "wayland" or "x11"
    pub session_type: Option<String>,
}

impl DesktopSession {
    /// Read the session from the process environment
    pub fn detect() -> Self {
        Self {
            current_desktop: std::env::var("XDG_CURRENT_DESKTOP").ok(),
            session_type: std::env::var("XDG_SESSION_TYPE").ok(),
        }
    }

    /// Whether Mutter is likely the compositor
    pub fn is_gnome(&self) -> bool {
        self.current_desktop
            .as_deref()
            .map(|desktop| {
                desktop
                    .split(':')
                    .any(|d| d.eq_ignore_ascii_case("GNOME") || d.eq_ignore_ascii_case("GNOME-Classic"))
            })
            .unwrap_or(false)
    }
}

/// Log complete diagnostics on startup
pub fn log_startup_diagnostics() {
    info!("=== Startup Diagnostics ===");
    info!("  Version: {}", env!("CARGO_PKG_VERSION"));

    SystemInfo::gather().log();

    let session = DesktopSession::detect();
    info!("=== Desktop Session ===");
    info!(
        "  Desktop: {}",
        session.current_desktop.as_deref().unwrap_or("Unknown")
    );
    info!(
        "  Session type: {}",
        session.session_type.as_deref().unwrap_or("Unknown")
    );

    if !session.is_gnome() {
        warn!("Not a GNOME session: org.gnome.Mutter.DisplayConfig is probably unavailable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(desktop: Option<&str>) -> DesktopSession {
        DesktopSession {
            current_desktop: desktop.map(str::to_string),
            session_type: Some("wayland".to_string()),
        }
    }

    #[test]
    fn test_gnome_detection() {
        assert!(session(Some("GNOME")).is_gnome());
        assert!(session(Some("ubuntu:GNOME")).is_gnome());
        assert!(session(Some("GNOME-Classic:GNOME")).is_gnome());
        assert!(!session(Some("KDE")).is_gnome());
        assert!(!session(None).is_gnome());
    }

    #[test]
    fn test_system_info_gather() {
        let info = SystemInfo::gather();
        assert!(!info.os_name.is_empty());
    }
}
