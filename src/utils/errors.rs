//! User-Friendly Error Formatting
//!
//! Turns errors surfaced by the CLI into messages with troubleshooting hints
//! for the failures users actually run into.

use std::fmt::Write;

use crate::error::SwitchError;

/// Broad kind of failure, used to pick the hints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Session bus or DisplayConfig service unreachable
    DBus,
    /// Mutter refused the configuration, usually a stale serial
    Apply,
    /// Configuration file problems
    Config,
    /// Connector, mode or label not found
    Lookup,
    /// Anything else
    Other,
}

/// Classify an error by its chain
pub fn categorize(error: &anyhow::Error) -> ErrorCategory {
    if let Some(e) = error.chain().find_map(|e| e.downcast_ref::<SwitchError>()) {
        return match e {
            SwitchError::DBus(_) | SwitchError::Decode(_) => ErrorCategory::DBus,
            SwitchError::Apply(_) => ErrorCategory::Apply,
            SwitchError::UnknownMonitor(_)
            | SwitchError::UnknownMode { .. }
            | SwitchError::UnknownSelection { .. }
            | SwitchError::UnknownLabel { .. } => ErrorCategory::Lookup,
            SwitchError::NoModes(_) | SwitchError::NoCurrentMode(_) => ErrorCategory::Other,
        };
    }

    let error_msg = format!("{:#}", error);
    if error_msg.contains("D-Bus") || error_msg.contains("org.freedesktop.DBus") {
        ErrorCategory::DBus
    } else if error_msg.contains("config") {
        ErrorCategory::Config
    } else {
        ErrorCategory::Other
    }
}

/// Format error for user consumption
///
/// Takes technical error and produces user-friendly message with
/// troubleshooting steps and context.
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    writeln!(output).ok();
    writeln!(
        output,
        "╔════════════════════════════════════════════════════════════╗"
    )
    .ok();
    writeln!(
        output,
        "║                     ERROR                                  ║"
    )
    .ok();
    writeln!(
        output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();
    writeln!(output).ok();

    match categorize(error) {
        ErrorCategory::DBus => format_dbus_error(&mut output),
        ErrorCategory::Apply => format_apply_error(&mut output),
        ErrorCategory::Config => format_config_error(&mut output),
        ErrorCategory::Lookup => format_lookup_error(&mut output),
        ErrorCategory::Other => format_generic_error(&mut output, &error.to_string()),
    }

    writeln!(output).ok();
    writeln!(
        output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(output, "Technical Details:").ok();
    writeln!(output).ok();
    writeln!(output, "{:#}", error).ok();
    writeln!(output).ok();
    writeln!(
        output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(
        output,
        "Run with --verbose for detailed logs: refresh-switch -vv list"
    )
    .ok();

    output
}

fn format_dbus_error(output: &mut String) {
    writeln!(output, "Display Configuration Service Error").ok();
    writeln!(output).ok();
    writeln!(
        output,
        "Could not talk to org.gnome.Mutter.DisplayConfig on the session bus."
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Not running inside a GNOME session").ok();
    writeln!(output, "     → Check: echo $XDG_CURRENT_DESKTOP (should contain GNOME)").ok();
    writeln!(output).ok();
    writeln!(output, "  2. No session bus in this environment").ok();
    writeln!(output, "     → Check: echo $DBUS_SESSION_BUS_ADDRESS").ok();
    writeln!(output, "     → Over SSH, export the address of the desktop session").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Service exported under a different name").ok();
    writeln!(output, "     → Check [dbus] destination and path in config.toml").ok();
}

fn format_apply_error(output: &mut String) {
    writeln!(output, "Monitor Configuration Rejected").ok();
    writeln!(output).ok();
    writeln!(output, "Mutter did not accept the new monitor configuration.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. The configuration changed in the meantime (stale serial)").ok();
    writeln!(output, "     → Run the command again").ok();
    writeln!(output).ok();
    writeln!(output, "  2. The mode is not usable with the current layout").ok();
    writeln!(output, "     → Try: refresh-switch set --verify <connector> <rate>").ok();
}

fn format_config_error(output: &mut String) {
    writeln!(output, "Configuration Error").ok();
    writeln!(output).ok();
    writeln!(output, "Problem with configuration file.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Invalid TOML syntax").ok();
    writeln!(output, "     → Check for typos, missing quotes, etc.").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Invalid values").ok();
    writeln!(output, "     → apply.method must be \"temporary\" or \"persistent\"").ok();
    writeln!(output, "     → dbus.path must start with '/'").ok();
}

fn format_lookup_error(output: &mut String) {
    writeln!(output, "Monitor or Mode Not Found").ok();
    writeln!(output).ok();
    writeln!(output, "The requested monitor or refresh rate is not available.").ok();
    writeln!(output).ok();
    writeln!(output, "  → List connectors and rates: refresh-switch list").ok();
    writeln!(output, "  → Monitors with a single mode are hidden unless --all is given").ok();
}

fn format_generic_error(output: &mut String, error: &str) {
    writeln!(output, "Refresh Switch Error").ok();
    writeln!(output).ok();
    writeln!(output, "Error: {}", error).ok();
}
