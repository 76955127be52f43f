//! Refresh Switcher
//!
//! Owns the live [`MonitorsState`](crate::display::MonitorsState), turns user
//! selections into `ApplyMonitorsConfig` calls and reconciles the state with
//! `MonitorsChanged` notifications.
//!
//! The transport sits behind [`DisplayConfigBackend`] so the engine can be
//! driven without a compositor.

mod engine;
mod watcher;

pub use engine::{Reconciliation, RefreshSwitcher};
pub use watcher::{spawn_watcher, WatcherHandle};

use async_trait::async_trait;

use crate::display::{ApplyRequest, MonitorsState};
use crate::error::Result;

/// Access to a compositor's display configuration
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DisplayConfigBackend: Send + Sync {
    /// Fetch and decode the current state
    async fn get_current_state(&self) -> Result<MonitorsState>;

    /// Send a complete configuration built from a state snapshot
    async fn apply_monitors_config(&self, request: &ApplyRequest) -> Result<()>;
}
