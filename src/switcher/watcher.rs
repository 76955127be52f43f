//! MonitorsChanged Watcher
//!
//! Background task feeding change notifications into a shared
//! [`RefreshSwitcher`], one at a time and in arrival order.

use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{DisplayConfigBackend, Reconciliation, RefreshSwitcher};
use crate::error::Result;

/// Handle to a running watcher
///
/// Dropping the handle stops the task and with it the signal subscription.
#[derive(Debug)]
pub struct WatcherHandle {
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Whether the notification stream or the receiver has gone away
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn a task that refreshes `switcher` for every item of `notifications`
///
/// Each outcome, including fetch errors, is sent on `events`. The task ends
/// when the stream ends or the receiver is dropped.
pub fn spawn_watcher<B>(
    switcher: Arc<Mutex<RefreshSwitcher<B>>>,
    mut notifications: BoxStream<'static, ()>,
    events: mpsc::Sender<Result<Reconciliation>>,
) -> WatcherHandle
where
    B: DisplayConfigBackend + 'static,
{
    let task = tokio::spawn(async move {
        info!("Watching for monitor changes");

        while notifications.next().await.is_some() {
            let outcome = switcher.lock().await.refresh().await;
            if events.send(outcome).await.is_err() {
                debug!("Reconciliation receiver dropped, stopping watcher");
                return;
            }
        }

        debug!("MonitorsChanged stream ended");
    });

    WatcherHandle { task }
}
