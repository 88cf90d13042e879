//! Mirrors the notification list into a [`StorageBackend`].
//!
//! On attach the stored list is replayed into the store through
//! `add_notification`. The replay is additive: entries already in memory are
//! kept, so restoring on top of a fetched list can produce duplicates.
//! Afterwards every change of the list rewrites the whole entry. Storage is
//! best-effort: backend and parse failures are logged, never returned.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Result;
use crate::domain::Notification;
use crate::provider::{NotificationContext, NotificationStore};
use crate::storage::{StorageBackend, StorageOptions};

/// Persistence hook bound to a provider.
pub struct NotificationStorage {
    context: NotificationContext,
    backend: Arc<dyn StorageBackend>,
    storage_key: String,
    token: CancellationToken,
}

impl NotificationStorage {
    /// Restore the stored list, then keep the entry in sync with the store.
    pub fn attach(
        context: NotificationContext,
        options: &StorageOptions,
        backend: Arc<dyn StorageBackend>,
    ) -> Result<Self> {
        let store = context.store()?;
        let storage_key = options.storage_key.clone();

        restore(&store, backend.as_ref(), &storage_key);

        let mut rx = store.subscribe();
        let mut last_written = {
            let state = rx.borrow_and_update();
            persist(backend.as_ref(), &storage_key, &state.notifications)
        };

        let token = store.shutdown_token().child_token();
        let watch_token = token.clone();
        let watch_backend = backend.clone();
        let watch_key = storage_key.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = watch_token.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let serialized = {
                            let state = rx.borrow_and_update();
                            serialize(&state.notifications)
                        };
                        let Some(serialized) = serialized else { continue };
                        if last_written.as_deref() == Some(serialized.as_str()) {
                            continue;
                        }
                        if write(watch_backend.as_ref(), &watch_key, &serialized) {
                            last_written = Some(serialized);
                        }
                    }
                }
            }
            debug!(key = %watch_key, "Notification storage watcher stopped");
        });

        Ok(Self {
            context,
            backend,
            storage_key,
            token,
        })
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn add_notification(&self, notification: Notification) -> Result<()> {
        self.context.store()?.add_notification(notification);
        Ok(())
    }

    pub async fn mark_as_read(&self, id: &str) -> Result<()> {
        self.context.store()?.mark_as_read(id).await
    }

    pub async fn mark_all_as_read(&self) -> Result<()> {
        self.context.store()?.mark_all_as_read().await
    }

    pub async fn delete_notification(&self, id: &str) -> Result<()> {
        self.context.store()?.delete_notification(id).await
    }

    pub fn clear_all_notifications(&self) -> Result<()> {
        self.context.store()?.clear_all_notifications();
        Ok(())
    }

    /// Remove the persisted entry. The in-memory list is not touched.
    pub fn clear_storage(&self) {
        match self.backend.remove_item(&self.storage_key) {
            Ok(()) => debug!(key = %self.storage_key, "Cleared notification storage"),
            Err(e) => warn!(key = %self.storage_key, error = %e, "Failed to clear notification storage"),
        }
    }

    /// Stop mirroring changes.
    pub fn detach(self) {
        drop(self);
    }
}

impl Drop for NotificationStorage {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Replay the stored list front to back through `add_notification`.
///
/// Each entry is prepended, so the restored block ends up in reverse stored order.
fn restore(store: &NotificationStore, backend: &dyn StorageBackend, key: &str) {
    let raw = match backend.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key = %key, "No stored notifications");
            return;
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Error loading notifications from storage");
            return;
        }
    };

    match serde_json::from_str::<Vec<Notification>>(&raw) {
        Ok(notifications) => {
            let count = notifications.len();
            for notification in notifications {
                store.add_notification(notification);
            }
            info!(key = %key, count, "Restored notifications from storage");
        }
        Err(e) => {
            warn!(
                key = %key,
                raw_len = raw.len(),
                error = %e,
                "Stored notifications are not valid JSON, ignoring"
            );
        }
    }
}

fn serialize(notifications: &[Notification]) -> Option<String> {
    serde_json::to_string(notifications)
        .inspect_err(|e| warn!(error = %e, "Failed to serialize notifications"))
        .ok()
}

fn write(backend: &dyn StorageBackend, key: &str, serialized: &str) -> bool {
    match backend.set_item(key, serialized) {
        Ok(()) => true,
        Err(e) => {
            warn!(key = %key, error = %e, "Error saving notifications to storage");
            false
        }
    }
}

/// Serialize and write, returning what was written.
fn persist(backend: &dyn StorageBackend, key: &str, notifications: &[Notification]) -> Option<String> {
    let serialized = serialize(notifications)?;
    write(backend, key, &serialized).then_some(serialized)
}
