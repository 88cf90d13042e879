//! Notification provider: owner of the single store instance.
//!
//! The provider is responsible for:
//! - Holding the state and applying actions in dispatch order
//! - Running the configured fetcher through the retry utility
//! - Forwarding mutations to the remote before applying them locally
//! - Handing out weak [`NotificationContext`] handles to collaborators

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::Notification;
use crate::retry::{FetchOptions, fetch_with_retry};
use crate::store::{InitialState, NotificationAction, NotificationState};
use crate::{Error, Result};

/// Source of the notification list.
#[async_trait]
pub trait NotificationFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Notification>>;
}

/// Remote endpoints acknowledging local mutations.
///
/// Every method defaults to a successful no-op, so an implementation only
/// overrides the endpoints it has.
#[async_trait]
pub trait NotificationRemote: Send + Sync {
    async fn mark_as_read(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn mark_all_as_read(&self) -> Result<()> {
        Ok(())
    }

    async fn delete_notification(&self, _id: &str) -> Result<()> {
        Ok(())
    }
}

/// Adapter turning an async closure into a [`NotificationFetcher`].
pub struct FetchFn<F>(F);

/// Wrap `f` so it can be used as a fetcher.
pub fn fetch_fn<F, Fut>(f: F) -> FetchFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Notification>>> + Send,
{
    FetchFn(f)
}

#[async_trait]
impl<F, Fut> NotificationFetcher for FetchFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Notification>>> + Send,
{
    async fn fetch(&self) -> Result<Vec<Notification>> {
        (self.0)().await
    }
}

/// Construction-time configuration of a provider.
#[derive(Clone, Default)]
pub struct ProviderConfig {
    pub fetcher: Option<Arc<dyn NotificationFetcher>>,
    pub remote: Option<Arc<dyn NotificationRemote>>,
    pub fetch_options: FetchOptions,
    pub initial_state: InitialState,
}

impl ProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetcher(mut self, fetcher: impl NotificationFetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    pub fn with_remote(mut self, remote: impl NotificationRemote + 'static) -> Self {
        self.remote = Some(Arc::new(remote));
        self
    }

    pub fn with_fetch_options(mut self, fetch_options: FetchOptions) -> Self {
        self.fetch_options = fetch_options;
        self
    }

    pub fn with_initial_state(mut self, initial_state: InitialState) -> Self {
        self.initial_state = initial_state;
        self
    }
}

/// The store and its action surface.
pub struct NotificationStore {
    state_tx: watch::Sender<NotificationState>,
    fetcher: Option<Arc<dyn NotificationFetcher>>,
    remote: Option<Arc<dyn NotificationRemote>>,
    fetch_options: FetchOptions,
    mounted: AtomicBool,
    shutdown: CancellationToken,
}

impl NotificationStore {
    fn new(config: ProviderConfig) -> Self {
        let (state_tx, _) = watch::channel(config.initial_state.into_state());
        Self {
            state_tx,
            fetcher: config.fetcher,
            remote: config.remote,
            fetch_options: config.fetch_options,
            mounted: AtomicBool::new(true),
            shutdown: CancellationToken::new(),
        }
    }

    // ========== Queries ==========

    /// Clone of the current snapshot.
    pub fn state(&self) -> NotificationState {
        self.state_tx.borrow().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state_tx.borrow().notifications.clone()
    }

    pub fn unread_count(&self) -> usize {
        self.state_tx.borrow().unread_count
    }

    pub fn is_loading(&self) -> bool {
        self.state_tx.borrow().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.state_tx.borrow().error.clone()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.state_tx.borrow().last_updated
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<NotificationState> {
        self.state_tx.subscribe()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Cancelled when the owning provider unmounts.
    /// Retry settings used by [`refresh_notifications`](Self::refresh_notifications).
    pub fn fetch_options(&self) -> &FetchOptions {
        &self.fetch_options
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    // ========== Actions ==========

    /// Apply `action` to the state.
    pub fn dispatch(&self, action: NotificationAction) {
        let now = Utc::now();
        debug!(action = action.name(), "Dispatching notification action");
        self.state_tx.send_if_modified(|state| {
            if action == NotificationAction::Unknown {
                return false;
            }
            state.apply(&action, now);
            true
        });
    }

    pub fn add_notification(&self, notification: Notification) {
        self.dispatch(NotificationAction::Add(notification));
    }

    pub fn clear_all_notifications(&self) {
        self.dispatch(NotificationAction::ClearAll);
    }

    /// Acknowledge `id` remotely, then mark it read locally.
    ///
    /// A remote failure is returned and the local state is left untouched.
    pub async fn mark_as_read(&self, id: &str) -> Result<()> {
        if let Some(remote) = &self.remote {
            remote.mark_as_read(id).await.inspect_err(|e| {
                warn!(id = %id, error = %e, "Remote mark-as-read failed");
            })?;
        }
        self.dispatch(NotificationAction::MarkRead(id.to_string()));
        Ok(())
    }

    pub async fn mark_all_as_read(&self) -> Result<()> {
        if let Some(remote) = &self.remote {
            remote.mark_all_as_read().await.inspect_err(|e| {
                warn!(error = %e, "Remote mark-all-as-read failed");
            })?;
        }
        self.dispatch(NotificationAction::MarkAllRead);
        Ok(())
    }

    pub async fn delete_notification(&self, id: &str) -> Result<()> {
        if let Some(remote) = &self.remote {
            remote.delete_notification(id).await.inspect_err(|e| {
                warn!(id = %id, error = %e, "Remote delete failed");
            })?;
        }
        self.dispatch(NotificationAction::Delete(id.to_string()));
        Ok(())
    }

    /// Re-fetch the list through the retry utility.
    ///
    /// The failure is recorded in `state.error` and also returned. Without a
    /// configured fetcher this is a no-op.
    pub async fn refresh_notifications(&self) -> Result<()> {
        self.refresh_with(&self.fetch_options).await
    }

    /// Like [`refresh_notifications`](Self::refresh_notifications), with
    /// `options` in place of the provider's own retry settings.
    ///
    /// One call is one `FetchRequest` followed by one retry loop.
    pub async fn refresh_with(&self, options: &FetchOptions) -> Result<()> {
        let Some(fetcher) = self.fetcher.clone() else {
            return Ok(());
        };

        self.dispatch(NotificationAction::FetchRequest);

        match fetch_with_retry(|| fetcher.fetch(), options).await {
            Ok(notifications) => {
                debug!(count = notifications.len(), "Fetched notifications");
                self.dispatch(NotificationAction::FetchSuccess(notifications));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch notifications");
                self.dispatch(NotificationAction::FetchFailure(e.to_string()));
                Err(e)
            }
        }
    }

    fn unmount(&self) {
        if self.mounted.swap(false, Ordering::AcqRel) {
            self.shutdown.cancel();
            info!("Notification provider unmounted");
        }
    }
}

/// Owner of a [`NotificationStore`] for its lifetime.
///
/// Dropping the provider unmounts it.
pub struct NotificationProvider {
    store: Arc<NotificationStore>,
    initial_load: Option<JoinHandle<()>>,
}

impl NotificationProvider {
    /// Create the store and start the initial fetch, if a fetcher is configured.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(config: ProviderConfig) -> Self {
        let store = Arc::new(NotificationStore::new(config));

        let initial_load = store.fetcher.is_some().then(|| {
            let store = store.clone();
            tokio::spawn(async move {
                if let Err(e) = store.refresh_notifications().await {
                    debug!(error = %e, "Initial notification load failed");
                }
            })
        });

        info!(
            fetcher = initial_load.is_some(),
            remote = store.remote.is_some(),
            "Notification provider mounted"
        );

        Self {
            store,
            initial_load,
        }
    }

    /// Wait for the initial fetch started by [`mount`](Self::mount) to settle.
    pub async fn ready(&mut self) {
        if let Some(handle) = self.initial_load.take()
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Initial notification load task failed");
        }
    }

    pub fn store(&self) -> &Arc<NotificationStore> {
        &self.store
    }

    /// A weak handle for collaborators.
    pub fn context(&self) -> NotificationContext {
        NotificationContext {
            store: Arc::downgrade(&self.store),
        }
    }

    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for NotificationProvider {
    fn drop(&mut self) {
        self.store.unmount();
    }
}

/// Weak handle to a provider's store.
///
/// Resolving it outside a mounted provider is a wiring mistake and fails with
/// [`Error::Configuration`].
#[derive(Debug, Clone)]
pub struct NotificationContext {
    store: Weak<NotificationStore>,
}

impl NotificationContext {
    /// A context that is not attached to any provider.
    pub fn detached() -> Self {
        Self { store: Weak::new() }
    }

    pub fn store(&self) -> Result<Arc<NotificationStore>> {
        match self.store.upgrade() {
            Some(store) if store.is_mounted() => Ok(store),
            _ => Err(Error::config(
                "notification context used outside a mounted NotificationProvider",
            )),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.store().is_ok()
    }
}
