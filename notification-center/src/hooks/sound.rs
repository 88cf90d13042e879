//! Audible alert when new notifications arrive.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::Notification;
use crate::provider::NotificationContext;
use crate::{Error, Result};

/// Something that can play the alert sound.
#[async_trait]
pub trait SoundPlayer: Send + Sync {
    async fn play(&self) -> Result<()>;
}

/// Decides whether a new notification deserves a sound.
pub type SoundFilter = Arc<dyn Fn(&Notification) -> bool + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundOptions {
    pub enabled: bool,
}

impl Default for SoundOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Plays a sound when notifications with unseen ids show up.
///
/// Entries present at attach time count as seen.
pub struct NotificationSound {
    player: Arc<dyn SoundPlayer>,
    enabled: bool,
    token: CancellationToken,
}

impl NotificationSound {
    pub fn attach(
        context: NotificationContext,
        options: SoundOptions,
        player: Arc<dyn SoundPlayer>,
    ) -> Result<Self> {
        Self::attach_filtered(context, options, player, Arc::new(|_: &Notification| true))
    }

    /// Like [`attach`](Self::attach), but only new notifications accepted by
    /// `should_play` trigger the sound.
    pub fn attach_filtered(
        context: NotificationContext,
        options: SoundOptions,
        player: Arc<dyn SoundPlayer>,
        should_play: SoundFilter,
    ) -> Result<Self> {
        let store = context.store()?;
        let token = store.shutdown_token().child_token();

        if options.enabled {
            let mut rx = store.subscribe();
            let mut seen: HashSet<String> = rx
                .borrow_and_update()
                .notifications
                .iter()
                .map(|n| n.id.clone())
                .collect();

            let watch_token = token.clone();
            let watch_player = player.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        biased;
                        _ = watch_token.cancelled() => break,
                        changed = rx.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            let chime = {
                                let state = rx.borrow_and_update();
                                let chime = state
                                    .notifications
                                    .iter()
                                    .filter(|n| !seen.contains(&n.id))
                                    .any(|n| should_play(n));
                                seen = state.notifications.iter().map(|n| n.id.clone()).collect();
                                chime
                            };
                            if chime && let Err(e) = watch_player.play().await {
                                warn!(error = %e, "Error playing notification sound");
                            }
                        }
                    }
                }
                debug!("Notification sound watcher stopped");
            });
        }

        Ok(Self {
            player,
            enabled: options.enabled,
            token,
        })
    }

    /// Play the sound now.
    pub async fn play(&self) -> Result<()> {
        if !self.enabled {
            return Err(Error::Sound("notification sound is disabled".to_string()));
        }
        self.player.play().await
    }

    pub fn detach(self) {
        drop(self);
    }
}

impl Drop for NotificationSound {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
