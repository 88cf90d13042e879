//! Store snapshot types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Notification;

/// Full snapshot of the notification store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationState {
    /// Newest first; additions prepend.
    pub notifications: Vec<Notification>,
    /// Always equal to the number of unread entries in `notifications`.
    pub unread_count: usize,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl NotificationState {
    /// Build a state from a list, deriving the unread count.
    pub fn with_notifications(notifications: Vec<Notification>) -> Self {
        let mut state = Self {
            notifications,
            ..Default::default()
        };
        state.recount();
        state
    }

    /// Recompute `unread_count` from the list.
    pub(crate) fn recount(&mut self) {
        self.unread_count = count_unread(&self.notifications);
    }

    /// Whether `unread_count` agrees with the list.
    pub fn is_consistent(&self) -> bool {
        self.unread_count == count_unread(&self.notifications)
    }

    pub fn find(&self, id: &str) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }
}

pub(crate) fn count_unread(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.read).count()
}

/// Partial override merged over the empty default state at mount.
///
/// The unread count is not overridable; it is derived from `notifications`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InitialState {
    pub notifications: Option<Vec<Notification>>,
    pub is_loading: Option<bool>,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl InitialState {
    pub fn into_state(self) -> NotificationState {
        let mut state = NotificationState::default();
        if let Some(notifications) = self.notifications {
            state.notifications = notifications;
        }
        if let Some(is_loading) = self.is_loading {
            state.is_loading = is_loading;
        }
        state.error = self.error;
        state.last_updated = self.last_updated;
        state.recount();
        state
    }
}
