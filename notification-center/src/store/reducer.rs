//! Pure state transitions.
//!
//! The reducer never performs I/O; the clock reading is passed in so a
//! transition is a deterministic function of `(state, action, now)`.

use chrono::{DateTime, Utc};

use super::action::NotificationAction;
use super::state::NotificationState;

impl NotificationState {
    /// Apply `action` in place.
    ///
    /// Every transition that touches the list ends with a recount, so the
    /// unread count stays exact even when identifiers are duplicated.
    pub fn apply(&mut self, action: &NotificationAction, now: DateTime<Utc>) {
        match action {
            NotificationAction::FetchRequest => {
                self.is_loading = true;
                self.error = None;
                return;
            }
            NotificationAction::FetchFailure(message) => {
                self.is_loading = false;
                self.error = Some(message.clone());
                return;
            }
            NotificationAction::Unknown => return,
            NotificationAction::FetchSuccess(list) => {
                self.notifications = list.clone();
                self.is_loading = false;
                self.error = None;
            }
            NotificationAction::Add(notification) => {
                self.notifications.insert(0, notification.clone());
            }
            NotificationAction::MarkRead(id) => {
                self.notifications
                    .iter_mut()
                    .filter(|n| n.id == *id)
                    .for_each(|n| n.read = true);
            }
            NotificationAction::MarkAllRead => {
                self.notifications.iter_mut().for_each(|n| n.read = true);
            }
            NotificationAction::Delete(id) => {
                self.notifications.retain(|n| n.id != *id);
            }
            NotificationAction::ClearAll => {
                self.notifications.clear();
            }
        }

        self.recount();
        self.last_updated = Some(now);
    }
}

/// Compute the next state without touching `state`.
pub fn reduce(
    state: &NotificationState,
    action: &NotificationAction,
    now: DateTime<Utc>,
) -> NotificationState {
    let mut next = state.clone();
    next.apply(action, now);
    next
}

/// [`reduce`] stamped with the current wall clock.
pub fn reduce_now(state: &NotificationState, action: &NotificationAction) -> NotificationState {
    reduce(state, action, Utc::now())
}
