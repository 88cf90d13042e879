//! The closed set of store actions.

use serde::{Deserialize, Serialize};

use crate::domain::Notification;

/// A state transition request.
///
/// Serialized as `{"type": "...", "payload": ...}`. Tags this version does not
/// know deserialize to [`NotificationAction::Unknown`], which the reducer
/// treats as the identity transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationAction {
    #[serde(rename = "FETCH_NOTIFICATIONS_REQUEST")]
    FetchRequest,
    #[serde(rename = "FETCH_NOTIFICATIONS_SUCCESS")]
    FetchSuccess(Vec<Notification>),
    #[serde(rename = "FETCH_NOTIFICATIONS_FAILURE")]
    FetchFailure(String),
    #[serde(rename = "ADD_NOTIFICATION")]
    Add(Notification),
    #[serde(rename = "MARK_AS_READ")]
    MarkRead(String),
    #[serde(rename = "MARK_ALL_AS_READ")]
    MarkAllRead,
    #[serde(rename = "DELETE_NOTIFICATION")]
    Delete(String),
    #[serde(rename = "CLEAR_ALL_NOTIFICATIONS")]
    ClearAll,
    #[serde(other)]
    Unknown,
}

impl NotificationAction {
    /// Wire tag of this action.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchRequest => "FETCH_NOTIFICATIONS_REQUEST",
            Self::FetchSuccess(_) => "FETCH_NOTIFICATIONS_SUCCESS",
            Self::FetchFailure(_) => "FETCH_NOTIFICATIONS_FAILURE",
            Self::Add(_) => "ADD_NOTIFICATION",
            Self::MarkRead(_) => "MARK_AS_READ",
            Self::MarkAllRead => "MARK_ALL_AS_READ",
            Self::Delete(_) => "DELETE_NOTIFICATION",
            Self::ClearAll => "CLEAR_ALL_NOTIFICATIONS",
            Self::Unknown => "UNKNOWN",
        }
    }
}
