//! Read-status, category, search and date-range filtering.

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::domain::{Notification, NotificationType};
use crate::provider::NotificationContext;

/// Filter criteria. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterCriteria {
    pub read: Option<bool>,
    #[serde(rename = "type")]
    pub kind: Option<NotificationType>,
    /// Case-insensitive substring of the title or the message.
    pub search: Option<String>,
    /// Inclusive lower bound.
    pub from_date: Option<DateTime<Utc>>,
    /// The whole day following this instant is still included.
    pub to_date: Option<DateTime<Utc>>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, notification: &Notification) -> bool {
        if self.read.is_some_and(|read| notification.read != read) {
            return false;
        }

        if self.kind.is_some_and(|kind| notification.kind != kind) {
            return false;
        }

        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            if !notification.title.to_lowercase().contains(&needle)
                && !notification.message.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        if self.from_date.is_some_and(|from| notification.timestamp < from) {
            return false;
        }

        // An end bound within a day of the representable maximum is unbounded.
        if let Some(end) = self
            .to_date
            .and_then(|to| to.checked_add_signed(Duration::days(1)))
            && notification.timestamp > end
        {
            return false;
        }

        true
    }
}

/// Entries of `notifications` matching `criteria`, in their original order.
pub fn filter_notifications(
    notifications: &[Notification],
    criteria: &FilterCriteria,
) -> Vec<Notification> {
    notifications
        .iter()
        .filter(|n| criteria.matches(n))
        .cloned()
        .collect()
}

/// Number of notifications per category, in first-seen order.
pub fn counts_by_type(notifications: &[Notification]) -> IndexMap<NotificationType, usize> {
    let mut counts = IndexMap::new();
    for notification in notifications {
        *counts.entry(notification.kind).or_insert(0) += 1;
    }
    counts
}

/// Everything the filter view derives from one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView {
    pub filters: FilterCriteria,
    pub filtered_notifications: Vec<Notification>,
    pub counts_by_type: IndexMap<NotificationType, usize>,
    pub total_count: usize,
    pub filtered_count: usize,
    pub unread_count: usize,
}

/// Filter state over a provider's list.
#[derive(Debug, Clone)]
pub struct NotificationFilters {
    context: NotificationContext,
    filters: FilterCriteria,
}

impl NotificationFilters {
    pub fn new(context: NotificationContext) -> Self {
        Self {
            context,
            filters: FilterCriteria::default(),
        }
    }

    pub fn filters(&self) -> &FilterCriteria {
        &self.filters
    }

    pub fn filter_by_read_status(&mut self, read: Option<bool>) {
        self.filters.read = read;
    }

    pub fn filter_by_type(&mut self, kind: Option<NotificationType>) {
        self.filters.kind = kind;
    }

    pub fn filter_by_search(&mut self, search: Option<String>) {
        self.filters.search = search;
    }

    pub fn filter_by_date_range(
        &mut self,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) {
        self.filters.from_date = from_date;
        self.filters.to_date = to_date;
    }

    pub fn reset_filters(&mut self) {
        self.filters = FilterCriteria::default();
    }

    /// Recompute the view from the provider's current list.
    pub fn view(&self) -> Result<FilteredView> {
        let notifications = self.context.store()?.notifications();
        let filtered_notifications = filter_notifications(&notifications, &self.filters);

        Ok(FilteredView {
            filters: self.filters.clone(),
            counts_by_type: counts_by_type(&notifications),
            total_count: notifications.len(),
            filtered_count: filtered_notifications.len(),
            unread_count: notifications.iter().filter(|n| n.is_unread()).count(),
            filtered_notifications,
        })
    }

    pub fn filtered_notifications(&self) -> Result<Vec<Notification>> {
        Ok(self.view()?.filtered_notifications)
    }
}
