//! Date and category groupings.

use std::sync::Arc;

use chrono::{Local, TimeZone};
use indexmap::IndexMap;

use crate::Result;
use crate::domain::{Notification, NotificationType};
use crate::provider::NotificationContext;

/// Groups keyed by label, in first-seen order.
pub type Groups = IndexMap<String, Vec<Notification>>;

/// A pluggable grouping strategy.
pub type GroupingFn = Arc<dyn Fn(&[Notification]) -> Groups + Send + Sync>;

/// Group by local calendar day, keyed like `"Mon Oct 19 2026"`.
pub fn group_by_date(notifications: &[Notification]) -> Groups {
    group_by_date_in(notifications, &Local)
}

/// Group by calendar day in `tz`.
pub fn group_by_date_in<Tz: TimeZone>(notifications: &[Notification], tz: &Tz) -> Groups
where
    Tz::Offset: std::fmt::Display,
{
    let mut groups = Groups::new();
    for notification in notifications {
        let key = notification
            .timestamp
            .with_timezone(tz)
            .format("%a %b %d %Y")
            .to_string();
        groups.entry(key).or_default().push(notification.clone());
    }
    groups
}

pub fn group_by_type(notifications: &[Notification]) -> IndexMap<NotificationType, Vec<Notification>> {
    let mut groups: IndexMap<NotificationType, Vec<Notification>> = IndexMap::new();
    for notification in notifications {
        groups
            .entry(notification.kind)
            .or_default()
            .push(notification.clone());
    }
    groups
}

/// Groupings computed from one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedView {
    pub grouped: Groups,
    pub grouped_by_type: IndexMap<NotificationType, Vec<Notification>>,
}

impl GroupedView {
    /// Group labels in display order.
    pub fn groups(&self) -> Vec<&str> {
        self.grouped.keys().map(String::as_str).collect()
    }

    /// Members of `key`, or an empty slice for an unknown label.
    pub fn notifications_for_group(&self, key: &str) -> &[Notification] {
        self.grouped.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Grouping view over a provider's list.
#[derive(Clone)]
pub struct NotificationGroups {
    context: NotificationContext,
    grouping: GroupingFn,
}

impl NotificationGroups {
    /// Group by local calendar day.
    pub fn new(context: NotificationContext) -> Self {
        Self::with_grouping(context, Arc::new(|list: &[Notification]| group_by_date(list)))
    }

    pub fn with_grouping(context: NotificationContext, grouping: GroupingFn) -> Self {
        Self { context, grouping }
    }

    pub fn view(&self) -> Result<GroupedView> {
        let notifications = self.context.store()?.notifications();
        Ok(GroupedView {
            grouped: (self.grouping)(&notifications),
            grouped_by_type: group_by_type(&notifications),
        })
    }
}
