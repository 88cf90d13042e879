//! Derived, read-only views over a provider's notification list.

pub mod filters;
pub mod groups;

pub use filters::{
    FilterCriteria, FilteredView, NotificationFilters, counts_by_type, filter_notifications,
};
pub use groups::{
    GroupedView, GroupingFn, Groups, NotificationGroups, group_by_date, group_by_date_in,
    group_by_type,
};
