//! Notification state store: snapshot, actions and the reducer.

pub mod action;
pub mod reducer;
pub mod state;

pub use action::NotificationAction;
pub use reducer::{reduce, reduce_now};
pub use state::{InitialState, NotificationState};
