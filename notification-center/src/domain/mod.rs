//! Domain types.

pub mod notification;

pub use notification::{Notification, NotificationType};
