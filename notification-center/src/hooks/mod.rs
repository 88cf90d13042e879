//! Collaborators attached to a provider through its context.

pub mod polling;
pub mod sound;
pub mod storage;

pub use polling::{ErrorCallback, NotificationPoller, PollingOptions};
pub use sound::{NotificationSound, SoundFilter, SoundOptions, SoundPlayer};
pub use storage::NotificationStorage;
