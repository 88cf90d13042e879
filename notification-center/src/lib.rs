//! Client-side notification state management.
//!
//! A [`NotificationProvider`] owns a reducer-driven store. Collaborators such
//! as the poller, the storage hook and the derived views reach the store
//! through a [`NotificationContext`], which stops working once the provider
//! is unmounted.

pub mod config;
pub mod domain;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod provider;
pub mod retry;
pub mod storage;
pub mod store;
pub mod utils;
pub mod views;

pub use config::NotificationCenterConfig;
pub use domain::{Notification, NotificationType};
pub use error::{Error, Result};
pub use provider::{
    NotificationContext, NotificationFetcher, NotificationProvider, NotificationRemote,
    NotificationStore, ProviderConfig, fetch_fn,
};
pub use retry::{FetchOptions, fetch_with_retry};
pub use store::{InitialState, NotificationAction, NotificationState};
