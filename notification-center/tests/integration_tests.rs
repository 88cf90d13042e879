//! End-to-end tests wiring a provider together with its hooks.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use notification_center::hooks::{NotificationPoller, NotificationStorage, PollingOptions};
use notification_center::storage::{FileStorage, MemoryStorage, StorageBackend, StorageOptions};
use notification_center::views::{FilterCriteria, NotificationFilters};
use notification_center::{
    Error, FetchOptions, Notification, NotificationProvider, NotificationType, ProviderConfig,
    fetch_fn,
};

fn note(id: &str, read: bool) -> Notification {
    Notification::new(format!("title {id}"), format!("message {id}"))
        .with_id(id)
        .with_read(read)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

fn stored_ids(backend: &dyn StorageBackend, key: &str) -> Vec<String> {
    let raw = backend.get_item(key).unwrap().unwrap_or_default();
    let list: Vec<Notification> = serde_json::from_str(&raw).unwrap();
    list.into_iter().map(|n| n.id).collect()
}

mod provider_tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_fetch_populates_store() {
        let mut provider = NotificationProvider::mount(ProviderConfig::new().with_fetcher(
            fetch_fn(|| async { Ok::<_, Error>(vec![note("1", false), note("2", true)]) }),
        ));
        provider.ready().await;

        let store = provider.store();
        assert_eq!(store.notifications().len(), 2);
        assert_eq!(store.unread_count(), 1);
        assert!(!store.is_loading());
        assert!(store.error().is_none());
        assert!(store.last_updated().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flaky_fetcher_recovers_within_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let mut provider = NotificationProvider::mount(
            ProviderConfig::new()
                .with_fetch_options(FetchOptions {
                    retry_count: 2,
                    retry_delay_ms: 10,
                    timeout_ms: Some(1000),
                })
                .with_fetcher(fetch_fn(move || {
                    let attempt = counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt < 2 {
                            Err(Error::fetch("flaky"))
                        } else {
                            Ok(vec![note("1", false)])
                        }
                    }
                })),
        );
        provider.ready().await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(provider.store().unread_count(), 1);
        assert!(provider.store().error().is_none());
    }

    #[tokio::test]
    async fn test_context_outlives_provider_safely() {
        let provider = NotificationProvider::mount(ProviderConfig::new());
        let context = provider.context();
        let filters = NotificationFilters::new(context.clone());
        assert!(filters.view().is_ok());

        provider.unmount();
        assert!(matches!(context.store(), Err(Error::Configuration(_))));
        assert!(matches!(filters.view(), Err(Error::Configuration(_))));
        assert!(matches!(
            NotificationPoller::spawn(context, PollingOptions::default()),
            Err(Error::Configuration(_))
        ));
    }
}

mod storage_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_file_storage_survives_remount() {
        let dir = tempfile::tempdir().unwrap();
        let options = StorageOptions {
            storage_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        {
            let provider = NotificationProvider::mount(ProviderConfig::new());
            let backend = notification_center::storage::resolve_backend(&options);
            let storage =
                NotificationStorage::attach(provider.context(), &options, backend).unwrap();
            storage.add_notification(note("a", false)).unwrap();
            storage.add_notification(note("b", false)).unwrap();
            storage.mark_as_read("a").await.unwrap();
            settle().await;
        }

        let provider = NotificationProvider::mount(ProviderConfig::new());
        let backend: Arc<dyn StorageBackend> = Arc::new(FileStorage::new(dir.path()));
        let _storage = NotificationStorage::attach(provider.context(), &options, backend).unwrap();

        let store = provider.store();
        let ids: Vec<String> = store.notifications().into_iter().map(|n| n.id).collect();
        // stored as [b, a]; each replayed entry is prepended
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(store.unread_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_key_last_write_wins() {
        let backend = Arc::new(MemoryStorage::new());
        let options = StorageOptions::default();

        let first = NotificationProvider::mount(ProviderConfig::new());
        let second = NotificationProvider::mount(ProviderConfig::new());
        let _s1 =
            NotificationStorage::attach(first.context(), &options, backend.clone()).unwrap();
        let _s2 =
            NotificationStorage::attach(second.context(), &options, backend.clone()).unwrap();

        first.store().add_notification(note("from-first", false));
        settle().await;
        assert_eq!(
            stored_ids(backend.as_ref(), &options.storage_key),
            vec!["from-first"]
        );

        second.store().add_notification(note("from-second", false));
        settle().await;
        assert_eq!(
            stored_ids(backend.as_ref(), &options.storage_key),
            vec!["from-second"]
        );
    }
}

mod polling_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_polling_feeds_storage_and_views() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let provider = NotificationProvider::mount(ProviderConfig::new().with_fetcher(
            fetch_fn(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    let mut list = vec![note("base", true)];
                    if n >= 2 {
                        list.insert(
                            0,
                            note("alert", false).with_kind(NotificationType::Error),
                        );
                    }
                    Ok::<_, Error>(list)
                }
            }),
        ));

        let backend = Arc::new(MemoryStorage::new());
        let options = StorageOptions::default();
        let _storage =
            NotificationStorage::attach(provider.context(), &options, backend.clone()).unwrap();

        let poller = NotificationPoller::spawn(
            provider.context(),
            PollingOptions {
                interval_ms: 100,
                ..Default::default()
            },
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(provider.store().unread_count(), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        poller.stop_polling();
        settle().await;

        assert_eq!(provider.store().unread_count(), 1);
        assert_eq!(
            stored_ids(backend.as_ref(), &options.storage_key),
            vec!["alert", "base"]
        );

        let mut filters = NotificationFilters::new(provider.context());
        filters.filter_by_type(Some(NotificationType::Error));
        let view = filters.view().unwrap();
        assert_eq!(view.filtered_count, 1);
        assert_eq!(view.total_count, 2);
        assert_eq!(view.filters, FilterCriteria {
            kind: Some(NotificationType::Error),
            ..Default::default()
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_stops_everything() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let provider = NotificationProvider::mount(ProviderConfig::new().with_fetcher(
            fetch_fn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, Error>(Vec::new()) }
            }),
        ));
        let context = provider.context();
        let poller = NotificationPoller::spawn(
            context.clone(),
            PollingOptions {
                interval_ms: 50,
                ..Default::default()
            },
        )
        .unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        let before = calls.load(Ordering::SeqCst);

        drop(provider);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), before);
        assert!(!poller.is_polling());
    }
}
