mod cli;
mod http;

use clap::Parser;
use notification_center::hooks::{NotificationPoller, NotificationStorage};
use notification_center::logging::init_logging;
use notification_center::storage::resolve_backend;
use notification_center::{NotificationCenterConfig, NotificationProvider, ProviderConfig};
use tracing::{error, info, warn};

use crate::cli::Args;
use crate::http::HttpFetcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = NotificationCenterConfig::from_env()?;
    args.apply(&mut config);

    let _logging = init_logging(&config.log_filter, args.log_dir.as_deref())?;
    info!(url = %args.url, "Starting notify-watch");

    let mut provider = NotificationProvider::mount(
        ProviderConfig::new()
            .with_fetcher(HttpFetcher::new(&args.url)?)
            .with_fetch_options(config.fetch.clone()),
    );

    let backend = resolve_backend(&config.storage);
    let _storage = NotificationStorage::attach(provider.context(), &config.storage, backend)?;

    let poller = NotificationPoller::new(provider.context(), config.polling.clone())
        .with_on_error(|e| error!(error = %e, "Notification refresh failed"));
    // The mount already started the first fetch.
    provider.ready().await;
    if config.polling.enabled {
        poller.start_polling_deferred()?;
    }

    let mut rx = provider.store().subscribe();
    let mut last_unread = rx.borrow_and_update().unread_count;
    let mut last_error: Option<String> = None;
    info!(unread = last_unread, "Watching notifications");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                if state.error != last_error {
                    if let Some(e) = &state.error {
                        warn!(error = %e, "Notification feed unavailable");
                    }
                    last_error = state.error;
                }
                if state.unread_count != last_unread {
                    info!(
                        unread = state.unread_count,
                        total = state.notifications.len(),
                        "Unread notifications changed"
                    );
                    last_unread = state.unread_count;
                }
            }
        }
    }

    poller.stop_polling();
    provider.unmount();
    Ok(())
}
