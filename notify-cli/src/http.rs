use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use notification_center::{Error, Notification, NotificationFetcher, Result};
use tracing::debug;

/// Install the process-wide rustls crypto provider once.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Fetches the notification list with `GET <url>`.
pub struct HttpFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpFetcher {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        install_rustls_provider();

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Other(format!("Failed to build reqwest client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotificationFetcher for HttpFetcher {
    async fn fetch(&self) -> Result<Vec<Notification>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::fetch(format!("GET {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(format!(
                "Failed to fetch notifications: {}",
                status
            )));
        }

        response
            .json::<Vec<Notification>>()
            .await
            .map_err(|e| Error::fetch(format!("Invalid notification payload: {}", e)))
    }
}
