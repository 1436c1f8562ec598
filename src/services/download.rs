use crate::error::{ClientError, ClientResult};
use crate::services::storage::StorageService;
use crate::services::tracker::SessionTracker;
use crate::utils::validation::ValidationError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub struct DownloadService {
    storage: Arc<dyn StorageService>,
    tracker: Arc<SessionTracker>,
    link_expiry: Duration,
}

impl DownloadService {
    pub fn new(
        storage: Arc<dyn StorageService>,
        tracker: Arc<SessionTracker>,
        link_expiry: Duration,
    ) -> Self {
        Self {
            storage,
            tracker,
            link_expiry,
        }
    }

    /// Signed link for `key`. Handing out the link completes the session.
    pub async fn download_link(&self, key: &str) -> ClientResult<String> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ValidationError {
                code: "NO_FILE_SELECTED",
                message: "Please select a file to download!".to_string(),
            }
            .into());
        }

        let url = self
            .storage
            .generate_presigned_url(key, self.link_expiry)
            .await
            .map_err(|e| ClientError::DownloadLink(e.to_string()))?;

        self.tracker.clear_session().await;
        tracing::info!("🔗 Download link ready for {}", key);
        Ok(url)
    }

    /// Fetches `key` through a signed link and writes it to `destination`.
    pub async fn download_to(
        &self,
        http: &reqwest::Client,
        key: &str,
        destination: &Path,
    ) -> ClientResult<u64> {
        let url = self.download_link(key).await?;

        let bytes = http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        tokio::fs::write(destination, &bytes).await?;
        tracing::info!("💾 Saved {} to {}", key, destination.display());
        Ok(bytes.len() as u64)
    }
}
