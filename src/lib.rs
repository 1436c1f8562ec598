pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::ClientConfig;
use crate::services::download::DownloadService;
use crate::services::poller::BucketPoller;
use crate::services::storage::StorageService;
use crate::services::tracker::SessionTracker;
use crate::services::upload::UploadService;
use std::sync::Arc;

/// Shared handles for one upload/result cycle.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageService>,
    pub tracker: Arc<SessionTracker>,
    pub config: ClientConfig,
}

impl AppState {
    pub fn new(storage: Arc<dyn StorageService>, config: ClientConfig) -> Self {
        let tracker = Arc::new(SessionTracker::new(config.default_result_extension.clone()));
        Self {
            storage,
            tracker,
            config,
        }
    }

    pub fn upload_service(&self) -> UploadService {
        UploadService::new(
            self.storage.clone(),
            self.tracker.clone(),
            self.config.max_upload_size,
        )
    }

    pub fn download_service(&self) -> DownloadService {
        DownloadService::new(
            self.storage.clone(),
            self.tracker.clone(),
            self.config.presign_expiry,
        )
    }

    pub fn poller(&self) -> Arc<BucketPoller> {
        Arc::new(BucketPoller::new(self.storage.clone(), self.tracker.clone()))
    }
}
