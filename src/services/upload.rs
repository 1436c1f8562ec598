use crate::error::{ClientError, ClientResult};
use crate::services::storage::StorageService;
use crate::services::tracker::SessionTracker;
use crate::utils::validation;
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub key: String,
    pub size: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// Admission check consulted after local validation and before the put,
/// e.g. the quota service.
#[async_trait]
pub trait UploadGate: Send + Sync {
    async fn admit(&self, key: &str) -> ClientResult<()>;

    /// Called once the bucket accepted the file.
    async fn record(&self, key: &str);
}

pub struct UploadService {
    storage: Arc<dyn StorageService>,
    tracker: Arc<SessionTracker>,
    max_upload_size: usize,
}

impl UploadService {
    pub fn new(
        storage: Arc<dyn StorageService>,
        tracker: Arc<SessionTracker>,
        max_upload_size: usize,
    ) -> Self {
        Self {
            storage,
            tracker,
            max_upload_size,
        }
    }

    /// Validates, puts the object under its bare file name and starts a new
    /// session. Nothing is tracked unless the bucket accepted the file.
    pub async fn upload_bytes(&self, filename: &str, data: Vec<u8>) -> ClientResult<UploadReceipt> {
        self.upload_bytes_gated(filename, data, None).await
    }

    pub async fn upload_bytes_gated(
        &self,
        filename: &str,
        data: Vec<u8>,
        gate: Option<&dyn UploadGate>,
    ) -> ClientResult<UploadReceipt> {
        let key =
            validation::validate_upload(filename, data.len() as u64, self.max_upload_size)?;
        let size = data.len();

        if let Some(gate) = gate {
            gate.admit(&key).await?;
        }

        // Object stores report whole-second modification times, so the
        // session starts at the second the put was issued in.
        let uploaded_at = Utc::now().trunc_subsecs(0);

        tracing::info!("📤 Uploading {} ({} bytes)", key, size);
        self.storage
            .upload_file(&key, data)
            .await
            .map_err(|e| ClientError::Upload(e.to_string()))?;

        self.tracker.start_session(key.clone(), uploaded_at).await;
        tracing::info!("✅ Upload successful, processing started for {}", key);

        if let Some(gate) = gate {
            gate.record(&key).await;
        }

        Ok(UploadReceipt {
            key,
            size,
            uploaded_at,
        })
    }

    pub async fn upload_path(&self, path: &Path) -> ClientResult<UploadReceipt> {
        self.upload_path_gated(path, None).await
    }

    /// Rejects by name and size before reading the file or asking the gate.
    pub async fn upload_path_gated(
        &self,
        path: &Path,
        gate: Option<&dyn UploadGate>,
    ) -> ClientResult<UploadReceipt> {
        let filename = validation::utf8_path(path)?;

        let key = validation::upload_key_for(filename)?;
        validation::validate_extension(&key)?;
        let metadata = tokio::fs::metadata(path).await?;
        validation::validate_file_size(metadata.len(), self.max_upload_size)?;

        let data = tokio::fs::read(path).await?;
        self.upload_bytes_gated(filename, data, gate).await
    }
}
