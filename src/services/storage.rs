use crate::models::StoredObject;
use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Every object in the bucket, across all listing pages.
    async fn list_objects(&self) -> Result<Vec<StoredObject>>;
    async fn upload_file(&self, key: &str, data: Vec<u8>) -> Result<()>;
    async fn generate_presigned_url(&self, key: &str, expires_in: Duration) -> Result<String>;
}

pub struct S3StorageService {
    client: Client,
    bucket: String,
}

impl S3StorageService {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn list_objects(&self) -> Result<Vec<StoredObject>> {
        let mut objects = Vec::new();
        let mut continuation_token = None;

        loop {
            let res = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation_token)
                .send()
                .await?;

            if let Some(contents) = res.contents {
                for object in contents {
                    let (Some(key), Some(modified)) = (object.key, object.last_modified) else {
                        continue;
                    };
                    let Some(last_modified) =
                        DateTime::<Utc>::from_timestamp(modified.secs(), modified.subsec_nanos())
                    else {
                        tracing::warn!("Skipping {} with out-of-range timestamp", key);
                        continue;
                    };
                    objects.push(StoredObject { key, last_modified });
                }
            }

            if res.is_truncated.unwrap_or(false) {
                continuation_token = res.next_continuation_token;
            } else {
                break;
            }
        }

        tracing::debug!("Listed {} objects in {}", objects.len(), self.bucket);
        Ok(objects)
    }

    async fn upload_file(&self, key: &str, data: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await?;
        Ok(())
    }

    async fn generate_presigned_url(&self, key: &str, expires_in: Duration) -> Result<String> {
        let presigned_config = PresigningConfig::expires_in(expires_in)?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigned_config)
            .await?;

        Ok(presigned.uri().to_string())
    }
}
