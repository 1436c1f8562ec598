use crate::error::{ClientError, ClientResult};
use crate::models::{CounterType, QuotaStatus};
use crate::services::upload::UploadGate;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
enum QuotaRequest<'a> {
    #[serde(rename = "checkStatus")]
    CheckStatus {
        email: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        provider_user_id: Option<&'a str>,
    },
    #[serde(rename = "incrementCounter")]
    IncrementCounter {
        email: &'a str,
        #[serde(rename = "counterType")]
        counter_type: CounterType,
    },
}

/// Client for the usage-quota service that gates uploads and chat queries.
pub struct QuotaClient {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl QuotaClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            token,
        }
    }

    async fn send(&self, request: &QuotaRequest<'_>) -> ClientResult<QuotaStatus> {
        let mut builder = self.http.post(&self.endpoint).json(request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Quota(format!(
                "status service returned {}",
                response.status()
            )));
        }

        response
            .json::<QuotaStatus>()
            .await
            .map_err(|e| ClientError::Quota(format!("unexpected status payload: {}", e)))
    }

    pub async fn check_status(
        &self,
        email: &str,
        provider_user_id: Option<&str>,
    ) -> ClientResult<QuotaStatus> {
        self.send(&QuotaRequest::CheckStatus {
            email,
            provider_user_id: provider_user_id.filter(|id| !id.is_empty() && *id != "undefined"),
        })
        .await
    }

    pub async fn increment_counter(
        &self,
        email: &str,
        counter_type: CounterType,
    ) -> ClientResult<QuotaStatus> {
        self.send(&QuotaRequest::IncrementCounter {
            email,
            counter_type,
        })
        .await
    }
}

/// Upload gate backed by the quota service: `checkStatus` before the put,
/// `incrementCounter` after it.
pub struct QuotaUploadGate {
    client: QuotaClient,
    email: String,
    provider_user_id: Option<String>,
}

impl QuotaUploadGate {
    pub fn new(client: QuotaClient, email: String, provider_user_id: Option<String>) -> Self {
        Self {
            client,
            email,
            provider_user_id,
        }
    }
}

#[async_trait]
impl UploadGate for QuotaUploadGate {
    async fn admit(&self, _key: &str) -> ClientResult<()> {
        let status = self
            .client
            .check_status(&self.email, self.provider_user_id.as_deref())
            .await?;
        ensure_can_upload(&status)
    }

    async fn record(&self, key: &str) {
        match self
            .client
            .increment_counter(&self.email, CounterType::UploadCount)
            .await
        {
            Ok(status) => tracing::info!(
                "Upload {} counted: {}/{} used ({} tier)",
                key,
                status.upload_count,
                status.max_uploads,
                status.tier()
            ),
            Err(e) => tracing::warn!("Could not update upload counter: {}", e),
        }
    }
}

/// Fails when the status says no uploads are left.
pub fn ensure_can_upload(status: &QuotaStatus) -> ClientResult<()> {
    if !status.can_upload() {
        return Err(ClientError::QuotaExceeded {
            tier: status.tier(),
            limit: status.max_uploads,
            kind: "uploads",
        });
    }
    if status.is_last_upload() {
        tracing::warn!("⚠️  This is your last upload. Please subscribe for more access.");
    }
    Ok(())
}

/// Fails when the status says no chat queries are left.
pub fn ensure_can_query(status: &QuotaStatus) -> ClientResult<()> {
    if !status.can_query() {
        return Err(ClientError::QuotaExceeded {
            tier: status.tier(),
            limit: status.max_queries,
            kind: "queries",
        });
    }
    if status.is_last_query() {
        tracing::warn!(
            "⚠️  This is your last query in your {} tier limit of {} queries.",
            status.tier(),
            status.max_queries
        );
    }
    Ok(())
}
