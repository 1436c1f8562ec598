use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a bucket listing. Rebuilt on every poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

impl StoredObject {
    pub fn new(key: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            last_modified,
        }
    }
}

/// The tracked correspondence between one upload and its eventual result.
///
/// `Default` is the cleared session. Not persisted across restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSession {
    pub original_filename: Option<String>,
    pub upload_time: Option<DateTime<Utc>>,
    pub processing_started: bool,
    /// Result selected by the previous poll of this session
    pub last_result: Option<String>,
    pub completion_reported: bool,
}

impl UploadSession {
    /// Session for an upload that was just accepted by the bucket.
    pub fn started(filename: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            original_filename: Some(filename.into()),
            upload_time: Some(at),
            processing_started: true,
            last_result: None,
            completion_reported: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.original_filename.is_some()
    }
}

/// Keys shown to the user: original upload first, then the latest result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelatedFileSet(Vec<String>);

impl RelatedFileSet {
    /// Appends `key` unless it is already present.
    pub fn push(&mut self, key: impl Into<String>) {
        let key = key.into();
        if !self.0.contains(&key) {
            self.0.push(key);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| k == key)
    }

    pub fn keys(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcessingStatus {
    /// No upload is being processed
    Idle,
    /// Upload accepted, result not listed yet
    Processing,
    /// Result for the current upload is available
    Complete,
}

/// Everything one poll cycle produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollOutcome {
    pub related: RelatedFileSet,
    pub latest_result: Option<String>,
    pub original_present: bool,
    /// Upload name recovered from a result key when no session was active
    pub inferred_filename: Option<String>,
    /// True only on the cycle where the result first became available
    pub processing_complete: bool,
    pub status: ProcessingStatus,
}

/// Usage counters as returned by the quota service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    #[serde(default)]
    pub query_count: u64,
    #[serde(default)]
    pub max_queries: u64,
    #[serde(default)]
    pub upload_count: u64,
    #[serde(default)]
    pub max_uploads: u64,
    #[serde(default)]
    pub is_subscribed: bool,
    #[serde(default)]
    pub remaining_queries: Option<u64>,
    #[serde(default)]
    pub remaining_uploads: Option<u64>,
}

impl QuotaStatus {
    pub fn tier(&self) -> &'static str {
        if self.is_subscribed { "premium" } else { "free" }
    }

    pub fn can_upload(&self) -> bool {
        self.upload_count < self.max_uploads
    }

    pub fn can_query(&self) -> bool {
        self.query_count < self.max_queries
    }

    /// The next upload uses up the allowance.
    pub fn is_last_upload(&self) -> bool {
        self.max_uploads.checked_sub(1) == Some(self.upload_count)
    }

    pub fn is_last_query(&self) -> bool {
        self.max_queries.checked_sub(1) == Some(self.query_count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CounterType {
    #[serde(rename = "uploadCount")]
    UploadCount,
    #[serde(rename = "queryCount")]
    QueryCount,
}

/// One server estimate from the pricing chatbot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimate {
    #[serde(rename = "InstanceType", default)]
    pub instance_type: String,
    #[serde(rename = "Storage", default)]
    pub storage: String,
    #[serde(rename = "Database", default)]
    pub database: String,
    #[serde(rename = "Monthly Server Cost", default)]
    pub monthly_server_cost: String,
    #[serde(rename = "Monthly Storage Cost", default)]
    pub monthly_storage_cost: String,
    #[serde(rename = "Monthly Database Cost", default)]
    pub monthly_database_cost: String,
    #[serde(rename = "Total Pricing", default)]
    pub total_pricing: String,
}

impl CostEstimate {
    pub fn database_label(&self) -> &str {
        if self.database == "No" {
            "No Database"
        } else {
            &self.database
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    Estimates(Vec<CostEstimate>),
    /// Placeholder shown instead of a malformed reply
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_file_set_dedup() {
        let mut set = RelatedFileSet::default();
        set.push("a.xlsx");
        set.push("Price_a_20240101_120000.csv");
        set.push("a.xlsx");
        assert_eq!(set.keys(), ["a.xlsx", "Price_a_20240101_120000.csv"]);
    }

    #[test]
    fn test_quota_status_wire_format() {
        let status: QuotaStatus = serde_json::from_str(
            r#"{"queryCount":3,"maxQueries":5,"uploadCount":4,"maxUploads":5,"isSubscribed":false,"remainingQueries":2,"remainingUploads":1}"#,
        )
        .unwrap();
        assert_eq!(status.tier(), "free");
        assert!(status.can_upload());
        assert!(status.is_last_upload());
        assert!(status.can_query());
        assert!(!status.is_last_query());
        assert_eq!(status.remaining_uploads, Some(1));
    }

    #[test]
    fn test_quota_status_counter_bounds() {
        let mut status = QuotaStatus {
            query_count: u64::MAX,
            max_queries: u64::MAX,
            upload_count: u64::MAX,
            max_uploads: u64::MAX,
            is_subscribed: true,
            remaining_queries: None,
            remaining_uploads: None,
        };
        assert!(!status.can_upload());
        assert!(!status.is_last_upload());
        assert!(!status.is_last_query());

        status.upload_count = u64::MAX - 1;
        assert!(status.is_last_upload());

        status.upload_count = 0;
        status.max_uploads = 0;
        assert!(!status.can_upload());
        assert!(!status.is_last_upload());
    }

    #[test]
    fn test_counter_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&CounterType::UploadCount).unwrap(),
            "\"uploadCount\""
        );
        assert_eq!(
            serde_json::to_string(&CounterType::QueryCount).unwrap(),
            "\"queryCount\""
        );
    }

    #[test]
    fn test_cost_estimate_database_label() {
        let estimate: CostEstimate = serde_json::from_str(
            r#"{"InstanceType":"t3.medium","Storage":"50GB","Database":"No","Total Pricing":"$40"}"#,
        )
        .unwrap();
        assert_eq!(estimate.database_label(), "No Database");
        assert_eq!(estimate.total_pricing, "$40");
    }
}
