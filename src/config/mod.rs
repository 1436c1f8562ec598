use crate::utils::validation::MAX_UPLOAD_SIZE;
use std::env;
use std::time::Duration;

/// Client configuration for the bucket, the poller and the pricing APIs
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bucket holding uploads and generated results (default: "price--inventory")
    pub bucket: String,

    /// AWS region (default: "ap-south-1")
    pub region: String,

    /// Custom S3 endpoint, e.g. a local MinIO
    pub endpoint_url: Option<String>,

    /// Static credentials; the default AWS provider chain is used when unset
    pub access_key: Option<String>,
    pub secret_key: Option<String>,

    /// Path-style addressing, needed by most S3-compatible servers
    pub force_path_style: bool,

    /// Interval between bucket listings (default: 5 s)
    pub poll_interval: Duration,

    /// Maximum upload size in bytes (default: 1 MiB)
    pub max_upload_size: usize,

    /// Lifetime of signed download links (default: 15 min)
    pub presign_expiry: Duration,

    /// Extension appended when inferring an upload name from a result key (default: "xlsx")
    pub default_result_extension: String,

    /// Quota/status API endpoint
    pub status_api_url: Option<String>,

    /// Pricing chatbot endpoint
    pub chat_api_url: Option<String>,

    /// Identity sent to the quota API
    pub user_email: Option<String>,
    pub provider_user_id: Option<String>,

    /// Bearer token for the quota API
    pub api_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            bucket: "price--inventory".to_string(),
            region: "ap-south-1".to_string(),
            endpoint_url: None,
            access_key: None,
            secret_key: None,
            force_path_style: false,
            poll_interval: Duration::from_secs(5),
            max_upload_size: MAX_UPLOAD_SIZE,
            presign_expiry: Duration::from_secs(15 * 60),
            default_result_extension: "xlsx".to_string(),
            status_api_url: None,
            chat_api_url: None,
            user_email: None,
            provider_user_id: None,
            api_token: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            bucket: env::var("S3_BUCKET").unwrap_or(default.bucket),

            region: env::var("AWS_REGION").unwrap_or(default.region),

            endpoint_url: non_empty_var("S3_ENDPOINT"),
            access_key: non_empty_var("S3_ACCESS_KEY"),
            secret_key: non_empty_var("S3_SECRET_KEY"),

            force_path_style: env::var("S3_FORCE_PATH_STYLE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.force_path_style),

            poll_interval: env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(default.poll_interval),

            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),

            presign_expiry: env::var("PRESIGN_EXPIRY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.presign_expiry),

            default_result_extension: env::var("DEFAULT_RESULT_EXTENSION")
                .unwrap_or(default.default_result_extension),

            status_api_url: non_empty_var("STATUS_API_URL"),
            chat_api_url: non_empty_var("CHAT_API_URL"),
            user_email: non_empty_var("USER_EMAIL"),
            provider_user_id: non_empty_var("PROVIDER_USER_ID"),
            api_token: non_empty_var("API_TOKEN"),
        }
    }

    /// Local MinIO with its stock credentials
    pub fn development() -> Self {
        Self {
            endpoint_url: Some("http://127.0.0.1:9000".to_string()),
            access_key: Some("minioadmin".to_string()),
            secret_key: Some("minioadmin".to_string()),
            region: "us-east-1".to_string(),
            force_path_style: true,
            ..Self::default()
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
