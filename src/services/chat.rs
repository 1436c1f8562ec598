use crate::error::ClientResult;
use crate::models::{ChatReply, CostEstimate};
use crate::utils::validation;
use serde::Deserialize;
use serde_json::json;

pub const INVALID_RESPONSE: &str = "Invalid response from server.";
pub const ESTIMATE_ERROR: &str = "Error processing cost estimate.";
pub const REQUEST_FAILED: &str = "Request failed.";

#[derive(Debug, Deserialize)]
struct Envelope {
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EstimateBody {
    #[serde(default)]
    cost_estimate: Option<Vec<CostEstimate>>,
}

/// Client for the pricing chatbot behind the API gateway.
pub struct PricingChatClient {
    http: reqwest::Client,
    endpoint: String,
}

impl PricingChatClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    /// Sends `query` and returns the estimates. Only empty input is an error;
    /// transport failures and malformed replies become `ChatReply::Error`.
    pub async fn ask(&self, query: &str) -> ClientResult<ChatReply> {
        let query = validation::validate_chat_input(query)?;

        let response = match self.http.post(&self.endpoint).json(&request_body(query)).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Pricing request failed: {}", e);
                return Ok(ChatReply::Error(REQUEST_FAILED.to_string()));
            }
        };

        match response.text().await {
            Ok(raw) => Ok(parse_reply(&raw)),
            Err(e) => {
                tracing::error!("Pricing response unreadable: {}", e);
                Ok(ChatReply::Error(REQUEST_FAILED.to_string()))
            }
        }
    }
}

/// The gateway expects the query double-encoded inside `body`.
pub fn request_body(query: &str) -> serde_json::Value {
    json!({ "body": json!({ "query": query }).to_string() })
}

pub fn parse_reply(raw: &str) -> ChatReply {
    let body = match serde_json::from_str::<Envelope>(raw) {
        Ok(Envelope { body: Some(body) }) => body,
        Ok(Envelope { body: None }) => return ChatReply::Error(INVALID_RESPONSE.to_string()),
        Err(e) => {
            tracing::warn!("Pricing response is not JSON: {}", e);
            return ChatReply::Error(REQUEST_FAILED.to_string());
        }
    };

    match serde_json::from_str::<EstimateBody>(&body) {
        Ok(EstimateBody {
            cost_estimate: Some(estimates),
        }) if !estimates.is_empty() => ChatReply::Estimates(estimates),
        Ok(_) => ChatReply::Error(ESTIMATE_ERROR.to_string()),
        Err(e) => {
            tracing::warn!("Malformed estimate body: {}", e);
            ChatReply::Error(ESTIMATE_ERROR.to_string())
        }
    }
}

/// Plain-text table for one estimate, numbered from 1.
pub fn render_estimate(index: usize, estimate: &CostEstimate) -> String {
    let rows = [
        ("Instance Type", estimate.instance_type.as_str()),
        ("Storage", estimate.storage.as_str()),
        ("Database", estimate.database_label()),
        ("Monthly Server Cost", estimate.monthly_server_cost.as_str()),
        ("Monthly Storage Cost", estimate.monthly_storage_cost.as_str()),
        ("Monthly Database Cost", estimate.monthly_database_cost.as_str()),
        ("Total Pricing", estimate.total_pricing.as_str()),
    ];

    let mut out = format!("Server {} Estimate:\n", index + 1);
    for (label, value) in rows {
        out.push_str(&format!("  {:<22} {}\n", label, value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_is_double_encoded() {
        let body = request_body("2 servers with 8GB RAM");
        let inner = body["body"].as_str().unwrap();
        let decoded: serde_json::Value = serde_json::from_str(inner).unwrap();
        assert_eq!(decoded["query"], "2 servers with 8GB RAM");
    }

    #[test]
    fn test_parse_estimates() {
        let inner = json!({
            "cost_estimate": [{
                "InstanceType": "t3.large",
                "Storage": "100GB",
                "Database": "MySQL",
                "Monthly Server Cost": "$60.74",
                "Monthly Storage Cost": "$8.00",
                "Monthly Database Cost": "$12.50",
                "Total Pricing": "$81.24"
            }]
        });
        let raw = json!({ "body": inner.to_string() }).to_string();

        match parse_reply(&raw) {
            ChatReply::Estimates(estimates) => {
                assert_eq!(estimates.len(), 1);
                assert_eq!(estimates[0].instance_type, "t3.large");
                assert_eq!(estimates[0].total_pricing, "$81.24");
            }
            other => panic!("expected estimates, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_replies_degrade() {
        assert_eq!(
            parse_reply(r#"{"statusCode": 500}"#),
            ChatReply::Error(INVALID_RESPONSE.to_string())
        );
        assert_eq!(
            parse_reply(r#"{"body": "{\"cost_estimate\": []}"}"#),
            ChatReply::Error(ESTIMATE_ERROR.to_string())
        );
        assert_eq!(
            parse_reply(r#"{"body": "{\"error\": \"Bedrock returned an empty response\"}"}"#),
            ChatReply::Error(ESTIMATE_ERROR.to_string())
        );
        assert_eq!(
            parse_reply(r#"{"body": "not json"}"#),
            ChatReply::Error(ESTIMATE_ERROR.to_string())
        );
        assert_eq!(
            parse_reply("<html>gateway timeout</html>"),
            ChatReply::Error(REQUEST_FAILED.to_string())
        );
    }

    #[test]
    fn test_render_estimate() {
        let estimate = CostEstimate {
            instance_type: "t3.micro".to_string(),
            storage: "20GB".to_string(),
            database: "No".to_string(),
            monthly_server_cost: "$7.59".to_string(),
            monthly_storage_cost: "$1.60".to_string(),
            monthly_database_cost: "$0.00".to_string(),
            total_pricing: "$9.19".to_string(),
        };
        let text = render_estimate(0, &estimate);
        assert!(text.starts_with("Server 1 Estimate:"));
        assert!(text.contains("No Database"));
        assert!(text.contains("$9.19"));
    }
}
