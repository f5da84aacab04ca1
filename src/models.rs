use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Link entry in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Link {
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
}

/// Request to shorten a URL.
///
/// The field is optional so that a missing `url` key reaches the store and
/// fails with the specific "URL required" message instead of a generic
/// deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// Response after shortening a URL
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub short_code: String,
}

/// Response for an API-side lookup of a short code
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub original_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorten_response_wire_names() {
        let response = ShortenResponse {
            short_code: "abc12345".to_string(),
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["shortCode"], "abc12345");
    }

    #[test]
    fn test_resolve_response_wire_names() {
        let response = ResolveResponse {
            original_url: "https://example.com".to_string(),
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["originalUrl"], "https://example.com");
    }

    #[test]
    fn test_shorten_request_missing_url() {
        let request: ShortenRequest = serde_json::from_str("{}").unwrap();
        assert!(request.url.is_none());
    }
}
