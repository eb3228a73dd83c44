//! Request/response types for the analyze API. All response types use a
//! camelCase wire format to match the browser client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JSON body of a text submission.
#[derive(Debug, Deserialize)]
pub struct AnalyzeTextRequest {
    pub prompt: String,
    // Client-supplied submission time. Accepted for contract compatibility
    // but not used server-side.
    #[serde(default)]
    #[allow(dead_code)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// The uniform success envelope. Errors use the same shape with
/// `success: false` and an `error` string (see `errors.rs`).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub success: bool,
    pub response: String,
    pub metadata: AnalysisMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub request_id: Uuid,
    pub model: String,
    pub analyzed_at: DateTime<Utc>,
    pub processing_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_chars: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<usize>,
}

/// Static capability description returned by `GET /api/analyze`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesResponse {
    pub model: &'static str,
    pub supported_types: Vec<&'static str>,
    pub max_file_bytes: usize,
    pub max_text_chars: usize,
    pub version: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_serializes_camel_case() {
        let metadata = AnalysisMetadata {
            request_id: Uuid::new_v4(),
            model: "gemini-2.0-flash".to_string(),
            analyzed_at: Utc::now(),
            processing_ms: 42,
            prompt_chars: Some(120),
            file_type: None,
            file_size_bytes: None,
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["promptChars"], 120);
        assert_eq!(json["processingMs"], 42);
        assert!(json.get("fileType").is_none());
    }

    #[test]
    fn test_file_metadata_includes_type_and_size() {
        let metadata = AnalysisMetadata {
            request_id: Uuid::new_v4(),
            model: "gemini-2.0-flash".to_string(),
            analyzed_at: Utc::now(),
            processing_ms: 7,
            prompt_chars: None,
            file_type: Some("PDF".to_string()),
            file_size_bytes: Some(2048),
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["fileType"], "PDF");
        assert_eq!(json["fileSizeBytes"], 2048);
        assert!(json.get("promptChars").is_none());
    }

    #[test]
    fn test_text_request_accepts_optional_timestamp() {
        let parsed: AnalyzeTextRequest =
            serde_json::from_str(r#"{"prompt": "review my resume"}"#).unwrap();
        assert_eq!(parsed.prompt, "review my resume");

        let parsed: AnalyzeTextRequest = serde_json::from_str(
            r#"{"prompt": "hi", "timestamp": "2026-08-23T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(parsed.prompt, "hi");
    }
}
