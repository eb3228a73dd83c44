/// LLM Client — the single point of entry for all Gemini API calls in Docsight.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// All LLM interactions MUST go through this module.
///
/// Model: gemini-2.0-flash (hardcoded — do not make configurable to prevent drift)
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::AppError;

pub mod prompts;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// The model used for all LLM calls in Docsight.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "gemini-2.0-flash";

// Fixed sampling parameters. Every analysis call uses the same settings.
const TEMPERATURE: f32 = 0.7;
const TOP_P: f32 = 0.95;
const TOP_K: u32 = 40;
const MAX_OUTPUT_TOKENS: u32 = 4096;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid or missing API key: {0}")]
    InvalidApiKey(String),

    #[error("quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("provider rejected the file: {0}")]
    InvalidFile(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::InvalidApiKey(msg) => AppError::ApiKey(msg),
            ProviderError::QuotaExhausted(msg) => AppError::QuotaExceeded(msg),
            ProviderError::InvalidFile(msg) => AppError::Validation(msg),
            ProviderError::Http(err) => AppError::Provider(err.to_string()),
            ProviderError::Api { status, message } => {
                AppError::Provider(format!("provider returned status {status}: {message}"))
            }
            ProviderError::EmptyContent => {
                AppError::Provider("model returned no text content".to_string())
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types — generateContent request/response
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

/// A single content part: plain text, or inline binary data for
/// multimodal requests (images and PDFs).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64-encoded file bytes.
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

impl GenerationConfig {
    fn fixed() -> Self {
        Self {
            temperature: TEMPERATURE,
            top_p: TOP_P,
            top_k: TOP_K,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

impl GenerateContentResponse {
    /// Concatenates the text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Provider trait
// ────────────────────────────────────────────────────────────────────────────

/// The analysis provider seam. Handlers only see this trait, so tests can
/// swap in stubs without a live API key.
///
/// Carried in `AppState` as `Arc<dyn AnalysisProvider>`.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Sends a text-only prompt and returns the model's text.
    async fn generate_text(&self, prompt: &str) -> Result<String, AppError>;

    /// Sends a multimodal request: instruction text plus inline binary data.
    async fn generate_with_file(
        &self,
        prompt: &str,
        mime_type: &str,
        data: &[u8],
    ) -> Result<String, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// GeminiClient
// ────────────────────────────────────────────────────────────────────────────

/// The single LLM client used by all services in Docsight.
/// Wraps the Gemini generateContent API. Each call is one synchronous
/// round trip: no retries, no batching.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    async fn generate(&self, parts: Vec<Part<'_>>, system: &str) -> Result<String, ProviderError> {
        let request_body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts,
            }],
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::Text { text: system }],
            }),
            generation_config: GenerationConfig::fixed(),
        };

        let url = format!("{GEMINI_API_URL}/{MODEL}:generateContent");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Prefer the structured status field; fall back to the raw body.
            let (api_status, message) = serde_json::from_str::<GeminiErrorEnvelope>(&body)
                .map(|e| (e.error.status, e.error.message))
                .unwrap_or((String::new(), body));
            warn!("LLM API returned {}: {}", status, message);
            return Err(classify_provider_error(
                status.as_u16(),
                &api_status,
                &message,
            ));
        }

        let parsed: GenerateContentResponse = response.json().await?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "LLM call succeeded: prompt_tokens={}, candidate_tokens={}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        parsed.text().ok_or(ProviderError::EmptyContent)
    }
}

#[async_trait]
impl AnalysisProvider for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, AppError> {
        Ok(self
            .generate(vec![Part::Text { text: prompt }], prompts::ANALYSIS_SYSTEM)
            .await?)
    }

    async fn generate_with_file(
        &self,
        prompt: &str,
        mime_type: &str,
        data: &[u8],
    ) -> Result<String, AppError> {
        let parts = vec![
            Part::InlineData {
                inline_data: InlineData {
                    mime_type: mime_type.to_string(),
                    data: BASE64_STANDARD.encode(data),
                },
            },
            Part::Text { text: prompt },
        ];
        Ok(self.generate(parts, prompts::ANALYSIS_SYSTEM).await?)
    }
}

/// Classifies a provider failure into a typed error.
///
/// The structured `status` field of the Gemini error payload and the HTTP
/// status take precedence; substring matching on the message is kept only
/// as a fallback for unstructured responses.
fn classify_provider_error(http_status: u16, api_status: &str, message: &str) -> ProviderError {
    let lower = message.to_ascii_lowercase();

    if http_status == 401
        || http_status == 403
        || api_status == "UNAUTHENTICATED"
        || api_status == "PERMISSION_DENIED"
        || lower.contains("api key")
    {
        return ProviderError::InvalidApiKey(message.to_string());
    }

    if http_status == 429 || api_status == "RESOURCE_EXHAUSTED" || lower.contains("quota") {
        return ProviderError::QuotaExhausted(message.to_string());
    }

    if (http_status == 400 || api_status == "INVALID_ARGUMENT")
        && (lower.contains("file")
            || lower.contains("document")
            || lower.contains("image")
            || lower.contains("mime")
            || lower.contains("unsupported"))
    {
        return ProviderError::InvalidFile(message.to_string());
    }

    ProviderError::Api {
        status: http_status,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_401_as_invalid_api_key() {
        let e = classify_provider_error(401, "UNAUTHENTICATED", "API key not valid");
        assert!(matches!(e, ProviderError::InvalidApiKey(_)));
    }

    #[test]
    fn test_classify_api_key_substring_fallback() {
        let e = classify_provider_error(500, "", "Your API key has expired");
        assert!(matches!(e, ProviderError::InvalidApiKey(_)));
    }

    #[test]
    fn test_classify_429_as_quota() {
        let e = classify_provider_error(429, "RESOURCE_EXHAUSTED", "Resource has been exhausted");
        assert!(matches!(e, ProviderError::QuotaExhausted(_)));
    }

    #[test]
    fn test_classify_quota_substring_fallback() {
        let e = classify_provider_error(500, "", "You exceeded your current quota");
        assert!(matches!(e, ProviderError::QuotaExhausted(_)));
    }

    #[test]
    fn test_classify_invalid_file() {
        let e = classify_provider_error(400, "INVALID_ARGUMENT", "Unable to process input document");
        assert!(matches!(e, ProviderError::InvalidFile(_)));
    }

    #[test]
    fn test_classify_unmatched_falls_through_to_api() {
        let e = classify_provider_error(503, "UNAVAILABLE", "The model is overloaded");
        assert!(matches!(e, ProviderError::Api { status: 503, .. }));
    }

    #[test]
    fn test_api_key_error_maps_to_401_app_error() {
        let app: AppError = ProviderError::InvalidApiKey("bad key".into()).into();
        assert!(matches!(app, AppError::ApiKey(_)));
    }

    #[test]
    fn test_quota_error_maps_to_429_app_error() {
        let app: AppError = ProviderError::QuotaExhausted("quota".into()).into();
        assert!(matches!(app, AppError::QuotaExceeded(_)));
    }

    #[test]
    fn test_invalid_file_maps_to_validation() {
        let app: AppError = ProviderError::InvalidFile("bad pdf".into()).into();
        assert!(matches!(app, AppError::Validation(_)));
    }

    #[test]
    fn test_inline_data_serializes_camel_case() {
        let part = Part::InlineData {
            inline_data: InlineData {
                mime_type: "application/pdf".to_string(),
                data: "QUJD".to_string(),
            },
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(json["inlineData"]["data"], "QUJD");
    }

    #[test]
    fn test_generation_config_serializes_fixed_params() {
        let json = serde_json::to_value(GenerationConfig::fixed()).unwrap();
        assert_eq!(json["topK"], 40);
        assert_eq!(json["maxOutputTokens"], 4096);
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "world" }] }
            }]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_response_text_empty_candidates() {
        let response: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({ "candidates": [] })).unwrap();
        assert!(response.text().is_none());
    }
}
