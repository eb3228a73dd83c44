//! Axum route handlers for the Analyze API.
//!
//! `POST /api/analyze` accepts either a JSON body `{prompt, timestamp?}` or a
//! multipart form `{file, prompt?, instruction?}` and returns the model's
//! analysis in a uniform envelope. `GET /api/analyze` describes what the
//! endpoint accepts.

use std::time::Instant;

use axum::{
    extract::{multipart::MultipartError, FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    Extension, Json,
};
use bytes::Bytes;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::analyze::models::{
    AnalysisMetadata, AnalysisResponse, AnalyzeTextRequest, CapabilitiesResponse,
};
use crate::analyze::validation::{self, FileKind, MAX_FILE_BYTES, MAX_TEXT_CHARS};
use crate::auth::SessionUser;
use crate::errors::AppError;
use crate::llm_client::{prompts, MODEL};
use crate::state::AppState;

/// POST /api/analyze
///
/// Branches on the Content-Type header: multipart bodies carry an uploaded
/// file, anything else is treated as a JSON text submission.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    req: Request,
) -> Result<Json<AnalysisResponse>, AppError> {
    let started = Instant::now();
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(req, &())
            .await
            .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?;
        analyze_file(&state, &user, multipart, started).await.map(Json)
    } else {
        let Json(body) = Json::<AnalyzeTextRequest>::from_request(req, &())
            .await
            .map_err(|e| AppError::Validation(format!("Invalid JSON body: {e}")))?;
        analyze_text(&state, &user, &body, started).await.map(Json)
    }
}

/// GET /api/analyze
///
/// Static capability description: model, accepted types, and limits.
pub async fn handle_capabilities() -> Json<CapabilitiesResponse> {
    Json(CapabilitiesResponse {
        model: MODEL,
        supported_types: validation::SUPPORTED_TYPES.iter().map(|t| t.mime).collect(),
        max_file_bytes: MAX_FILE_BYTES,
        max_text_chars: MAX_TEXT_CHARS,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn analyze_text(
    state: &AppState,
    user: &SessionUser,
    body: &AnalyzeTextRequest,
    started: Instant,
) -> Result<AnalysisResponse, AppError> {
    let prompt = body.prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::Validation("prompt cannot be empty".to_string()));
    }

    info!(user = %user.email, chars = prompt.chars().count(), "analyzing text prompt");

    let text = state.provider.generate_text(prompt).await?;

    Ok(AnalysisResponse {
        success: true,
        response: text,
        metadata: AnalysisMetadata {
            request_id: Uuid::new_v4(),
            model: MODEL.to_string(),
            analyzed_at: Utc::now(),
            processing_ms: started.elapsed().as_millis() as u64,
            prompt_chars: Some(prompt.chars().count()),
            file_type: None,
            file_size_bytes: None,
        },
    })
}

struct UploadedFile {
    data: Bytes,
    content_type: Option<String>,
}

struct FileSubmission {
    file: Option<UploadedFile>,
    prompt: Option<String>,
    instruction: Option<String>,
}

/// Maps a multipart read failure to the right status. A body-limit overrun
/// surfaces here as a 413 from the extractor and must stay a 413, not
/// collapse into a generic validation error.
fn multipart_read_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!(
            "Upload is larger than the maximum of {MAX_FILE_BYTES} bytes (10 MB)"
        ))
    } else {
        AppError::Validation(format!("Malformed multipart body: {e}"))
    }
}

async fn collect_multipart(mut multipart: Multipart) -> Result<FileSubmission, AppError> {
    let mut submission = FileSubmission {
        file: None,
        prompt: None,
        instruction: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_read_error)?
    {
        // Clone the name out: reading the field body consumes it.
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_read_error)?;
                submission.file = Some(UploadedFile { data, content_type });
            }
            Some("prompt") => {
                submission.prompt = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read 'prompt' field: {e}"))
                })?);
            }
            Some("instruction") => {
                submission.instruction = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read 'instruction' field: {e}"))
                })?);
            }
            _ => {} // unknown fields are ignored
        }
    }

    Ok(submission)
}

async fn analyze_file(
    state: &AppState,
    user: &SessionUser,
    multipart: Multipart,
    started: Instant,
) -> Result<AnalysisResponse, AppError> {
    let submission = collect_multipart(multipart).await?;

    let file = submission.file.ok_or_else(|| {
        AppError::Validation("No file provided. Attach the upload as a 'file' form field.".to_string())
    })?;

    if file.data.len() > MAX_FILE_BYTES {
        return Err(AppError::PayloadTooLarge(format!(
            "File is {} bytes; the maximum is {} bytes (10 MB)",
            file.data.len(),
            MAX_FILE_BYTES
        )));
    }

    let mime = validation::normalize_mime(file.content_type.as_deref().unwrap_or(""));
    let doc_type = validation::lookup(&mime).ok_or_else(|| {
        AppError::Validation(format!(
            "Unsupported file type '{mime}'. Supported types: {}",
            validation::supported_mime_list()
        ))
    })?;

    let instruction = prompts::compose_instruction(
        submission.instruction.as_deref(),
        submission.prompt.as_deref(),
    );

    info!(
        user = %user.email,
        file_type = doc_type.label,
        size = file.data.len(),
        "analyzing uploaded file"
    );

    let text = match doc_type.kind {
        FileKind::Inline => {
            state
                .provider
                .generate_with_file(&instruction, doc_type.mime, &file.data)
                .await?
        }
        FileKind::Text => {
            let document = validation::decode_text(&file.data);
            state
                .provider
                .generate_text(&prompts::compose_document_prompt(&instruction, &document))
                .await?
        }
    };

    Ok(AnalysisResponse {
        success: true,
        response: text,
        metadata: AnalysisMetadata {
            request_id: Uuid::new_v4(),
            model: MODEL.to_string(),
            analyzed_at: Utc::now(),
            processing_ms: started.elapsed().as_millis() as u64,
            prompt_chars: None,
            file_type: Some(doc_type.label.to_string()),
            file_size_bytes: Some(file.data.len()),
        },
    })
}
