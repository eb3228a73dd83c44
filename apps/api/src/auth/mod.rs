//! Session verification against the external identity provider.
//!
//! The provider owns sign-in, sign-up, and sign-out. This module only
//! answers one question per request: does this bearer token belong to a
//! live session, and if so, whose email is it?

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::errors::AppError;
use crate::state::AppState;

/// The authenticated identity attached to a request. All we ever read from
/// the identity provider is the email; everything else stays opaque.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub email: String,
}

/// The session verification seam. Handlers and middleware only see this
/// trait, so tests can swap in stubs without a live identity provider.
///
/// Carried in `AppState` as `Arc<dyn SessionVerifier>`.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    /// Resolves a bearer token to a user. `Ok(None)` means the token is
    /// not (or no longer) a valid session.
    async fn verify(&self, token: &str) -> Result<Option<SessionUser>, AppError>;
}

/// Verifies tokens by calling the identity provider's userinfo endpoint.
pub struct UserinfoVerifier {
    client: reqwest::Client,
    userinfo_url: String,
}

impl UserinfoVerifier {
    pub fn new(userinfo_url: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            userinfo_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserinfoResponse {
    email: String,
}

#[async_trait]
impl SessionVerifier for UserinfoVerifier {
    async fn verify(&self, token: &str) -> Result<Option<SessionUser>, AppError> {
        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("identity provider unreachable: {e}"))
            })?;

        match response.status() {
            s if s.is_success() => {
                let info: UserinfoResponse = response.json().await.map_err(|e| {
                    AppError::Internal(anyhow::anyhow!(
                        "identity provider returned malformed userinfo: {e}"
                    ))
                })?;
                Ok(Some(SessionUser { email: info.email }))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            s => Err(AppError::Internal(anyhow::anyhow!(
                "identity provider returned unexpected status {s}"
            ))),
        }
    }
}

/// Middleware guarding authenticated routes. Extracts the bearer token,
/// verifies it with the identity provider, and attaches the resulting
/// `SessionUser` to the request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
        .ok_or(AppError::Unauthorized)?;

    let user = state
        .sessions
        .verify(&token)
        .await?
        .ok_or(AppError::Unauthorized)?;

    debug!(user = %user.email, "session verified");
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
