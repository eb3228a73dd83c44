use std::sync::Arc;

use crate::auth::SessionVerifier;
use crate::config::Config;
use crate::llm_client::AnalysisProvider;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable analysis provider. Default: GeminiClient. Tests inject stubs.
    pub provider: Arc<dyn AnalysisProvider>,
    /// Pluggable session verifier backed by the external identity provider.
    pub sessions: Arc<dyn SessionVerifier>,
    #[allow(dead_code)]
    pub config: Config,
}
