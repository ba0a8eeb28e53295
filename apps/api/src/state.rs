use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LanguageModel;
use crate::matching::scoring::CandidateScorer;
use crate::session::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Model backend. `LlmClient` in production.
    pub llm: Arc<dyn LanguageModel>,
    /// Pluggable candidate scorer. Default: ProficiencyScorer.
    pub scorer: Arc<dyn CandidateScorer>,
    pub sessions: SessionStore,
    pub config: Config,
}

impl AppState {
    pub fn new(
        config: Config,
        llm: Arc<dyn LanguageModel>,
        scorer: Arc<dyn CandidateScorer>,
    ) -> Self {
        Self {
            sessions: SessionStore::new(config.session_ttl_minutes),
            llm,
            scorer,
            config,
        }
    }
}
