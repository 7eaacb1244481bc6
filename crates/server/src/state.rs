//! Application State
//!
//! Shared state across all handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

use form_agent_agent::{FormAgent, StepOutcome, UserInput};
use form_agent_config::Settings;

use crate::metrics::record_step;
use crate::session::SessionManager;
use crate::uploads::UploadStore;
use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    /// Session store
    pub sessions: Arc<SessionManager>,
    /// Form agent shared by every session
    pub agent: Arc<FormAgent>,
    pub uploads: Arc<UploadStore>,
    /// Prometheus handle, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Settings, sessions: Arc<SessionManager>, agent: Arc<FormAgent>) -> Self {
        let uploads = Arc::new(UploadStore::new(config.uploads.dir.clone()));
        Self {
            config: Arc::new(config),
            sessions,
            agent,
            uploads,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }

    /// Run one step for a session.
    ///
    /// The session's lock is held for the whole step so concurrent requests
    /// on the same session are applied one after another.
    pub async fn process_step(
        &self,
        session_id: &str,
        input: Option<UserInput>,
    ) -> Result<StepOutcome, ServerError> {
        let mode = if input.is_some() { "answer" } else { "ask" };
        let session = self.sessions.get_or_create(session_id)?;
        let mut form = session.state.lock().await;

        let start = Instant::now();
        let outcome = self.agent.process_step(&mut form, input).await?;
        session.touch();

        record_step(mode, outcome.kind(), start.elapsed());
        tracing::info!(
            session_id = %session_id,
            mode,
            outcome = outcome.kind(),
            index = form.index(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Processed step"
        );

        Ok(outcome)
    }
}
