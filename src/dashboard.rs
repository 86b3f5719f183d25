// src/dashboard.rs
//! Screening workflow for one mounted client: session, upload, job criteria
//! and the result board.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::analysis::{AnalysisController, ResultsBoard, RunOutcome};
use crate::composer::JobComposer;
use crate::config::ClientConfig;
use crate::core::bounded::bounded;
use crate::core::listeners::Subscription;
use crate::core::service_client::MatchBackend;
use crate::error::ClientError;
use crate::router::{resolve, RouteDecision};
use crate::session::{IdentityProvider, SessionGuard, SessionState};
use crate::uploader::{ResumeUploader, UploadTask};
use crate::view::{render, RenderedResults};

pub struct Dashboard {
    guard: SessionGuard,
    backend: Arc<dyn MatchBackend>,
    uploader: ResumeUploader,
    composer: JobComposer,
    analysis: Arc<AnalysisController>,
    board: Arc<ResultsBoard>,
    timeout: Duration,
    session_watch: Option<Subscription>,
}

impl Dashboard {
    pub fn new(
        config: &ClientConfig,
        provider: Arc<dyn IdentityProvider>,
        backend: Arc<dyn MatchBackend>,
    ) -> Self {
        let board = Arc::new(ResultsBoard::new());
        Self {
            guard: SessionGuard::new(provider),
            uploader: ResumeUploader::new(),
            composer: JobComposer::new(config.limits, config.registration_policy),
            analysis: Arc::new(AnalysisController::new(
                Arc::clone(&backend),
                Arc::clone(&board),
                config.request_timeout,
            )),
            backend,
            board,
            timeout: config.request_timeout,
            session_watch: None,
        }
    }

    /// Resolve the session and start following it. Signing out retires any
    /// analysis in flight and drops the results.
    pub async fn mount(&mut self) -> SessionState {
        if self.session_watch.is_none() {
            let analysis = Arc::clone(&self.analysis);
            let board = Arc::clone(&self.board);
            self.session_watch = Some(self.guard.on_change(move |state| {
                if matches!(state, SessionState::Anonymous) {
                    analysis.invalidate();
                    board.clear();
                }
            }));
        }
        let state = self.guard.start().await;
        debug!(authenticated = state.is_authenticated(), "Dashboard mounted");
        state
    }

    /// Release every listener and abort in-flight analysis. Idempotent.
    pub fn unmount(&mut self) {
        if let Some(watch) = self.session_watch.take() {
            watch.unsubscribe();
        }
        self.guard.teardown();
        self.analysis.cancel();
    }

    pub fn navigate(&self, path: &str) -> RouteDecision {
        let decision = resolve(path, &self.guard.state());
        if let RouteDecision::Redirect(to) = &decision {
            info!("Redirecting {} to {}", path, to.path());
        }
        decision
    }

    pub fn session(&self) -> &SessionGuard {
        &self.guard
    }

    pub fn uploader(&self) -> &ResumeUploader {
        &self.uploader
    }

    pub fn composer(&self) -> &JobComposer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut JobComposer {
        &mut self.composer
    }

    pub fn board(&self) -> Arc<ResultsBoard> {
        Arc::clone(&self.board)
    }

    pub fn select_resume_bytes(
        &mut self,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<&UploadTask, ClientError> {
        self.uploader.select_file(file_name, content)
    }

    pub async fn select_resume(&mut self, path: &Path) -> Result<&UploadTask, ClientError> {
        self.uploader.select_path(path).await
    }

    pub async fn upload_resume(&mut self) -> Result<(), ClientError> {
        let token = self.guard.fresh_token().await?;
        let cancel = self.analysis.cancellation();
        bounded(
            &cancel,
            self.timeout,
            self.uploader.upload(&token, self.backend.as_ref()),
        )
        .await
    }

    /// Register the composed job, then rank résumés against it.
    pub async fn submit_job(&mut self) -> Result<(String, RunOutcome), ClientError> {
        let cancel = self.analysis.cancellation();
        let criteria = bounded(
            &cancel,
            self.timeout,
            self.composer.submit(&self.guard, self.backend.as_ref()),
        )
        .await?;
        let token = self.guard.require_token()?;
        let outcome = self.analysis.run_analysis(&criteria.job_id, &token).await?;
        Ok((criteria.job_id, outcome))
    }

    /// Rank against a job registered earlier.
    pub async fn rerun(&self, job_id: &str) -> Result<RunOutcome, ClientError> {
        let token = self.guard.fresh_token().await?;
        self.analysis.run_analysis(job_id, &token).await
    }

    /// Handle that aborts whatever upload, submission or analysis is in flight.
    pub fn canceller(&self) -> Arc<AnalysisController> {
        Arc::clone(&self.analysis)
    }

    pub fn render(&self) -> RenderedResults {
        let snapshot = self.board.snapshot();
        render(&snapshot.results, snapshot.analyzing)
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.unmount();
    }
}
