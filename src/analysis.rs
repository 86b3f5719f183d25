// src/analysis.rs
//! Match runs against the backend and the board that holds their results

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::core::bounded::bounded;
use crate::core::service_client::MatchBackend;
use crate::error::ClientError;
use crate::types::MatchResult;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardSnapshot {
    pub results: Vec<MatchResult>,
    pub analyzing: bool,
}

/// Latest ranked results plus the in-flight flag. Readers either take a
/// snapshot or subscribe for changes.
#[derive(Debug)]
pub struct ResultsBoard {
    tx: watch::Sender<BoardSnapshot>,
}

impl Default for ResultsBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultsBoard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(BoardSnapshot::default());
        Self { tx }
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.tx.borrow().clone()
    }

    pub fn results(&self) -> Vec<MatchResult> {
        self.tx.borrow().results.clone()
    }

    pub fn is_analyzing(&self) -> bool {
        self.tx.borrow().analyzing
    }

    pub fn subscribe(&self) -> watch::Receiver<BoardSnapshot> {
        self.tx.subscribe()
    }

    pub(crate) fn set_analyzing(&self, analyzing: bool) {
        self.tx.send_if_modified(|snapshot| {
            let changed = snapshot.analyzing != analyzing;
            snapshot.analyzing = analyzing;
            changed
        });
    }

    /// Finish a run. `is_current` is evaluated under the board's write lock so
    /// a newer run cannot slip in between the check and the write.
    /// `None` keeps the previous results.
    pub(crate) fn finish_if<F>(&self, is_current: F, results: Option<Vec<MatchResult>>) -> bool
    where
        F: FnOnce() -> bool,
    {
        self.tx.send_if_modified(|snapshot| {
            if !is_current() {
                return false;
            }
            if let Some(results) = results {
                snapshot.results = results;
            }
            snapshot.analyzing = false;
            true
        })
    }

    pub(crate) fn clear(&self) {
        self.tx.send_replace(BoardSnapshot::default());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The run was the latest one issued; its results are on the board.
    Applied(Vec<MatchResult>),
    /// A newer run started meanwhile; this run's answer was dropped.
    Superseded { run_id: u64 },
}

/// Triggers match runs. Only the most recently issued run may touch the board.
pub struct AnalysisController {
    backend: Arc<dyn MatchBackend>,
    board: Arc<ResultsBoard>,
    timeout: Duration,
    latest_run: AtomicU64,
    cancel: Mutex<CancellationToken>,
}

impl AnalysisController {
    pub fn new(backend: Arc<dyn MatchBackend>, board: Arc<ResultsBoard>, timeout: Duration) -> Self {
        Self {
            backend,
            board,
            timeout,
            latest_run: AtomicU64::new(0),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn board(&self) -> &Arc<ResultsBoard> {
        &self.board
    }

    pub fn latest_run(&self) -> u64 {
        self.latest_run.load(Ordering::SeqCst)
    }

    /// Fetch ranked results for `job_id`. On failure the previous results
    /// stay on the board and the error is returned.
    pub async fn run_analysis(&self, job_id: &str, token: &str) -> Result<RunOutcome, ClientError> {
        let run_id = self.latest_run.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = self.cancellation();

        info!(run_id, "Analyzing matches for job {}", job_id);
        self.board.set_analyzing(true);

        let outcome = bounded(&cancel, self.timeout, self.backend.match_resumes(token, job_id)).await;

        let is_current = || self.latest_run.load(Ordering::SeqCst) == run_id;

        match outcome {
            Ok(results) => {
                if self.board.finish_if(is_current, Some(results.clone())) {
                    info!(run_id, "Showing {} matches for job {}", results.len(), job_id);
                    Ok(RunOutcome::Applied(results))
                } else {
                    debug!(run_id, "Discarding superseded results for job {}", job_id);
                    Ok(RunOutcome::Superseded { run_id })
                }
            }
            Err(e) => {
                if self.board.finish_if(is_current, None) {
                    error!(run_id, "Error running analysis for job {}: {}", job_id, e);
                    Err(e)
                } else {
                    debug!(run_id, "Superseded run for job {} failed: {}", job_id, e);
                    Ok(RunOutcome::Superseded { run_id })
                }
            }
        }
    }

    /// Token shared by every bounded operation currently in flight.
    pub(crate) fn cancellation(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Retire the current run: it is cancelled and may no longer touch the board.
    pub fn invalidate(&self) {
        let retired = self.latest_run.fetch_add(1, Ordering::SeqCst);
        debug!(run_id = retired, "Retiring in-flight analysis");
        self.cancel();
        self.board.set_analyzing(false);
    }

    /// Abort every operation bound to the current token. Later operations get
    /// a fresh one.
    pub fn cancel(&self) {
        let previous = std::mem::replace(
            &mut *self.cancel.lock().unwrap_or_else(PoisonError::into_inner),
            CancellationToken::new(),
        );
        previous.cancel();
    }
}

impl Drop for AnalysisController {
    fn drop(&mut self) {
        self.cancel();
    }
}
