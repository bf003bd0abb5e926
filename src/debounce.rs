//! Debounced analysis scheduling for a draft being typed.
//!
//! Every edit bumps a monotonically increasing sequence number and replaces
//! the single outstanding task. A task sleeps for the quiet period, runs the
//! analysis, and publishes its result only if its sequence number is still the
//! latest one issued. Anything superseded in the meantime is discarded.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::ErrorContext;
use crate::models::{content_hash, AnalysisResult};
use crate::pipeline::AnalysisOrchestrator;

/// Default quiet interval before an analysis starts.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);
/// Default minimum trimmed length (in chars) worth analysing.
pub const DEFAULT_MIN_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    pub quiet_period: Duration,
    pub min_chars: usize,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            min_chars: DEFAULT_MIN_CHARS,
        }
    }
}

/// The visible analysis: which edit it belongs to and for what text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSnapshot {
    pub sequence: u64,
    pub text: String,
    pub result: AnalysisResult,
}

/// What an edit did to the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// An analysis was scheduled under this sequence number.
    Scheduled(u64),
    /// Text too short: pending work cancelled and the visible result cleared.
    Cleared,
}

/// At most one outstanding analysis, latest edit wins.
///
/// Must be used from within a tokio runtime.
pub struct DebounceController {
    orchestrator: Arc<AnalysisOrchestrator>,
    config: DebounceConfig,
    sequence: Arc<AtomicU64>,
    started: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
    results: Arc<watch::Sender<Option<AnalysisSnapshot>>>,
}

impl DebounceController {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>, config: DebounceConfig) -> Self {
        let (results, _) = watch::channel(None);
        Self {
            orchestrator,
            config,
            sequence: Arc::new(AtomicU64::new(0)),
            started: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
            results: Arc::new(results),
        }
    }

    pub fn config(&self) -> DebounceConfig {
        self.config
    }

    /// Register an edit of the draft.
    pub fn on_edit(&self, text: &str) -> EditOutcome {
        let sequence = self.supersede();

        if text.trim().chars().count() < self.config.min_chars {
            self.results.send_replace(None);
            tracing::trace!(sequence, "Draft below minimum length, result cleared");
            return EditOutcome::Cleared;
        }

        let handle = tokio::spawn(run_debounced(
            Arc::clone(&self.orchestrator),
            Arc::clone(&self.sequence),
            Arc::clone(&self.started),
            Arc::clone(&self.results),
            self.config.quiet_period,
            sequence,
            text.to_string(),
        ));

        *self.lock_pending() = Some(handle);
        tracing::trace!(sequence, "Analysis scheduled");
        EditOutcome::Scheduled(sequence)
    }

    /// Drop any pending analysis and clear the visible result.
    pub fn cancel(&self) {
        self.supersede();
        self.results.send_replace(None);
    }

    /// Receiver that observes every applied (or cleared) result.
    pub fn subscribe(&self) -> watch::Receiver<Option<AnalysisSnapshot>> {
        self.results.subscribe()
    }

    /// Currently visible result, if any.
    pub fn latest(&self) -> Option<AnalysisSnapshot> {
        self.results.borrow().clone()
    }

    /// Latest sequence number issued.
    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Number of analyses that actually started (survived their quiet period).
    pub fn analyses_started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    /// Issue a new sequence number and abort the outstanding task.
    fn supersede(&self) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(handle) = self.lock_pending().take() {
            handle.abort();
        }
        sequence
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for DebounceController {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_pending().take() {
            handle.abort();
        }
    }
}

async fn run_debounced(
    orchestrator: Arc<AnalysisOrchestrator>,
    latest: Arc<AtomicU64>,
    started: Arc<AtomicU64>,
    results: Arc<watch::Sender<Option<AnalysisSnapshot>>>,
    quiet_period: Duration,
    sequence: u64,
    text: String,
) {
    tokio::time::sleep(quiet_period).await;

    if latest.load(Ordering::SeqCst) != sequence {
        return;
    }
    started.fetch_add(1, Ordering::SeqCst);

    let context = ErrorContext::new("debounced_analysis").with_sequence(sequence);
    let result = AssertUnwindSafe(orchestrator.analyze_with_context(&text, context))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| {
            tracing::error!(
                sequence,
                content_hash = %content_hash(&text),
                "Analysis task panicked, returning identity result"
            );
            AnalysisResult::processing_failure(&text)
        });

    let applied = results.send_if_modified(|current| {
        if latest.load(Ordering::SeqCst) != sequence {
            return false;
        }
        *current = Some(AnalysisSnapshot {
            sequence,
            text,
            result,
        });
        true
    });

    if !applied {
        tracing::debug!(sequence, "Stale analysis discarded");
    }
}
