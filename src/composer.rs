//! Sender-side composer: the consumer of the analysis engine.
//!
//! Drafts are analysed in the background while typed. On send the delivered
//! text is the transformed one; the original and its analysis stay in the
//! sender's local history.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::debounce::{AnalysisSnapshot, DebounceConfig, DebounceController, EditOutcome};
use crate::error::ErrorContext;
use crate::models::{content_hash, AnalysisResult};
use crate::pipeline::AnalysisOrchestrator;

/// A delivered message plus what the sender wrote.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    /// What the sender typed. Never delivered.
    pub original: String,
    /// What the recipient receives.
    pub delivered: String,
    pub analysis: AnalysisResult,
    pub sent_at: DateTime<Utc>,
    pub content_hash: String,
}

pub struct Composer {
    orchestrator: Arc<AnalysisOrchestrator>,
    debounce: DebounceController,
    draft: String,
    history: Vec<SentMessage>,
}

impl Composer {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>, config: DebounceConfig) -> Self {
        Self {
            debounce: DebounceController::new(Arc::clone(&orchestrator), config),
            orchestrator,
            draft: String::new(),
            history: Vec::new(),
        }
    }

    /// Replace the draft and reschedule its analysis.
    pub fn edit(&mut self, text: impl Into<String>) -> EditOutcome {
        self.draft = text.into();
        self.debounce.on_edit(&self.draft)
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Latest background analysis, if it still matches the draft.
    pub fn preview(&self) -> Option<AnalysisSnapshot> {
        self.debounce
            .latest()
            .filter(|snapshot| snapshot.text == self.draft)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AnalysisSnapshot>> {
        self.debounce.subscribe()
    }

    /// Send the current draft.
    ///
    /// Blank drafts are rejected with `None`. Otherwise the draft is analysed
    /// (reusing the background result when it is for this exact text),
    /// pending work is superseded, and the draft is cleared.
    pub async fn send(&mut self) -> Option<SentMessage> {
        if self.draft.trim().is_empty() {
            return None;
        }

        let analysis = match self.preview() {
            Some(snapshot) => snapshot.result,
            None => {
                let context = ErrorContext::new("send")
                    .with_sequence(self.debounce.current_sequence());
                self.orchestrator
                    .analyze_with_context(&self.draft, context)
                    .await
            }
        };

        self.debounce.cancel();
        let original = std::mem::take(&mut self.draft);

        let message = SentMessage {
            content_hash: content_hash(&original),
            delivered: analysis.transformed_text.clone(),
            original,
            analysis,
            sent_at: Utc::now(),
        };

        tracing::info!(
            content_hash = %message.content_hash,
            severity = %message.analysis.severity_level,
            transformed = message.analysis.needs_transformation,
            "Message sent"
        );

        self.history.push(message.clone());
        Some(message)
    }

    /// Discard the draft and any pending analysis.
    pub fn clear(&mut self) {
        self.draft.clear();
        self.debounce.cancel();
    }

    /// Everything sent so far, oldest first.
    pub fn history(&self) -> &[SentMessage] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::composer::Composer;
    use crate::debounce::{DebounceConfig, EditOutcome};
    use crate::engine::RuleBasedAnalyzer;
    use crate::models::{PatternType, Severity};
    use crate::pipeline::AnalysisOrchestrator;

    fn composer() -> Composer {
        let orch = AnalysisOrchestrator::rule_based_only(RuleBasedAnalyzer::with_seed(11));
        Composer::new(Arc::new(orch), DebounceConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn blank_draft_is_not_sent() {
        let mut c = composer();
        assert!(c.send().await.is_none());

        c.edit("   \n ");
        assert!(c.send().await.is_none());
        assert!(c.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn send_delivers_transformed_text() {
        let mut c = composer();
        assert!(matches!(c.edit("Você é um idiota, me liga"), EditOutcome::Scheduled(_)));

        let sent = c.send().await.expect("sent");
        assert_eq!(sent.original, "Você é um idiota, me liga");
        assert_eq!(sent.delivered, sent.analysis.transformed_text);
        assert!(!sent.delivered.to_lowercase().contains("idiota"));
        assert!(sent.analysis.detected_patterns.iter().any(|p| p.pattern_type == PatternType::Insult));

        assert_eq!(c.draft(), "");
        assert_eq!(c.history().len(), 1);
        assert_eq!(c.history()[0], sent);
    }

    #[tokio::test(start_paused = true)]
    async fn send_reuses_matching_preview() {
        let mut c = composer();
        c.edit("A culpa é sua");
        tokio::time::sleep(Duration::from_millis(400)).await;

        let preview = c.preview().expect("background analysis done");
        let sent = c.send().await.expect("sent");
        assert_eq!(sent.analysis, preview.result);
        assert_eq!(sent.analysis.severity_level, Severity::High);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_preview_is_not_reused() {
        let mut c = composer();
        c.edit("Tudo bem");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(c.preview().is_some());

        c.edit("Tudo bem, tanto faz");
        assert!(c.preview().is_none());

        let sent = c.send().await.expect("sent");
        assert_eq!(sent.original, "Tudo bem, tanto faz");
        assert_eq!(sent.analysis.severity_level, Severity::Medium);
    }

    #[tokio::test(start_paused = true)]
    async fn send_supersedes_pending_analysis() {
        let mut c = composer();
        let mut rx = c.subscribe();
        c.edit("Chego às 18h");
        c.send().await.expect("sent");

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(c.preview().is_none());
        assert!(rx.borrow_and_update().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_discards_draft() {
        let mut c = composer();
        c.edit("Rascunho qualquer");
        c.clear();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(c.draft(), "");
        assert!(c.preview().is_none());
        assert!(c.send().await.is_none());
    }
}
