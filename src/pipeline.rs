//! Analysis orchestration.
//!
//! Composes the remote strategy and the rule-based analyzer into a single
//! total `analyze`: remote first when configured, rule-based fallback on any
//! remote failure.

use std::sync::Arc;

use crate::analyzer::{GeminiClient, RemoteAnalyzer};
use crate::config::MediatorConfig;
use crate::engine::{RuleBasedAnalyzer, TextAnalyzer};
use crate::error::{ErrorContext, Result};
use crate::models::{content_hash, AnalysisResult, AnalysisSource, Severity};
use crate::phrases::{FALLBACK_EMERGENCY_RECOMMENDATION, FALLBACK_SAFETY_WARNING};

/// Status banner text when the remote strategy is active.
pub const REMOTE_STATUS: &str = "IA ativa: análise avançada habilitada";
/// Status banner text when only the rule-based analyzer runs.
pub const SIMULATION_STATUS: &str = "Modo simulação: análise local por regras";

/// Remote-then-rule-based orchestrator. Never fails.
pub struct AnalysisOrchestrator {
    /// Remote strategy, if one was configured.
    remote: Option<Arc<dyn TextAnalyzer>>,
    /// Final fallback; total.
    rule_based: Arc<RuleBasedAnalyzer>,
}

impl AnalysisOrchestrator {
    pub fn new(remote: Option<Arc<dyn TextAnalyzer>>, rule_based: RuleBasedAnalyzer) -> Self {
        Self {
            remote,
            rule_based: Arc::new(rule_based),
        }
    }

    /// Orchestrator with no remote strategy.
    pub fn rule_based_only(rule_based: RuleBasedAnalyzer) -> Self {
        Self::new(None, rule_based)
    }

    /// Wire up both strategies from configuration.
    ///
    /// A missing API key is not an error: the remote strategy is simply left
    /// out. Extra rules that fail to compile are.
    pub fn from_config(config: &MediatorConfig) -> Result<Self> {
        let rule_based = RuleBasedAnalyzer::with_table(config.rule_table()?);

        let remote: Option<Arc<dyn TextAnalyzer>> = match &config.gemini_api_key {
            Some(key) => {
                let client = GeminiClient::new(
                    Some(key.clone()),
                    config.gemini_model.clone(),
                    config.remote_timeout,
                    config.remote_requests_per_minute,
                )?;
                tracing::info!(model = %client.model(), "Remote analyzer enabled");
                Some(Arc::new(RemoteAnalyzer::new(client)))
            }
            None => {
                tracing::info!("No Gemini API key configured, running in simulation mode");
                None
            }
        };

        Ok(Self::new(remote, rule_based))
    }

    /// Whether a remote attempt will be made.
    pub fn is_remote_available(&self) -> bool {
        self.remote.as_ref().is_some_and(|r| r.is_available())
    }

    pub fn status_message(&self) -> &'static str {
        if self.is_remote_available() {
            REMOTE_STATUS
        } else {
            SIMULATION_STATUS
        }
    }

    /// Analyze `text`. The remote strategy is attempted at most once.
    pub async fn analyze(&self, text: &str) -> AnalysisResult {
        self.analyze_with_context(text, ErrorContext::new("analyze"))
            .await
    }

    /// Analyze with a caller-supplied logging context (debounce sequence, etc).
    pub async fn analyze_with_context(&self, text: &str, context: ErrorContext) -> AnalysisResult {
        let context = context.with_content_hash(content_hash(text));

        if let Some(remote) = self.remote.as_ref().filter(|r| r.is_available()) {
            match remote.analyze(text).await {
                Ok(result) => return result,
                Err(e) => e.log_with_context(&context),
            }
        }

        self.fallback(text, &context)
    }

    fn fallback(&self, text: &str, context: &ErrorContext) -> AnalysisResult {
        let mut result = self.rule_based.analyze_text(text);
        result.source = AnalysisSource::Simulation;

        if result.severity_level == Severity::Critical {
            result.safety_warning = Some(FALLBACK_SAFETY_WARNING.to_string());
            result.emergency_recommendation = Some(FALLBACK_EMERGENCY_RECOMMENDATION.to_string());
        }

        tracing::debug!(
            request_id = %context.request_id,
            sequence = ?context.sequence,
            severity = %result.severity_level,
            "Rule-based fallback used"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use crate::analyzer::tests::{MockBackend, VALID_REPLY};
    use crate::analyzer::RemoteAnalyzer;
    use crate::config::MediatorConfig;
    use crate::engine::{RuleBasedAnalyzer, TextAnalyzer};
    use crate::error::MediatorError;
    use crate::models::{AnalysisSource, PatternType, Severity};
    use crate::phrases::{FALLBACK_EMERGENCY_RECOMMENDATION, FALLBACK_SAFETY_WARNING};
    use crate::pipeline::{AnalysisOrchestrator, REMOTE_STATUS, SIMULATION_STATUS};

    fn orchestrator(backend: MockBackend) -> (AnalysisOrchestrator, Arc<RemoteAnalyzer<MockBackend>>) {
        let remote = Arc::new(RemoteAnalyzer::new(backend));
        let as_dyn: Arc<dyn TextAnalyzer> = remote.clone();
        (
            AnalysisOrchestrator::new(Some(as_dyn), RuleBasedAnalyzer::with_seed(7)),
            remote,
        )
    }

    #[tokio::test]
    async fn remote_result_is_used() {
        let (orch, remote) = orchestrator(MockBackend::replying(VALID_REPLY));
        assert!(orch.is_remote_available());
        assert_eq!(orch.status_message(), REMOTE_STATUS);

        let result = orch.analyze("Você vai se arrepender").await;
        assert_eq!(result.source, AnalysisSource::Remote);
        assert_eq!(remote.backend().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unavailable_remote_is_skipped() {
        let (orch, remote) = orchestrator(MockBackend::unavailable());
        assert!(!orch.is_remote_available());
        assert_eq!(orch.status_message(), SIMULATION_STATUS);

        let result = orch.analyze("Tudo certo para sábado?").await;
        assert_eq!(result.source, AnalysisSource::Simulation);
        assert_eq!(remote.backend().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn call_error_falls_back_within_same_call() {
        let (orch, remote) =
            orchestrator(MockBackend::failing(MediatorError::RemoteCall("HTTP 500".to_string())));

        let result = orch.analyze("Você é um idiota").await;
        assert_eq!(result.source, AnalysisSource::Simulation);
        assert!(result.has_pattern(&PatternType::Insult));
        assert_eq!(remote.backend().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_reply_falls_back() {
        let (orch, _) = orchestrator(MockBackend::replying("Desculpe, não consigo ajudar."));
        let result = orch.analyze("tanto faz").await;
        assert_eq!(result.source, AnalysisSource::Simulation);
        assert_eq!(result.severity_level, Severity::Medium);
    }

    #[tokio::test]
    async fn config_without_key_runs_simulation() {
        let orch = AnalysisOrchestrator::from_config(&MediatorConfig::default()).expect("orch");
        assert!(!orch.is_remote_available());
        assert_eq!(orch.status_message(), SIMULATION_STATUS);

        let result = orch.analyze("Você nunca ajuda").await;
        assert_eq!(result.source, AnalysisSource::Simulation);
    }

    #[test]
    fn config_with_key_enables_remote() {
        let config = MediatorConfig {
            gemini_api_key: Some("test-key".to_string()),
            ..MediatorConfig::default()
        };
        let orch = AnalysisOrchestrator::from_config(&config).expect("orch");
        assert!(orch.is_remote_available());
        assert_eq!(orch.status_message(), REMOTE_STATUS);
    }

    #[tokio::test]
    async fn critical_fallback_gets_escalation_text() {
        let orch = AnalysisOrchestrator::rule_based_only(RuleBasedAnalyzer::with_seed(1));
        let result = orch.analyze("Você vai se arrepender disso").await;

        assert_eq!(result.severity_level, Severity::Critical);
        assert_eq!(result.safety_warning.as_deref(), Some(FALLBACK_SAFETY_WARNING));
        assert_eq!(
            result.emergency_recommendation.as_deref(),
            Some(FALLBACK_EMERGENCY_RECOMMENDATION)
        );
    }

    #[tokio::test]
    async fn non_critical_fallback_has_no_escalation_text() {
        let orch = AnalysisOrchestrator::rule_based_only(RuleBasedAnalyzer::with_seed(1));
        let result = orch.analyze("A culpa é sua").await;

        assert_eq!(result.severity_level, Severity::High);
        assert!(result.safety_warning.is_none());
        assert!(result.emergency_recommendation.is_none());
    }
}
