//! Analysis strategies and the deterministic rule-based analyzer.
//!
//! `RuleBasedAnalyzer` never fails and never touches the network: scan,
//! classify tone, neutralize, then attach warnings and suggestions.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::Result;
use crate::filter::PatternScanner;
use crate::guidance;
use crate::models::{content_hash, AnalysisResult, AnalysisSource, PatternType, Tone};
use crate::neutralizer::neutralize;
use crate::rules::RuleTable;

/// A strategy that turns a draft into an [`AnalysisResult`].
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Whether this strategy can currently be attempted.
    fn is_available(&self) -> bool {
        true
    }

    async fn analyze(&self, text: &str) -> Result<AnalysisResult>;
}

/// Local, synchronous, total analyzer.
///
/// Phrase selection (greeting, reminder, child-focus suggestion) draws from an
/// internal RNG; seed it with [`RuleBasedAnalyzer::with_seed`] for
/// reproducible output.
pub struct RuleBasedAnalyzer {
    scanner: PatternScanner,
    rng: Mutex<StdRng>,
}

impl RuleBasedAnalyzer {
    pub fn new() -> Self {
        Self::with_parts(RuleTable::builtin(), StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_parts(RuleTable::builtin(), StdRng::seed_from_u64(seed))
    }

    /// Analyzer over a custom table (built-in plus extra rules, usually).
    pub fn with_table(table: Arc<RuleTable>) -> Self {
        Self::with_parts(table, StdRng::from_entropy())
    }

    fn with_parts(table: Arc<RuleTable>, rng: StdRng) -> Self {
        Self {
            scanner: PatternScanner::new(table),
            rng: Mutex::new(rng),
        }
    }

    /// Analyze `text`. Always produces a result.
    pub fn analyze_text(&self, text: &str) -> AnalysisResult {
        let outcome = self.scanner.scan(text);
        let overall_tone = Tone::from_emotion_total(outcome.emotions.total());
        let is_abusive_content = outcome.detected_patterns.iter().any(|p| {
            matches!(
                p.pattern_type,
                PatternType::Threat | PatternType::Gaslighting
            )
        });

        let (transformed_text, suggestions) = {
            // A poisoned lock only means another thread panicked mid-pick;
            // the RNG state is still usable.
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            let transformed = neutralize(text, &outcome, &mut *rng);
            let suggestions = guidance::suggestions(text, outcome.severity, &mut *rng);
            (transformed, suggestions)
        };

        let warnings = guidance::warnings(&outcome);

        tracing::debug!(
            content_hash = %content_hash(text),
            severity = %outcome.severity,
            tone = overall_tone.as_str(),
            patterns = outcome.detected_patterns.len(),
            "Rule-based analysis complete"
        );

        AnalysisResult {
            severity_level: outcome.severity,
            overall_tone,
            needs_transformation: outcome.needs_transformation(),
            detected_patterns: outcome.detected_patterns,
            emotions: outcome.emotions,
            is_abusive_content,
            transformed_text,
            warnings,
            suggestions,
            safety_warning: None,
            emergency_recommendation: None,
            source: AnalysisSource::RuleBased,
        }
    }
}

impl Default for RuleBasedAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextAnalyzer for RuleBasedAnalyzer {
    fn name(&self) -> &'static str {
        "rule-based"
    }

    async fn analyze(&self, text: &str) -> Result<AnalysisResult> {
        Ok(self.analyze_text(text))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::engine::{RuleBasedAnalyzer, TextAnalyzer};
    use crate::models::{AnalysisSource, PatternType, Severity, SuggestionKind, Tone};
    use crate::phrases::{CRITICAL_WARNING, THREAT_WARNING};
    use crate::rules::{RuleConfig, RuleTable};

    #[test]
    fn clean_message_is_calm() {
        let result = RuleBasedAnalyzer::with_seed(1)
            .analyze_text("Vou levar as crianças na escola amanhã às 8h, tudo certo para você?");

        assert_eq!(result.severity_level, Severity::Low);
        assert_eq!(result.overall_tone, Tone::Calm);
        assert!(result.detected_patterns.is_empty());
        assert!(!result.needs_transformation);
        assert!(!result.is_abusive_content);
        assert!(result.warnings.is_empty());
        assert_eq!(result.source, AnalysisSource::RuleBased);
        assert_eq!(
            result.suggestions.last().map(|s| &s.kind),
            Some(&SuggestionKind::ChildFocus)
        );
    }

    #[test]
    fn insult_is_critical_and_removed() {
        let result = RuleBasedAnalyzer::with_seed(2)
            .analyze_text("Você é um idiota, não sabe nem cuidar de uma criança");

        assert_eq!(result.severity_level, Severity::Critical);
        assert!(result.has_pattern(&PatternType::Insult));
        assert!(result.needs_transformation);
        assert!(!result.transformed_text.to_lowercase().contains("idiota"));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.level == Severity::Critical && w.message == CRITICAL_WARNING));
        assert!(result
            .suggestions
            .iter()
            .any(|s| s.kind == SuggestionKind::Mediation));
    }

    #[test]
    fn threat_is_abusive_with_threat_warning() {
        let result = RuleBasedAnalyzer::with_seed(3)
            .analyze_text("Vou te processar e você nunca mais vai ver as crianças");

        assert_eq!(result.severity_level, Severity::Critical);
        assert!(result.is_abusive_content);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.message == THREAT_WARNING));
        assert!(!result.transformed_text.contains("processar"));
    }

    #[test]
    fn shouting_scenario() {
        let text = "VOCÊ NUNCA ESTÁ DISPONÍVEL! Sempre a mesma desculpa!";
        let result = RuleBasedAnalyzer::with_seed(4).analyze_text(text);

        assert!(result.has_pattern(&PatternType::Shouting));
        assert!(result.has_pattern(&PatternType::Generalization));
        assert!(result.has_pattern(&PatternType::Accusation));
        assert_eq!(result.severity_level, Severity::Medium);
        assert_eq!(result.overall_tone, Tone::Hostile);
        assert!(result.needs_transformation);
        assert_ne!(result.transformed_text, result.transformed_text.to_uppercase());
        assert!(!result.transformed_text.contains("!!"));
        assert_eq!(result.emotions.anger, 2);
        assert_eq!(result.emotions.frustration, 4);
    }

    #[test]
    fn extra_insult_rule_is_stripped() {
        let extra = vec![RuleConfig {
            pattern: r"\bpalhaço\b".to_string(),
            severity: Severity::Critical,
            category: PatternType::Insult,
        }];
        let table = Arc::new(RuleTable::with_extra(&extra).expect("extra rules compile"));
        let result = RuleBasedAnalyzer::with_table(table)
            .analyze_text("Você é um palhaço, me liga amanhã");

        assert_eq!(result.severity_level, Severity::Critical);
        assert!(result.has_pattern(&PatternType::Insult));
        assert!(!result.transformed_text.to_lowercase().contains("palhaço"));
        assert!(!result.transformed_text.contains("Você é um"));
        assert!(result.transformed_text.contains("Me liga amanhã."));
    }

    #[test]
    fn seeded_analyzers_agree() {
        let text = "A culpa é sua, quando você vai buscar o Pedro?";
        let a = RuleBasedAnalyzer::with_seed(99).analyze_text(text);
        let b = RuleBasedAnalyzer::with_seed(99).analyze_text(text);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn trait_analyze_never_fails() {
        let analyzer = RuleBasedAnalyzer::with_seed(5);
        assert!(analyzer.is_available());
        assert_eq!(analyzer.name(), "rule-based");
        let result = analyzer.analyze("").await.expect("rule-based is total");
        assert_eq!(result.transformed_text, "");
        assert_eq!(result.severity_level, Severity::Low);
    }
}
