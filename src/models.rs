//! Core data models for the mediator engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Ordered severity tier: `low < medium < high < critical`.
///
/// Combining severities always takes the maximum observed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// High and critical messages get mediation suggestions and a reminder.
    pub fn is_escalated(&self) -> bool {
        *self >= Severity::High
    }

    /// Badge color used by the composer preview.
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Low => "#10B981",
            Severity::Medium => "#F59E0B",
            Severity::High => "#EF4444",
            Severity::Critical => "#991B1B",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Holistic emotional classification of a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Calm,
    SlightlyTense,
    Tense,
    Hostile,
    VeryHostile,
    /// Only assigned by the remote strategy.
    Abusive,
}

impl Tone {
    /// Map an aggregated emotion score to a tone.
    ///
    /// ```
    /// use mediator::models::Tone;
    ///
    /// assert_eq!(Tone::from_emotion_total(0), Tone::Calm);
    /// assert_eq!(Tone::from_emotion_total(2), Tone::SlightlyTense);
    /// assert_eq!(Tone::from_emotion_total(5), Tone::Tense);
    /// assert_eq!(Tone::from_emotion_total(8), Tone::Hostile);
    /// assert_eq!(Tone::from_emotion_total(9), Tone::VeryHostile);
    /// ```
    pub fn from_emotion_total(total: u32) -> Self {
        match total {
            0 => Tone::Calm,
            1..=2 => Tone::SlightlyTense,
            3..=5 => Tone::Tense,
            6..=8 => Tone::Hostile,
            _ => Tone::VeryHostile,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Calm => "calm",
            Tone::SlightlyTense => "slightly_tense",
            Tone::Tense => "tense",
            Tone::Hostile => "hostile",
            Tone::VeryHostile => "very_hostile",
            Tone::Abusive => "abusive",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Tone::Calm => "😊",
            Tone::SlightlyTense => "😐",
            Tone::Tense => "😟",
            Tone::Hostile => "😠",
            Tone::VeryHostile => "🤬",
            Tone::Abusive => "🚨",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tone::Calm => "Calmo",
            Tone::SlightlyTense => "Leve tensão",
            Tone::Tense => "Tenso",
            Tone::Hostile => "Hostil",
            Tone::VeryHostile => "Muito hostil",
            Tone::Abusive => "Abusivo",
        }
    }
}

/// Category tag of a detected pattern.
///
/// Open set: unknown tags (from the remote analyzer or extra rule files)
/// are kept verbatim in [`PatternType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PatternType {
    Accusation,
    Insult,
    Manipulation,
    Blame,
    Sarcasm,
    Threat,
    Ultimatum,
    Generalization,
    Dismissive,
    Shouting,
    Emphasis,
    Gaslighting,
    Control,
    Custom(String),
}

impl PatternType {
    pub fn as_str(&self) -> &str {
        match self {
            PatternType::Accusation => "accusation",
            PatternType::Insult => "insult",
            PatternType::Manipulation => "manipulation",
            PatternType::Blame => "blame",
            PatternType::Sarcasm => "sarcasm",
            PatternType::Threat => "threat",
            PatternType::Ultimatum => "ultimatum",
            PatternType::Generalization => "generalization",
            PatternType::Dismissive => "dismissive",
            PatternType::Shouting => "shouting",
            PatternType::Emphasis => "emphasis",
            PatternType::Gaslighting => "gaslighting",
            PatternType::Control => "control",
            PatternType::Custom(tag) => tag,
        }
    }
}

impl From<&str> for PatternType {
    fn from(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "accusation" => PatternType::Accusation,
            "insult" => PatternType::Insult,
            "manipulation" => PatternType::Manipulation,
            "blame" => PatternType::Blame,
            "sarcasm" => PatternType::Sarcasm,
            "threat" => PatternType::Threat,
            "ultimatum" => PatternType::Ultimatum,
            "generalization" => PatternType::Generalization,
            "dismissive" => PatternType::Dismissive,
            "shouting" => PatternType::Shouting,
            "emphasis" => PatternType::Emphasis,
            "gaslighting" => PatternType::Gaslighting,
            "control" => PatternType::Control,
            other => PatternType::Custom(other.to_string()),
        }
    }
}

impl From<String> for PatternType {
    fn from(tag: String) -> Self {
        PatternType::from(tag.as_str())
    }
}

impl From<PatternType> for String {
    fn from(pattern_type: PatternType) -> Self {
        pattern_type.as_str().to_string()
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of `detectedPatterns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedPattern {
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

impl DetectedPattern {
    pub fn new(pattern_type: PatternType, severity: Severity) -> Self {
        Self {
            pattern_type,
            severity,
            evidence: None,
        }
    }
}

/// Accumulated per-dimension emotion scores for one message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionProfile {
    pub anger: u32,
    pub frustration: u32,
    pub sarcasm: u32,
    pub manipulation: u32,
    pub dismissiveness: u32,
}

impl EmotionProfile {
    pub fn total(&self) -> u32 {
        self.anger + self.frustration + self.sarcasm + self.manipulation + self.dismissiveness
    }
}

/// Escalation warning shown above the preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub level: Severity,
    pub message: String,
}

impl Warning {
    pub fn new(level: Severity, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Kind of actionable suggestion. Open set like [`PatternType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SuggestionKind {
    Alternative,
    Practical,
    Mediation,
    ChildFocus,
    Safety,
    Other(String),
}

impl SuggestionKind {
    pub fn as_str(&self) -> &str {
        match self {
            SuggestionKind::Alternative => "alternative",
            SuggestionKind::Practical => "practical",
            SuggestionKind::Mediation => "mediation",
            SuggestionKind::ChildFocus => "child_focus",
            SuggestionKind::Safety => "safety",
            SuggestionKind::Other(kind) => kind,
        }
    }
}

impl From<String> for SuggestionKind {
    fn from(kind: String) -> Self {
        match kind.trim().to_lowercase().as_str() {
            "alternative" => SuggestionKind::Alternative,
            "practical" => SuggestionKind::Practical,
            "mediation" => SuggestionKind::Mediation,
            "child_focus" => SuggestionKind::ChildFocus,
            "safety" => SuggestionKind::Safety,
            _ => SuggestionKind::Other(kind),
        }
    }
}

impl From<SuggestionKind> for String {
    fn from(kind: SuggestionKind) -> Self {
        kind.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub text: String,
    #[serde(default)]
    pub icon: String,
}

impl Suggestion {
    pub fn new(kind: SuggestionKind, text: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            icon: icon.into(),
        }
    }
}

/// Which strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisSource {
    /// Rule-based analyzer used directly.
    #[serde(rename = "rule-based")]
    RuleBased,
    /// Remote generative classifier.
    #[serde(rename = "remote")]
    Remote,
    /// Rule-based analyzer used by the orchestrator in place of the remote one.
    #[serde(rename = "simulation")]
    Simulation,
}

/// Engine output for one drafted message. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub severity_level: Severity,
    pub overall_tone: Tone,
    pub detected_patterns: Vec<DetectedPattern>,
    pub emotions: EmotionProfile,
    pub needs_transformation: bool,
    pub is_abusive_content: bool,
    pub transformed_text: String,
    pub warnings: Vec<Warning>,
    pub suggestions: Vec<Suggestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_recommendation: Option<String>,
    pub source: AnalysisSource,
}

/// Warning attached when an analysis could not be produced at all.
pub const PROCESSING_FAILURE_WARNING: &str = "Erro ao processar mensagem. Tente novamente.";

impl AnalysisResult {
    /// Identity result used when analysis itself failed: the draft is sent
    /// as written, with a "try again" warning.
    pub fn processing_failure(text: &str) -> Self {
        Self {
            severity_level: Severity::Low,
            overall_tone: Tone::Calm,
            detected_patterns: Vec::new(),
            emotions: EmotionProfile::default(),
            needs_transformation: false,
            is_abusive_content: false,
            transformed_text: text.to_string(),
            warnings: vec![Warning::new(Severity::Medium, PROCESSING_FAILURE_WARNING)],
            suggestions: Vec::new(),
            safety_warning: None,
            emergency_recommendation: None,
            source: AnalysisSource::Simulation,
        }
    }

    pub fn has_pattern(&self, pattern_type: &PatternType) -> bool {
        self.detected_patterns
            .iter()
            .any(|p| &p.pattern_type == pattern_type)
    }

    pub fn has_warning_at(&self, level: Severity) -> bool {
        self.warnings.iter().any(|w| w.level == level)
    }
}

/// SHA-256 hex digest of a message, used to refer to drafts in logs.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_total_order() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(
            [Severity::Medium, Severity::Critical, Severity::Low]
                .into_iter()
                .max(),
            Some(Severity::Critical)
        );
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Severity::Critical).unwrap(),
            "\"critical\""
        );
        let parsed: Severity = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, Severity::Medium);
        assert!(serde_json::from_str::<Severity>("\"severe\"").is_err());
    }

    #[test]
    fn tone_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Tone::VeryHostile).unwrap(),
            "\"very_hostile\""
        );
        let parsed: Tone = serde_json::from_str("\"slightly_tense\"").unwrap();
        assert_eq!(parsed, Tone::SlightlyTense);
    }

    #[test]
    fn tone_thresholds() {
        assert_eq!(Tone::from_emotion_total(1), Tone::SlightlyTense);
        assert_eq!(Tone::from_emotion_total(3), Tone::Tense);
        assert_eq!(Tone::from_emotion_total(6), Tone::Hostile);
        assert_eq!(Tone::from_emotion_total(40), Tone::VeryHostile);
    }

    #[test]
    fn pattern_type_known_and_custom_tags() {
        assert_eq!(PatternType::from("threat"), PatternType::Threat);
        assert_eq!(PatternType::from("Gaslighting"), PatternType::Gaslighting);
        assert_eq!(
            PatternType::from("isolation"),
            PatternType::Custom("isolation".to_string())
        );

        let json = serde_json::to_string(&PatternType::Custom("isolation".to_string())).unwrap();
        assert_eq!(json, "\"isolation\"");
    }

    #[test]
    fn detected_pattern_uses_type_key() {
        let pattern = DetectedPattern::new(PatternType::Insult, Severity::Critical);
        let json = serde_json::to_value(&pattern).unwrap();
        assert_eq!(json["type"], "insult");
        assert_eq!(json["severity"], "critical");
        assert!(json.get("evidence").is_none());
    }

    #[test]
    fn suggestion_kind_child_focus_tag() {
        let suggestion = Suggestion::new(SuggestionKind::ChildFocus, "texto", "👶");
        let json = serde_json::to_value(&suggestion).unwrap();
        assert_eq!(json["type"], "child_focus");
    }

    #[test]
    fn analysis_source_tags() {
        assert_eq!(
            serde_json::to_string(&AnalysisSource::RuleBased).unwrap(),
            "\"rule-based\""
        );
        assert_eq!(
            serde_json::to_string(&AnalysisSource::Simulation).unwrap(),
            "\"simulation\""
        );
    }

    #[test]
    fn processing_failure_is_identity() {
        let result = AnalysisResult::processing_failure("Preciso falar sobre sábado");
        assert_eq!(result.transformed_text, "Preciso falar sobre sábado");
        assert!(!result.needs_transformation);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].message, PROCESSING_FAILURE_WARNING);
    }

    #[test]
    fn analysis_result_serializes_camel_case() {
        let result = AnalysisResult::processing_failure("oi");
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("severityLevel").is_some());
        assert!(json.get("transformedText").is_some());
        assert!(json.get("needsTransformation").is_some());
        assert!(json.get("safetyWarning").is_none());
    }

    #[test]
    fn content_hash_is_stable_hex() {
        let a = content_hash("mensagem");
        let b = content_hash("mensagem");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, content_hash("outra mensagem"));
    }
}
