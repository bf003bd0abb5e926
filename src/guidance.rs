//! Suggestions and escalation warnings for a scanned message.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

use crate::filter::ScanOutcome;
use crate::models::{PatternType, Severity, Suggestion, SuggestionKind, Warning};
use crate::phrases::{
    pick, CHILD_FOCUS_PHRASES, CRITICAL_WARNING, HIGH_WARNING, LOGISTICS_SUGGESTION,
    MANIPULATION_WARNING, MEDIATION_SUGGESTION, MEDIUM_WARNING, SCHEDULING_SUGGESTION,
    THREAT_WARNING,
};

/// Manipulation score above which the manipulation warning is added.
pub const MANIPULATION_WARNING_THRESHOLD: u32 = 2;

static SCHEDULING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:quando|horários?|dias?|horas?)\b").expect("scheduling regex must compile")
});

static LOGISTICS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:buscar|levar|pegar|deixar)\b").expect("logistics regex must compile")
});

/// Build the suggestion list for `text`.
///
/// Order: scheduling, logistics, mediation (escalated only), and always one
/// child-focus phrase last.
pub fn suggestions<R: Rng + ?Sized>(text: &str, severity: Severity, rng: &mut R) -> Vec<Suggestion> {
    let mut out = Vec::with_capacity(4);

    if SCHEDULING.is_match(text) {
        out.push(Suggestion::new(
            SuggestionKind::Alternative,
            SCHEDULING_SUGGESTION,
            "📅",
        ));
    }

    if LOGISTICS.is_match(text) {
        out.push(Suggestion::new(
            SuggestionKind::Practical,
            LOGISTICS_SUGGESTION,
            "🗓️",
        ));
    }

    if severity.is_escalated() {
        out.push(Suggestion::new(
            SuggestionKind::Mediation,
            MEDIATION_SUGGESTION,
            "🤝",
        ));
    }

    out.push(Suggestion::new(
        SuggestionKind::ChildFocus,
        pick(CHILD_FOCUS_PHRASES, rng),
        "👶",
    ));

    out
}

/// Build the warning list from a scan.
pub fn warnings(outcome: &ScanOutcome) -> Vec<Warning> {
    let mut out = Vec::new();

    match outcome.severity {
        Severity::Critical => out.push(Warning::new(Severity::Critical, CRITICAL_WARNING)),
        Severity::High => out.push(Warning::new(Severity::High, HIGH_WARNING)),
        Severity::Medium => out.push(Warning::new(Severity::Medium, MEDIUM_WARNING)),
        Severity::Low => {}
    }

    if outcome
        .detected_patterns
        .iter()
        .any(|p| p.pattern_type == PatternType::Threat)
    {
        out.push(Warning::new(Severity::Critical, THREAT_WARNING));
    }

    if outcome.emotions.manipulation > MANIPULATION_WARNING_THRESHOLD {
        out.push(Warning::new(Severity::High, MANIPULATION_WARNING));
    }

    out
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::filter::PatternScanner;
    use crate::guidance::{suggestions, warnings};
    use crate::models::{Severity, SuggestionKind};
    use crate::phrases::{
        CHILD_FOCUS_PHRASES, CRITICAL_WARNING, MANIPULATION_WARNING, MEDIUM_WARNING,
        THREAT_WARNING,
    };

    fn kinds(text: &str, severity: Severity) -> Vec<SuggestionKind> {
        suggestions(text, severity, &mut StdRng::seed_from_u64(9))
            .into_iter()
            .map(|s| s.kind)
            .collect()
    }

    #[test]
    fn child_focus_always_last() {
        let list = suggestions("ok", Severity::Low, &mut StdRng::seed_from_u64(1));
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].kind, SuggestionKind::ChildFocus);
        assert_eq!(list[0].icon, "👶");
        assert!(CHILD_FOCUS_PHRASES.contains(&list[0].text.as_str()));
    }

    #[test]
    fn scheduling_and_logistics_order() {
        assert_eq!(
            kinds("Quando você vai buscar as crianças?", Severity::Low),
            vec![
                SuggestionKind::Alternative,
                SuggestionKind::Practical,
                SuggestionKind::ChildFocus,
            ]
        );
    }

    #[test]
    fn mediation_only_when_escalated() {
        assert!(!kinds("tanto faz", Severity::Medium).contains(&SuggestionKind::Mediation));
        assert!(kinds("a culpa é sua", Severity::High).contains(&SuggestionKind::Mediation));
        assert!(kinds("idiota", Severity::Critical).contains(&SuggestionKind::Mediation));
    }

    #[test]
    fn scheduling_respects_word_boundaries() {
        // "diagnóstico" contains "dia" but is not about scheduling
        assert!(!kinds("Saiu o diagnóstico", Severity::Low).contains(&SuggestionKind::Alternative));
    }

    #[test]
    fn clean_scan_has_no_warnings() {
        let outcome = PatternScanner::builtin().scan("Combinado, até sábado.");
        assert!(warnings(&outcome).is_empty());
    }

    #[test]
    fn medium_tier_warning() {
        let outcome = PatternScanner::builtin().scan("tanto faz");
        let list = warnings(&outcome);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].level, Severity::Medium);
        assert_eq!(list[0].message, MEDIUM_WARNING);
    }

    #[test]
    fn threat_adds_dedicated_warning() {
        let outcome = PatternScanner::builtin().scan("Você vai se arrepender disso");
        let list = warnings(&outcome);
        assert_eq!(list[0].message, CRITICAL_WARNING);
        assert!(list
            .iter()
            .any(|w| w.level == Severity::Critical && w.message == THREAT_WARNING));
    }

    #[test]
    fn manipulation_warning_above_threshold() {
        let outcome = PatternScanner::builtin().scan("Depois de tudo que eu fiz por você");
        assert_eq!(outcome.emotions.manipulation, 3);
        assert!(warnings(&outcome)
            .iter()
            .any(|w| w.level == Severity::High && w.message == MANIPULATION_WARNING));

        let control_only = PatternScanner::builtin().scan("Vai ser do meu jeito");
        assert_eq!(control_only.emotions.manipulation, 2);
        assert!(!warnings(&control_only)
            .iter()
            .any(|w| w.message == MANIPULATION_WARNING));
    }
}
