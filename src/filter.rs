//! Pattern scan: rule table matches plus shouting and emphasis detectors.
//!
//! Every rule contributes at most one detected pattern per message, however
//! many times it matches.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::models::{DetectedPattern, EmotionProfile, PatternType, Severity};
use crate::rules::{apply_emotion, RuleTable};

/// Fraction of uppercase letters above which a message counts as shouting.
pub const SHOUTING_RATIO: f64 = 0.5;

static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[!?]{2,}").expect("emphasis regex must compile"));

/// Everything the rest of the engine needs from the scan.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub detected_patterns: Vec<DetectedPattern>,
    /// Matchers of the insult rules that hit, built-in or extra. The
    /// neutralizer deletes whatever they match.
    pub insult_matchers: Vec<Regex>,
    pub emotions: EmotionProfile,
    /// Maximum severity among `detected_patterns`, `Low` when empty.
    pub severity: Severity,
    pub shouting: bool,
    pub emphasis: bool,
}

impl ScanOutcome {
    pub fn needs_transformation(&self) -> bool {
        !self.detected_patterns.is_empty() || self.severity != Severity::Low
    }

    fn push(&mut self, pattern: DetectedPattern) {
        apply_emotion(&mut self.emotions, &pattern.pattern_type);
        self.severity = self.severity.max(pattern.severity);
        self.detected_patterns.push(pattern);
    }
}

/// Scans text against a compiled rule table.
#[derive(Debug, Clone)]
pub struct PatternScanner {
    table: Arc<RuleTable>,
}

impl PatternScanner {
    pub fn new(table: Arc<RuleTable>) -> Self {
        Self { table }
    }

    /// Scanner over the built-in rules only.
    pub fn builtin() -> Self {
        Self::new(RuleTable::builtin())
    }

    pub fn scan(&self, text: &str) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();

        for rule in self.table.matching(text) {
            let evidence = rule.matcher.find(text).map(|m| m.as_str().to_string());
            if rule.category == PatternType::Insult {
                outcome.insult_matchers.push(rule.matcher.clone());
            }
            outcome.push(DetectedPattern {
                pattern_type: rule.category.clone(),
                severity: rule.severity,
                evidence,
            });
        }

        if uppercase_ratio(text) > SHOUTING_RATIO {
            outcome.shouting = true;
            outcome.push(DetectedPattern::new(PatternType::Shouting, Severity::Medium));
        }

        if has_emphasis(text) {
            outcome.emphasis = true;
            outcome.push(DetectedPattern::new(PatternType::Emphasis, Severity::Low));
        }

        outcome
    }
}

impl Default for PatternScanner {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Uppercase letters over all letters. Text without letters yields 0.
pub fn uppercase_ratio(text: &str) -> f64 {
    let (letters, upper) = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(letters, upper), c| {
            (letters + 1, upper + usize::from(c.is_uppercase()))
        });

    if letters == 0 {
        return 0.0;
    }
    upper as f64 / letters as f64
}

/// Two or more consecutive `!` or `?`.
pub fn has_emphasis(text: &str) -> bool {
    EMPHASIS.is_match(text)
}
