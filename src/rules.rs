//! Pattern rule table.
//!
//! The built-in rules are fixed domain knowledge for Brazilian Portuguese
//! co-parenting conversations. A deployment may append extra rules from a
//! JSON file at startup; after construction the table is read-only.

use std::sync::{Arc, LazyLock};

use regex::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{EmotionProfile, PatternType, Severity};

/// A compiled rule: matcher, severity and category.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub matcher: Regex,
    pub severity: Severity,
    pub category: PatternType,
}

/// Uncompiled rule as written in configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub pattern: String,
    pub severity: Severity,
    pub category: PatternType,
}

impl RuleConfig {
    fn builtin(pattern: &str, severity: Severity, category: PatternType) -> Self {
        Self {
            pattern: pattern.to_string(),
            severity,
            category,
        }
    }
}

/// Built-in rules, in evaluation order.
pub fn builtin_rules() -> Vec<RuleConfig> {
    use PatternType::*;
    use Severity::*;

    vec![
        RuleConfig::builtin(
            r"\b(?:idiota|imbecil|estúpid[oa]s?|burr[oa]s?|otári[oa]s?|babaca|inútil|incompetente|ridícul[oa]|egoísta)\b",
            Critical,
            Insult,
        ),
        RuleConfig::builtin(
            r"\bvocê\s+(?:está|é|tá)\s+(?:louc[oa]|doid[oa]|maluc[oa])\b|\bvocê\s+inventa\b|\bisso\s+nunca\s+aconteceu\b|\bvocê\s+está\s+imaginando\s+coisas\b",
            Critical,
            Gaslighting,
        ),
        RuleConfig::builtin(
            r"\bvai\s+se\s+arrepender\b|\bvocê\s+vai\s+ver\b|\bvou\s+(?:te\s+)?(?:processar|denunciar)\b|\bvou\s+acabar\s+com\b|\bnunca\s+mais\s+vai\s+ver\s+(?:as\s+crianças|os\s+filhos|o\s+filho|a\s+filha)\b",
            Critical,
            Threat,
        ),
        RuleConfig::builtin(r"\bse\s+você\s+não\b[^.!?]*?\bvou\b", High, Ultimatum),
        RuleConfig::builtin(
            r"\bou\s+então\b|\bsenão\b|\bé\s+a\s+última\s+(?:vez|chance)\b",
            High,
            Ultimatum,
        ),
        RuleConfig::builtin(
            r"\bse\s+você\s+(?:me\s+)?amasse\b|\bdepois\s+de\s+tudo\s+(?:o\s+)?que\s+eu\s+fiz\b|\bas\s+crianças\s+(?:vão\s+)?sofre[mr]?\s+por\s+(?:sua|tua)\s+causa\b|\bvocê\s+me\s+deve\b",
            High,
            Manipulation,
        ),
        RuleConfig::builtin(
            r"\bquando\s+eu\s+quiser\b|\bdo\s+meu\s+jeito\b|\beu\s+(?:é\s+que\s+)?decido\b|\bporque\s+eu\s+(?:quero|mandei)\b",
            High,
            Control,
        ),
        RuleConfig::builtin(
            r"\b(?:a\s+)?culpa\s+é\s+(?:toda\s+)?sua\b|\bé\s+culpa\s+sua\b|\bpor\s+(?:sua|tua)\s+causa\b",
            High,
            Blame,
        ),
        RuleConfig::builtin(r"\bvocê\s+(?:nunca|sempre|jamais)\b", Medium, Accusation),
        RuleConfig::builtin(
            r"\b(?:parabéns|obrigad[oa])\s+(?:mesmo|hein)\b|\bque\s+surpresa\b|\bclaro,?\s+como\s+sempre\b|\bnossa,?\s+que\s+(?:ótimo|maravilha)\b",
            Medium,
            Sarcasm,
        ),
        RuleConfig::builtin(
            r"\btanto\s+faz\b|\bproblema\s+(?:é\s+)?seu\b|\bnão\s+é\s+problema\s+meu\b|\bpara\s+de\s+drama\b|\bvocê\s+exagera\b",
            Medium,
            Dismissive,
        ),
        RuleConfig::builtin(r"\bnunca\b", Medium, Generalization),
        RuleConfig::builtin(r"\bsempre\b", Medium, Generalization),
    ]
}

/// Compiled, immutable rule table.
///
/// The `RegexSet` answers "which rules matched" in one pass; the individual
/// matchers are only consulted to extract evidence for rules that hit.
#[derive(Debug)]
pub struct RuleTable {
    set: RegexSet,
    rules: Vec<PatternRule>,
}

static BUILTIN_TABLE: LazyLock<Arc<RuleTable>> = LazyLock::new(|| {
    Arc::new(RuleTable::compile(&builtin_rules()).expect("built-in rules must compile"))
});

impl RuleTable {
    /// Compile a list of rule configs. Matching is case-insensitive.
    pub fn compile(configs: &[RuleConfig]) -> Result<Self> {
        let set = RegexSetBuilder::new(configs.iter().map(|c| c.pattern.as_str()))
            .case_insensitive(true)
            .build()?;

        let rules = configs
            .iter()
            .map(|c| {
                Ok(PatternRule {
                    matcher: RegexBuilder::new(&c.pattern)
                        .case_insensitive(true)
                        .build()?,
                    severity: c.severity,
                    category: c.category.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { set, rules })
    }

    /// The shared built-in table, compiled on first use.
    pub fn builtin() -> Arc<RuleTable> {
        Arc::clone(&BUILTIN_TABLE)
    }

    /// Built-in rules followed by `extra`.
    pub fn with_extra(extra: &[RuleConfig]) -> Result<Self> {
        let mut configs = builtin_rules();
        configs.extend_from_slice(extra);
        Self::compile(&configs)
    }

    /// Rules that match `text`, in table order, each at most once.
    pub fn matching(&self, text: &str) -> impl Iterator<Item = &PatternRule> {
        self.set
            .matches(text)
            .into_iter()
            .map(move |i| &self.rules[i])
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Add a matched pattern's contribution to the emotion profile.
///
/// Categories without an entry (including custom ones) contribute nothing.
pub fn apply_emotion(profile: &mut EmotionProfile, category: &PatternType) {
    match category {
        PatternType::Insult | PatternType::Threat => profile.anger += 3,
        PatternType::Ultimatum => profile.anger += 2,
        PatternType::Shouting => profile.anger += 2,
        PatternType::Accusation | PatternType::Blame => profile.frustration += 2,
        PatternType::Generalization | PatternType::Emphasis => profile.frustration += 1,
        PatternType::Sarcasm => profile.sarcasm += 2,
        PatternType::Manipulation | PatternType::Gaslighting => profile.manipulation += 3,
        PatternType::Control => profile.manipulation += 2,
        PatternType::Dismissive => profile.dismissiveness += 2,
        PatternType::Custom(_) => {}
    }
}
