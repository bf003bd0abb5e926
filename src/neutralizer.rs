//! Rule-driven message neutralization.
//!
//! Rewrites run in a fixed order, then a cleanup pass normalizes spacing and
//! punctuation, then a politeness pass softens short or request-style
//! messages. The result is always a complete message, never a diff.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

use crate::filter::ScanOutcome;
use crate::phrases::{pick, CHILD_WELFARE_REMINDERS, GREETINGS, NEUTRAL_FALLBACK};

/// Messages shorter than this (in chars) get a greeting.
pub const SHORT_MESSAGE_CHARS: usize = 50;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("neutralizer regex must compile")
}

/// Ordered (matcher, replacement) rewrites.
static REWRITES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        // "se você não X, (eu) vou Y" keeps the condition, drops the consequence
        (
            compile(r"(?i)\bse\s+você\s+não\s+([^,.!?]+?),?\s+(?:eu\s+)?vou\b[^.!?]*"),
            "vamos considerar juntos o que fazer se você não ${1}",
        ),
        (
            compile(r"(?i)\bvocê\s+(?:está|é|tá)\s+(?:louc[oa]|doid[oa]|maluc[oa])\b"),
            "acho que vemos isso de forma diferente",
        ),
        (
            compile(r"(?i)\bvocê\s+inventa(?:\s+coisas)?\b"),
            "lembramos disso de forma diferente",
        ),
        (
            compile(r"(?i)\bisso\s+nunca\s+aconteceu\b"),
            "eu me lembro disso de outro jeito",
        ),
        (
            compile(r"(?i)\bvocê\s+está\s+imaginando\s+coisas\b"),
            "vemos isso de forma diferente",
        ),
        (compile(r"(?i)\b(?:você\s+)?vai\s+se\s+arrepender\b[^.!?]*"), ""),
        (compile(r"(?i)\bvocê\s+vai\s+ver\b"), ""),
        (compile(r"(?i)\bvou\s+acabar\s+com\b[^.!?]*"), ""),
        (
            compile(r"(?i)\bnunca\s+mais\s+vai\s+ver\s+(?:as\s+crianças|os\s+filhos|o\s+filho|a\s+filha)\b"),
            "",
        ),
        (
            compile(r"(?i)\bvou\s+(?:te\s+)?(?:processar|denunciar)\b"),
            "vou buscar orientação",
        ),
        (
            compile(r"(?i)(?:\bvocê\s+(?:é|está\s+sendo)\s+)?(?:\b(?:seu|sua|um|uma)\s+)?\b(?:idiota|imbecil|estúpid[oa]s?|burr[oa]s?|otári[oa]s?|babaca|inútil|incompetente|ridícul[oa]|egoísta)\b"),
            "",
        ),
        (
            compile(r"(?i)\bvocê\s+(?:nunca|jamais)\s+(\w+)"),
            "às vezes você não ${1}",
        ),
        (
            compile(r"(?i)\bvocê\s+sempre\s+(\w+)"),
            "com frequência você ${1}",
        ),
        (
            compile(r"(?i)\b(?:a\s+)?culpa\s+é\s+(?:toda\s+)?sua\b"),
            "vamos focar em encontrar uma solução",
        ),
        (
            compile(r"(?i)\bé\s+culpa\s+sua\b"),
            "precisamos encontrar uma solução",
        ),
        (
            compile(r"(?i)\bpor\s+(?:sua|tua)\s+causa\b"),
            "com essa situação",
        ),
        (
            compile(r"(?i)\b(?:parabéns|obrigad[oa])\s+(?:mesmo|hein)\b[,.!]?"),
            "",
        ),
        (compile(r"(?i)\bque\s+surpresa\b[,.!]?"), ""),
        (compile(r"(?i)\bclaro,?\s+como\s+sempre\b[,.!]?"), ""),
        (compile(r"(?i)\bnossa,?\s+que\s+(?:ótimo|maravilha)\b[,.!]?"), ""),
        (compile(r"(?i)\bou\s+então\b"), "e"),
        (compile(r"(?i)\bsenão\b"), "e"),
        (
            compile(r"(?i)\bé\s+a\s+última\s+(?:vez|chance)\b"),
            "é importante para mim",
        ),
        (compile(r"(?i)\btanto\s+faz\b"), "estou aberto a sugestões"),
        (compile(r"(?i)\bpara\s+de\s+drama\b"), "vamos conversar com calma"),
        (compile(r"(?i)\bvocê\s+exagera\b"), "vejo isso de outra forma"),
        (
            compile(r"(?i)\bquando\s+eu\s+quiser\b"),
            "em um horário combinado",
        ),
        (
            compile(r"(?i)\bdo\s+meu\s+jeito\b"),
            "de um jeito que funcione para todos",
        ),
        (compile(r"(?i)\bporque\s+eu\s+(?:quero|mandei)\b"), ""),
    ]
});

static REPEATED_PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| compile(r"[!?]{2,}"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| compile(r"\s+"));
static SPACE_BEFORE_PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| compile(r"\s+([.,!?])"));
static POLITE_REQUEST: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\b(?:poderia|pode|consegue|dá\s+para)\b"));
static POLITENESS_MARKER: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\bpor\s+favor\b"));
static GREETING_PREFIX: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)^(?:olá|oi|bom\s+dia)\b"));

/// Produce the safer rewrite for `text` given its scan.
///
/// Whitespace-only input is returned unchanged.
pub fn neutralize<R: Rng + ?Sized>(text: &str, outcome: &ScanOutcome, rng: &mut R) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }

    let message = if outcome.needs_transformation() {
        cleanup(&rewrite(text, outcome))
    } else {
        text.to_string()
    };

    let mut message = add_politeness(&message, rng);

    if outcome.severity.is_escalated() {
        message.push('\n');
        message.push_str(pick(CHILD_WELFARE_REMINDERS, rng));
    }

    message
}

/// Apply every rewrite, strip the detected insults, then the shouting and
/// punctuation fixes.
fn rewrite(text: &str, outcome: &ScanOutcome) -> String {
    let mut message = text.to_string();

    for (matcher, replacement) in REWRITES.iter() {
        message = matcher.replace_all(&message, *replacement).into_owned();
    }

    for matcher in &outcome.insult_matchers {
        message = insult_with_lead_in(matcher)
            .replace_all(&message, "")
            .into_owned();
    }

    if outcome.shouting {
        message = message.to_lowercase();
    }

    message = REPEATED_PUNCTUATION
        .replace_all(&message, ".")
        .into_owned();

    if !message.chars().any(char::is_alphanumeric) {
        return NEUTRAL_FALLBACK.to_string();
    }

    message
}

/// Normalize spacing, capitalize, and guarantee terminal punctuation.
///
/// Idempotent: `cleanup(&cleanup(s)) == cleanup(s)`.
pub fn cleanup(message: &str) -> String {
    let collapsed = WHITESPACE.replace_all(message, " ");
    let stripped = collapsed
        .trim()
        .trim_start_matches(|c: char| matches!(c, ',' | ';' | ':' | '.' | '!' | '?' | ' '));
    let tightened = SPACE_BEFORE_PUNCTUATION.replace_all(stripped, "$1");

    let mut cleaned = capitalize_first(&tightened);
    if !cleaned.ends_with(['.', '!', '?']) {
        cleaned.push('.');
    }
    cleaned
}

/// Inject "por favor" into polite requests and greet short messages.
pub fn add_politeness<R: Rng + ?Sized>(message: &str, rng: &mut R) -> String {
    let mut polite = message.to_string();

    if POLITE_REQUEST.is_match(&polite) && !POLITENESS_MARKER.is_match(&polite) {
        polite = polite.replacen('?', ", por favor?", 1);
    }

    if polite.chars().count() < SHORT_MESSAGE_CHARS && !GREETING_PREFIX.is_match(&polite) {
        polite = format!("{} {}", pick(GREETINGS, rng), polite);
    }

    polite
}

/// Widen an insult rule so "você é um", "seu" and the like go with it.
fn insult_with_lead_in(matcher: &Regex) -> Regex {
    Regex::new(&format!(
        r"(?i)(?:\bvocê\s+(?:é|está\s+sendo)\s+)?(?:\b(?:seu|sua|um|uma)\s+)?(?:{})",
        matcher.as_str()
    ))
    .unwrap_or_else(|_| matcher.clone())
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
