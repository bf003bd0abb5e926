//! Fixed Portuguese phrase sets used by the rule-based engine.

use rand::seq::SliceRandom;
use rand::Rng;

pub const GREETINGS: &[&str] = &["Olá,", "Oi,", "Bom dia,"];

pub const CHILD_WELFARE_REMINDERS: &[&str] = &[
    "Lembre-se: o bem-estar das crianças vem em primeiro lugar.",
    "Vamos manter o foco no que é melhor para as crianças.",
    "As crianças se beneficiam quando conseguimos conversar com respeito.",
];

pub const CHILD_FOCUS_PHRASES: &[&str] = &[
    "O que seria melhor para as crianças nessa situação?",
    "Vamos pensar no que deixa as crianças mais tranquilas.",
    "Nosso foco deve ser facilitar a rotina das crianças.",
    "Podemos encontrar uma solução que beneficie a criança?",
];

/// Replacement when neutralization leaves nothing readable.
pub const NEUTRAL_FALLBACK: &str = "Gostaria de conversar sobre isso com calma.";

pub const SCHEDULING_SUGGESTION: &str = "Que tal sugerirmos 2-3 opções de horário para facilitar?";
pub const LOGISTICS_SUGGESTION: &str =
    "Podemos criar um calendário compartilhado para organizar isso?";
pub const MEDIATION_SUGGESTION: &str = "Talvez seja útil focar em encontrar uma solução prática.";

pub const CRITICAL_WARNING: &str =
    "Esta mensagem contém linguagem muito agressiva. Recomendamos reformular completamente.";
pub const HIGH_WARNING: &str =
    "Esta mensagem pode gerar conflito. Sugerimos revisar antes de enviar.";
pub const MEDIUM_WARNING: &str = "Algumas partes da mensagem podem ser mal interpretadas.";
pub const THREAT_WARNING: &str = "Ameaças não ajudam na comunicação construtiva.";
pub const MANIPULATION_WARNING: &str = "Evite linguagem manipulativa. Seja direto e honesto.";

pub const FALLBACK_SAFETY_WARNING: &str = "AVISO: Em situações de violência doméstica, busque sempre apoio profissional (advogado, terapeuta, autoridades).";
pub const FALLBACK_EMERGENCY_RECOMMENDATION: &str =
    "Se você está em risco, ligue 180 (Central de Atendimento à Mulher) ou 190 (Polícia).";

/// Uniformly pick one phrase from a non-empty set.
pub fn pick<'a, R: Rng + ?Sized>(options: &[&'a str], rng: &mut R) -> &'a str {
    options.choose(rng).copied().unwrap_or_default()
}
