//! Remote generative analysis.
//!
//! A [`GenerativeBackend`] turns a prompt into free-form text. The
//! [`RemoteAnalyzer`] wraps one with the mediation instructions, extracts the
//! embedded JSON payload from the reply and validates it into an
//! [`AnalysisResult`].

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter as GovRateLimiter};
use serde::{Deserialize, Serialize};

use crate::engine::TextAnalyzer;
use crate::error::{MediatorError, Result};
use crate::models::{
    content_hash, AnalysisResult, AnalysisSource, DetectedPattern, EmotionProfile, Severity,
    Suggestion, Tone, Warning,
};

/// Gemini API base; the model name and method are appended.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Fixed instruction context sent ahead of every message.
const MEDIATION_PROMPT: &str = r#"Você é um assistente de mediação de comunicação entre pais separados, incluindo contextos de conflito severo e violência doméstica.

Objetivos:
1. Proteger quem recebe a mensagem de abuso emocional, manipulação e gaslighting.
2. Detectar ameaças, controle, culpabilização, chantagem usando as crianças, sarcasmo e humilhação.
3. Reescrever a mensagem de forma segura, neutra e focada no bem-estar das crianças.

Níveis de severidade:
- critical: ameaças, violência, gaslighting severo
- high: manipulação, controle, intimidação
- medium: linguagem hostil, acusações
- low: tom levemente negativo ou neutro

Responda SOMENTE com um objeto JSON neste formato:
{
  "severityLevel": "critical|high|medium|low",
  "overallTone": "calm|slightly_tense|tense|hostile|very_hostile|abusive",
  "detectedPatterns": [{"type": "threat|gaslighting|manipulation|control|blame|insult|...", "severity": "critical|high|medium|low", "evidence": "trecho"}],
  "isAbusiveContent": false,
  "transformed": "mensagem reescrita",
  "warnings": [{"level": "critical|high|medium", "message": "aviso"}],
  "suggestions": [{"type": "safety|child_focus|practical|alternative", "text": "sugestão", "icon": "emoji"}],
  "safetyWarning": "apenas se houver risco de segurança",
  "emergencyRecommendation": "apenas se a severidade for critical"
}

Regras de reescrita:
- Remova sempre ameaças e linguagem abusiva.
- Converta acusações em observações neutras.
- Se o conteúdo for perigoso, a mensagem reescrita deve ser genérica e segura.
- Em casos críticos, sugira mediação profissional ou apoio das autoridades."#;

/// Rate limiter type alias.
type RateLimiter = GovRateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// One-operation remote text generation capability.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Whether a credential is configured.
    fn is_available(&self) -> bool;

    /// Human-readable reason when unavailable.
    fn availability_hint(&self) -> String;

    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_base: String,
    rate_limiter: Arc<RateLimiter>,
}

impl GeminiClient {
    /// Build a client. A missing key yields an unavailable client, not an error.
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
        requests_per_minute: u32,
    ) -> Result<Self> {
        let quota =
            Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            model: model.into(),
            api_base: GEMINI_API_BASE.to_string(),
            rate_limiter: Arc::new(GovRateLimiter::direct(quota)),
        })
    }

    /// Point the client at another endpoint (a proxy or a local stub).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        }
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn availability_hint(&self) -> String {
        match self.api_key {
            Some(_) => format!("Gemini model {} configured", self.model),
            None => "Set GEMINI_API_KEY to enable remote analysis".to_string(),
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(MediatorError::RemoteUnavailable)?;

        self.rate_limiter.until_ready().await;

        // Key goes in a header, never in the URL.
        let url = format!("{}/{}:generateContent", self.api_base, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&Self::build_request(prompt))
            .send()
            .await
            .map_err(|e| MediatorError::Http(e.without_url()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);

            return Err(MediatorError::RateLimited {
                retry_after_ms: retry_after * 1000,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MediatorError::RemoteCall(format!("HTTP {}: {}", status, body)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| MediatorError::Http(e.without_url()))?;
        parse_envelope(&body)
    }
}

/// Pull the candidate text out of a `generateContent` response body.
fn parse_envelope(body: &str) -> Result<String> {
    let response: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| MediatorError::ResponseParse(format!("Invalid Gemini envelope: {}", e)))?;

    response.first_text().ok_or_else(|| {
        MediatorError::ResponseParse("reply contained no candidate text".to_string())
    })
}

/// Remote strategy over any [`GenerativeBackend`].
pub struct RemoteAnalyzer<B = GeminiClient> {
    backend: B,
}

impl<B: GenerativeBackend> RemoteAnalyzer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[async_trait]
impl<B: GenerativeBackend> TextAnalyzer for RemoteAnalyzer<B> {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    async fn analyze(&self, text: &str) -> Result<AnalysisResult> {
        if !self.backend.is_available() {
            return Err(MediatorError::RemoteUnavailable);
        }

        let reply = self.backend.generate(&build_prompt(text)).await?;
        let result = parse_reply(&reply)?;

        tracing::debug!(
            content_hash = %content_hash(text),
            severity = %result.severity_level,
            tone = result.overall_tone.as_str(),
            "Remote analysis complete"
        );

        Ok(result)
    }
}

/// Instruction context followed by the quoted message.
pub fn build_prompt(text: &str) -> String {
    let quoted = serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text));
    format!(
        "{}\n\nMENSAGEM A ANALISAR:\n{}\n\nRetorne apenas o JSON com a análise.",
        MEDIATION_PROMPT, quoted
    )
}

/// Parse a free-form reply into a validated result.
pub fn parse_reply(reply: &str) -> Result<AnalysisResult> {
    let json_text = extract_json(reply)
        .ok_or_else(|| MediatorError::ResponseParse("no JSON object in reply".to_string()))?;

    let payload: RemotePayload = serde_json::from_str(json_text)
        .map_err(|e| MediatorError::ResponseParse(format!("Failed to parse payload: {}", e)))?;

    payload.into_result()
}

/// Find the first well-formed JSON object in `text`.
///
/// The contents of a Markdown code fence are searched first; if they hold no
/// object the whole reply is scanned, so any prose around the object is
/// ignored.
pub fn extract_json(text: &str) -> Option<&str> {
    fenced_block(text)
        .and_then(first_object)
        .or_else(|| first_object(text))
}

fn first_object(text: &str) -> Option<&str> {
    text.char_indices()
        .filter(|(_, c)| *c == '{')
        .find_map(|(start, _)| {
            let candidate = &text[start..];
            let mut stream =
                serde_json::Deserializer::from_str(candidate).into_iter::<serde_json::Value>();
            match stream.next() {
                Some(Ok(serde_json::Value::Object(_))) => Some(&candidate[..stream.byte_offset()]),
                _ => None,
            }
        })
}

fn fenced_block(text: &str) -> Option<&str> {
    for opener in ["```json", "```"] {
        if let Some(start) = text.find(opener) {
            let start = start + opener.len();
            if let Some(end) = text[start..].find("```") {
                return Some(text[start..start + end].trim());
            }
        }
    }
    None
}

/// Schema of the remote JSON payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemotePayload {
    severity_level: Severity,
    overall_tone: Tone,
    transformed: String,
    #[serde(default)]
    detected_patterns: Vec<DetectedPattern>,
    #[serde(default)]
    is_abusive_content: bool,
    #[serde(default)]
    warnings: Vec<Warning>,
    #[serde(default)]
    suggestions: Vec<Suggestion>,
    #[serde(default)]
    safety_warning: Option<String>,
    #[serde(default)]
    emergency_recommendation: Option<String>,
}

impl RemotePayload {
    fn into_result(self) -> Result<AnalysisResult> {
        if self.transformed.trim().is_empty() {
            return Err(MediatorError::ResponseParse(
                "transformed text is blank".to_string(),
            ));
        }

        let critical = self.severity_level == Severity::Critical;
        let escalation = |text: Option<String>| {
            text.filter(|t| critical && !t.trim().is_empty())
        };

        Ok(AnalysisResult {
            severity_level: self.severity_level,
            overall_tone: self.overall_tone,
            needs_transformation: self.is_abusive_content || !self.detected_patterns.is_empty(),
            detected_patterns: self.detected_patterns,
            emotions: EmotionProfile::default(),
            is_abusive_content: self.is_abusive_content,
            transformed_text: self.transformed,
            warnings: self.warnings,
            suggestions: self.suggestions,
            safety_warning: escalation(self.safety_warning),
            emergency_recommendation: escalation(self.emergency_recommendation),
            source: AnalysisSource::Remote,
        })
    }
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

/// Request to Gemini API.
#[derive(Debug, Serialize)]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
}

/// Content block in Gemini request.
#[derive(Debug, Serialize)]
pub struct GeminiContent {
    pub parts: Vec<GeminiPart>,
}

/// Part of a content block.
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    pub text: String,
}

/// Response from Gemini API.
#[derive(Debug, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

impl GeminiResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
    }
}

/// Candidate response from Gemini.
#[derive(Debug, Deserialize)]
pub struct GeminiCandidate {
    pub content: GeminiCandidateContent,
}

/// Content in a candidate response.
#[derive(Debug, Deserialize)]
pub struct GeminiCandidateContent {
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}
