//! Configuration loading from environment.
//!
//! Every setting has a default; the only file read is the optional extra
//! rule set.

use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::debounce::{DebounceConfig, DEFAULT_MIN_CHARS, DEFAULT_QUIET_PERIOD};
use crate::error::{MediatorError, Result};
use crate::rules::{RuleConfig, RuleTable};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;
pub const DEFAULT_PORT: u16 = 8080;

/// Value shipped in `.env.example`; treated as "no key".
const PLACEHOLDER_API_KEY: &str = "your_api_key_here";

/// Main configuration for the mediator.
#[derive(Debug, Clone)]
pub struct MediatorConfig {
    /// Gemini API key. `None` disables the remote analyzer.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub remote_timeout: Duration,
    pub remote_requests_per_minute: u32,
    pub debounce: DebounceConfig,
    /// Rules appended to the built-in table.
    pub extra_rules: Vec<RuleConfig>,
    /// Listen port for `serve`.
    pub port: u16,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            remote_timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
            remote_requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            debounce: DebounceConfig::default(),
            extra_rules: Vec::new(),
            port: DEFAULT_PORT,
        }
    }
}

impl MediatorConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `GEMINI_API_KEY`: enables remote analysis
    /// - `GEMINI_MODEL`: model name (default: gemini-1.5-flash)
    /// - `REMOTE_TIMEOUT_SECS`: HTTP timeout (default: 30)
    /// - `REMOTE_REQUESTS_PER_MINUTE`: rate limit (default: 60)
    /// - `DEBOUNCE_MS`: quiet period (default: 300)
    /// - `MIN_ANALYSIS_CHARS`: minimum draft length (default: 3)
    /// - `EXTRA_RULES_PATH`: JSON file with extra pattern rules
    /// - `PORT`: HTTP port for `serve` (default: 8080)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gemini_api_key = usable_api_key(lookup("GEMINI_API_KEY"));

        let gemini_model = lookup("GEMINI_MODEL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

        let remote_timeout = Duration::from_secs(
            parse_or(&lookup, "REMOTE_TIMEOUT_SECS", DEFAULT_REMOTE_TIMEOUT_SECS),
        );
        let remote_requests_per_minute =
            parse_or(&lookup, "REMOTE_REQUESTS_PER_MINUTE", DEFAULT_REQUESTS_PER_MINUTE);

        let debounce = DebounceConfig {
            quiet_period: lookup("DEBOUNCE_MS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_QUIET_PERIOD),
            min_chars: parse_or(&lookup, "MIN_ANALYSIS_CHARS", DEFAULT_MIN_CHARS),
        };

        let extra_rules = match lookup("EXTRA_RULES_PATH") {
            Some(path) if !path.trim().is_empty() => load_extra_rules(path.trim())?,
            _ => Vec::new(),
        };

        let port = parse_or(&lookup, "PORT", DEFAULT_PORT);

        Ok(Self {
            gemini_api_key,
            gemini_model,
            remote_timeout,
            remote_requests_per_minute,
            debounce,
            extra_rules,
            port,
        })
    }

    /// Compile the rule table: the shared built-in one, or built-in plus extras.
    pub fn rule_table(&self) -> Result<Arc<RuleTable>> {
        if self.extra_rules.is_empty() {
            return Ok(RuleTable::builtin());
        }
        Ok(Arc::new(RuleTable::with_extra(&self.extra_rules)?))
    }
}

/// Treat absent, blank and placeholder keys as "not configured".
fn usable_api_key(raw: Option<String>) -> Option<String> {
    raw.map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && k != PLACEHOLDER_API_KEY)
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Load extra rules from a JSON file: `[{"pattern", "severity", "category"}]`.
pub fn load_extra_rules(path: impl AsRef<Path>) -> Result<Vec<RuleConfig>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        MediatorError::Config(format!(
            "Failed to read rules file {}: {}",
            path.display(),
            e
        ))
    })?;

    serde_json::from_str(&content)
        .map_err(|e| MediatorError::Config(format!("Failed to parse rules file: {}", e)))
}
