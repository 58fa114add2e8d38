//! Judge service configuration
//!
//! Built once per run and shared read-only between workers.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_WORKERS: usize = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Enough room for a short numeric answer, not a paragraph
pub const DEFAULT_MAX_TOKENS: u32 = 16;

/// Configuration for the LLM judge
#[derive(Clone)]
pub struct JudgeSettings {
    /// API key. `None` disables judging: every score becomes 0.0.
    pub api_key: Option<String>,

    /// OpenAI-compatible API root, without the `/chat/completions` suffix
    pub base_url: String,

    /// Judge model identifier
    pub model: String,

    /// Maximum in-flight judge calls
    pub max_workers: usize,

    /// Per-call transport timeout
    pub timeout: Duration,

    pub max_tokens: u32,
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_workers: DEFAULT_MAX_WORKERS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl std::fmt::Debug for JudgeSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JudgeSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_workers", &self.max_workers)
            .field("timeout", &self.timeout)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl JudgeSettings {
    /// Read settings from the process environment
    ///
    /// Recognized keys: `API_KEY` (falls back to `OPENAI_API_KEY`),
    /// `JUDGE_BASE_URL`, `JUDGE_MODEL`, `JUDGE_MAX_WORKERS`, `JUDGE_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key/value source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let api_key = non_empty("API_KEY").or_else(|| non_empty("OPENAI_API_KEY"));

        let max_workers = non_empty("JUDGE_MAX_WORKERS")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults.max_workers);

        let timeout = non_empty("JUDGE_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&n| n > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        Self {
            api_key,
            base_url: non_empty("JUDGE_BASE_URL").unwrap_or(defaults.base_url),
            model: non_empty("JUDGE_MODEL").unwrap_or(defaults.model),
            max_workers,
            timeout,
            max_tokens: defaults.max_tokens,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Zero is clamped to one worker
    pub fn with_max_workers(mut self, n: usize) -> Self {
        self.max_workers = n.max(1);
        self
    }

    /// Apply a command-line worker count; `None` and zero keep the current value
    pub fn with_worker_override(mut self, n: Option<usize>) -> Self {
        if let Some(n) = n.filter(|&n| n > 0) {
            self.max_workers = n;
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full chat-completions URL
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = JudgeSettings::from_lookup(lookup(&[]));
        assert!(!settings.has_credentials());
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.max_workers, 10);
        assert_eq!(settings.timeout, Duration::from_secs(60));
        assert_eq!(settings.max_tokens, 16);
    }

    #[test]
    fn test_reads_recognized_keys() {
        let settings = JudgeSettings::from_lookup(lookup(&[
            ("API_KEY", "sk-test"),
            ("JUDGE_BASE_URL", "http://localhost:8000/v1/"),
            ("JUDGE_MODEL", "qwen2.5-72b"),
            ("JUDGE_MAX_WORKERS", "4"),
        ]));
        assert!(settings.has_credentials());
        assert_eq!(settings.model, "qwen2.5-72b");
        assert_eq!(settings.max_workers, 4);
        assert_eq!(
            settings.completions_url(),
            "http://localhost:8000/v1/chat/completions"
        );
    }

    #[test]
    fn test_openai_key_fallback_and_blank_key() {
        let settings = JudgeSettings::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-legacy")]));
        assert_eq!(settings.api_key.as_deref(), Some("sk-legacy"));

        let blank = JudgeSettings::from_lookup(lookup(&[("API_KEY", "   ")]));
        assert!(!blank.has_credentials());
    }

    #[test]
    fn test_bad_worker_count_falls_back() {
        let zero = JudgeSettings::from_lookup(lookup(&[("JUDGE_MAX_WORKERS", "0")]));
        assert_eq!(zero.max_workers, DEFAULT_MAX_WORKERS);

        let junk = JudgeSettings::from_lookup(lookup(&[("JUDGE_MAX_WORKERS", "many")]));
        assert_eq!(junk.max_workers, DEFAULT_MAX_WORKERS);
    }

    #[test]
    fn test_worker_override_ignores_zero() {
        let junk_env = JudgeSettings::from_lookup(lookup(&[("JUDGE_MAX_WORKERS", "many")]));
        assert_eq!(junk_env.clone().with_worker_override(None).max_workers, 10);
        assert_eq!(junk_env.clone().with_worker_override(Some(0)).max_workers, 10);
        assert_eq!(junk_env.with_worker_override(Some(3)).max_workers, 3);
    }

    #[test]
    fn test_debug_redacts_key() {
        let settings = JudgeSettings::default().with_api_key("sk-secret");
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
