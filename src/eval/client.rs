//! Judge client: one prompt in, one bounded score out
//!
//! Every failure (missing key, transport, HTTP status, malformed payload,
//! unparseable reply) is captured as a [`JudgeFailure`] inside a
//! [`JudgeOutcome`]. Callers that only want the number use
//! [`JudgeOutcome::score`], which collapses failures to 0.0. Nothing here
//! retries.

use crate::config::JudgeSettings;
use crate::types::{JudgePrompt, JudgeScore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Error bodies and unparseable replies are cut to this many chars in logs
const SNIPPET_CHARS: usize = 200;

/// Why a judge call produced no score
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum JudgeFailure {
    #[error("judge API key not configured")]
    MissingCredentials,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("judge service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed judge response: {0}")]
    MalformedResponse(String),

    #[error("no score in [0, 1] in judge reply {0:?}")]
    Unparseable(String),

    #[error("judge task aborted: {0}")]
    Aborted(String),
}

/// Result of a single judge call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JudgeOutcome {
    Scored { score: JudgeScore },
    Failed { reason: JudgeFailure },
}

impl JudgeOutcome {
    /// Collapse to the numeric value handed back to the harness
    pub fn score(&self) -> JudgeScore {
        match self {
            JudgeOutcome::Scored { score } => *score,
            JudgeOutcome::Failed { .. } => JudgeScore::ZERO,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, JudgeOutcome::Failed { .. })
    }

    pub fn failure(&self) -> Option<&JudgeFailure> {
        match self {
            JudgeOutcome::Failed { reason } => Some(reason),
            JudgeOutcome::Scored { .. } => None,
        }
    }
}

impl From<JudgeFailure> for JudgeOutcome {
    fn from(reason: JudgeFailure) -> Self {
        JudgeOutcome::Failed { reason }
    }
}

/// Something that can send a prompt to a judge model and return its raw reply
#[async_trait]
pub trait JudgeBackend: Send + Sync {
    async fn complete(&self, prompt: &JudgePrompt) -> Result<String, JudgeFailure>;
}

/// OpenAI-compatible chat-completions backend
pub struct OpenAiChatBackend {
    http: reqwest::Client,
    settings: Arc<JudgeSettings>,
}

impl OpenAiChatBackend {
    pub fn new(settings: Arc<JudgeSettings>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build judge HTTP client")?;
        Ok(Self { http, settings })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl JudgeBackend for OpenAiChatBackend {
    async fn complete(&self, prompt: &JudgePrompt) -> Result<String, JudgeFailure> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(JudgeFailure::MissingCredentials)?;

        let request_body = serde_json::json!({
            "model": self.settings.model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt.as_str()
                }
            ],
            "temperature": 0.0,
            "max_tokens": self.settings.max_tokens
        });

        let response = self
            .http
            .post(self.settings.completions_url())
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| JudgeFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JudgeFailure::Status {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| JudgeFailure::MalformedResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| JudgeFailure::MalformedResponse("no message content".to_string()))
    }
}

/// Stateless-per-call judge adapter
///
/// Cheap to clone; workers share the same settings and backend.
#[derive(Clone)]
pub struct JudgeClient {
    settings: Arc<JudgeSettings>,
    backend: Arc<dyn JudgeBackend>,
}

impl JudgeClient {
    /// Client backed by the chat-completions HTTP API
    pub fn new(settings: Arc<JudgeSettings>) -> Result<Self> {
        let backend = OpenAiChatBackend::new(Arc::clone(&settings))?;
        Ok(Self {
            settings,
            backend: Arc::new(backend),
        })
    }

    pub fn with_backend(settings: Arc<JudgeSettings>, backend: Arc<dyn JudgeBackend>) -> Self {
        Self { settings, backend }
    }

    pub fn settings(&self) -> &JudgeSettings {
        &self.settings
    }

    /// Judge one prompt. Never errors; failures come back as `Failed`.
    pub async fn judge(&self, prompt: &JudgePrompt) -> JudgeOutcome {
        if !self.settings.has_credentials() {
            return JudgeFailure::MissingCredentials.into();
        }

        let reply = match self.backend.complete(prompt).await {
            Ok(reply) => reply,
            Err(failure) => {
                tracing::error!("Judge API error: {}", failure);
                return failure.into();
            }
        };

        match parse_score(&reply) {
            Some(score) => {
                tracing::debug!(score = score.value(), "Judge reply parsed");
                JudgeOutcome::Scored { score }
            }
            None => {
                tracing::debug!(reply = %reply.trim(), "Judge reply had no usable score");
                JudgeFailure::Unparseable(snippet(reply.trim())).into()
            }
        }
    }

    /// Judge one prompt and keep only the number
    pub async fn score(&self, prompt: &JudgePrompt) -> JudgeScore {
        self.judge(prompt).await.score()
    }
}

/// Extract the first in-range number from a free-text judge reply
///
/// Comma decimal separators become periods, the text is split on
/// whitespace, and the first token that reads as a number in [0, 1] wins.
/// Tokens outside the range ("42", "1.5", "-0.2") are skipped, not fatal.
/// Punctuation hugging a number ("0.8.", "(0.75)") is ignored, but a number
/// glued to letters ("1st", "v0.5") or a percent sign is not a score.
pub fn parse_score(content: &str) -> Option<JudgeScore> {
    content
        .trim()
        .replace(',', ".")
        .split_whitespace()
        .find_map(|token| as_score(token).or_else(|| as_score(numeric_core(token))))
}

fn as_score(token: &str) -> Option<JudgeScore> {
    token.parse::<f64>().ok().and_then(JudgeScore::new)
}

/// Strip punctuation hugging a number; letters and `%` stay attached
fn numeric_core(token: &str) -> &str {
    token
        .trim_start_matches(|c: char| {
            c.is_ascii_punctuation() && !matches!(c, '-' | '+' | '.' | '%')
        })
        .trim_end_matches(|c: char| c.is_ascii_punctuation() && c != '%')
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedBackend {
        reply: Result<String, JudgeFailure>,
        calls: AtomicUsize,
    }

    impl CannedBackend {
        fn new(reply: Result<&str, JudgeFailure>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl JudgeBackend for CannedBackend {
        async fn complete(&self, _prompt: &JudgePrompt) -> Result<String, JudgeFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    fn keyed() -> Arc<JudgeSettings> {
        Arc::new(JudgeSettings::default().with_api_key("sk-test"))
    }

    #[test]
    fn test_parse_plain_number() {
        assert_eq!(parse_score("0.75").map(JudgeScore::value), Some(0.75));
        assert_eq!(parse_score("  1\n").map(JudgeScore::value), Some(1.0));
        assert_eq!(parse_score("0").map(JudgeScore::value), Some(0.0));
    }

    #[test]
    fn test_parse_comma_decimal() {
        assert_eq!(parse_score("0,5").map(JudgeScore::value), Some(0.5));
    }

    #[test]
    fn test_parse_first_valid_token_wins() {
        let score = parse_score("Score: 0.8, good answer").unwrap();
        assert_eq!(format!("{}", score), "0.80");
        assert_eq!(parse_score("0.3 0.9").map(JudgeScore::value), Some(0.3));
    }

    #[test]
    fn test_parse_skips_out_of_range() {
        assert!(parse_score("1.5").is_none());
        assert!(parse_score("-0.2").is_none());
        assert_eq!(parse_score("1.5 then 0.4").map(JudgeScore::value), Some(0.4));
        assert_eq!(parse_score("-0.2 0.6").map(JudgeScore::value), Some(0.6));
    }

    #[test]
    fn test_parse_percentage_prose_yields_nothing() {
        assert!(parse_score("I think it's about 42% correct").is_none());
        assert!(parse_score("").is_none());
        assert!(parse_score("NaN inf").is_none());
    }

    #[test]
    fn test_parse_rejects_letter_glued_tokens() {
        assert!(parse_score("1st").is_none());
        assert!(parse_score("Top1 answer").is_none());
        assert!(parse_score("v0.5").is_none());
        assert!(parse_score("0.5%").is_none());
        assert_eq!(parse_score("1st try: 0.5").map(JudgeScore::value), Some(0.5));
    }

    #[test]
    fn test_parse_wrapped_number() {
        assert_eq!(parse_score("(0.75)").map(JudgeScore::value), Some(0.75));
        assert_eq!(parse_score("**1.0**").map(JudgeScore::value), Some(1.0));
        assert_eq!(parse_score("0.8.").map(JudgeScore::value), Some(0.8));
        assert_eq!(parse_score("\"0.25\"").map(JudgeScore::value), Some(0.25));
    }

    #[tokio::test]
    async fn test_judge_scores_reply() {
        let backend = CannedBackend::new(Ok("0.5"));
        let client = JudgeClient::with_backend(keyed(), backend.clone());

        let outcome = client.judge(&JudgePrompt::from("p")).await;
        assert_eq!(outcome.score().value(), 0.5);
        assert!(!outcome.is_failure());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_judge_without_key_skips_backend() {
        let backend = CannedBackend::new(Ok("1.0"));
        let client = JudgeClient::with_backend(Arc::new(JudgeSettings::default()), backend.clone());

        let outcome = client.judge(&JudgePrompt::from("p")).await;
        assert_eq!(outcome.failure(), Some(&JudgeFailure::MissingCredentials));
        assert_eq!(outcome.score(), JudgeScore::ZERO);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_judge_transport_failure_is_zero() {
        let backend = CannedBackend::new(Err(JudgeFailure::Transport("timed out".into())));
        let client = JudgeClient::with_backend(keyed(), backend);

        let outcome = client.judge(&JudgePrompt::from("p")).await;
        assert!(matches!(outcome.failure(), Some(JudgeFailure::Transport(_))));
        assert_eq!(outcome.score(), JudgeScore::ZERO);
    }

    #[test]
    fn test_judge_unparseable_reply() {
        let backend = CannedBackend::new(Ok("about 85 out of 100"));
        let client = JudgeClient::with_backend(keyed(), backend);

        let outcome = tokio_test::block_on(client.judge(&JudgePrompt::from("p")));
        assert!(matches!(outcome.failure(), Some(JudgeFailure::Unparseable(_))));
        assert_eq!(outcome.score(), JudgeScore::ZERO);
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let scored = JudgeOutcome::Scored {
            score: JudgeScore::ONE,
        };
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["status"], "scored");
        assert_eq!(json["score"], 1.0);

        let failed: JudgeOutcome = JudgeFailure::MissingCredentials.into();
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"]["kind"], "missing_credentials");
    }
}
