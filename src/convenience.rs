//! Harness-facing hooks
//!
//! The benchmark harness calls two functions:
//! 1. `process_results()` once per document. It returns the judge *prompt*
//!    under `judge_score`, deferring the actual judging.
//! 2. `judge_aggregate()` once at the end, with every collected prompt. It
//!    judges them in a batch and returns the mean.
//!
//! ```rust,ignore
//! let settings = Arc::new(JudgeSettings::from_env());
//! let mut items = Vec::new();
//! for (doc, results) in run {
//!     items.push(process_results(&doc, &results).judge_score);
//! }
//! let score = judge_aggregate(settings, items).await;
//! ```

use crate::config::JudgeSettings;
use crate::eval::aggregate::JudgeAggregator;
use crate::eval::client::JudgeClient;
use crate::eval::prompt::build_judge_prompt;
use crate::types::{JudgePrompt, JudgeRequest, TaskDoc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Per-document metrics handed back to the harness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleMetrics {
    /// Prompt text, not a number. Scored later by `judge_aggregate`.
    pub judge_score: String,
    pub exact_match: f64,
}

/// Per-document hook: build the judge prompt and compute exact match
///
/// Only the first model result is used, trimmed.
pub fn process_results(doc: &TaskDoc, results: &[String]) -> ExampleMetrics {
    let prediction = results.first().map(|r| r.trim()).unwrap_or_default();

    let request = JudgeRequest::new(
        doc.context.as_str(),
        doc.question.as_str(),
        doc.answers.texts(),
        prediction,
    );

    ExampleMetrics {
        judge_score: build_judge_prompt(&request).into_string(),
        exact_match: exact_match(doc, prediction),
    }
}

/// 1.0 when the prediction equals one of the gold answers verbatim
pub fn exact_match(doc: &TaskDoc, prediction: &str) -> f64 {
    if doc.answers.contains(prediction) {
        1.0
    } else {
        0.0
    }
}

/// Aggregation hook: judge every collected prompt and return the mean
///
/// Always returns a usable float in [0, 1]; any failure degrades to 0.0.
pub async fn judge_aggregate(settings: Arc<JudgeSettings>, items: Vec<String>) -> f64 {
    if items.is_empty() {
        return 0.0;
    }

    let client = match JudgeClient::new(settings) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Judge client unavailable: {:#}", e);
            return 0.0;
        }
    };

    let prompts: Vec<JudgePrompt> = items.into_iter().map(JudgePrompt::from).collect();

    JudgeAggregator::new(client)
        .with_progress(true)
        .with_label("[ViQuAD] Judging")
        .mean(prompts)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::prompt::NO_REFERENCE_MARKER;
    use crate::types::GoldAnswers;

    fn doc(answers: GoldAnswers) -> TaskDoc {
        TaskDoc {
            context: "Sông Hồng chảy qua Hà Nội.".to_string(),
            question: "Sông nào chảy qua Hà Nội?".to_string(),
            answers,
        }
    }

    #[test]
    fn test_process_results_returns_prompt() {
        let d = doc(GoldAnswers::Record {
            text: vec!["Sông Hồng".to_string()],
        });
        let metrics = process_results(&d, &["  Sông Hồng \n".to_string()]);

        assert!(metrics.judge_score.contains("Sông nào chảy qua Hà Nội?"));
        assert!(metrics.judge_score.contains("- Sông Hồng"));
        assert_eq!(metrics.exact_match, 1.0);
    }

    #[test]
    fn test_exact_match_is_verbatim() {
        let d = doc(GoldAnswers::List(vec!["Sông Hồng".to_string()]));
        assert_eq!(exact_match(&d, "Sông Hồng"), 1.0);
        assert_eq!(exact_match(&d, "sông hồng"), 0.0);
        assert_eq!(exact_match(&d, "Sông Hồng ở Hà Nội"), 0.0);
    }

    #[test]
    fn test_process_results_without_answers() {
        let d = doc(GoldAnswers::default());
        let metrics = process_results(&d, &[]);
        assert!(metrics.judge_score.contains(NO_REFERENCE_MARKER));
        assert_eq!(metrics.exact_match, 0.0);
    }

    #[tokio::test]
    async fn test_judge_aggregate_empty_and_unconfigured() {
        let settings = Arc::new(JudgeSettings::default());
        assert_eq!(judge_aggregate(settings.clone(), Vec::new()).await, 0.0);
        assert_eq!(
            judge_aggregate(settings, vec!["prompt".to_string()]).await,
            0.0
        );
    }
}
