//! Judge-based evaluation
//!
//! - `prompt`: grading prompt per example
//! - `client`: one judge call, failures captured as typed outcomes
//! - `aggregate`: bounded fan-out over a batch, reduced to a mean

pub mod aggregate;
pub mod client;
pub mod prompt;

use crate::config::JudgeSettings;
use crate::types::JudgePrompt;
use aggregate::{AggregateResult, AggregateStatus};
use chrono::Utc;
use client::JudgeOutcome;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use statrs::statistics::Statistics;

/// Full report for one judged run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    pub run_id: String,
    pub timestamp: String,
    pub model: String,
    pub max_workers: usize,
    pub summary: JudgeSummary,
    /// Mean exact match, when the run had gold answers to compare against
    pub exact_match: Option<f64>,
    pub items: Vec<ItemReport>,
}

/// Corpus-level numbers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeSummary {
    pub status: AggregateStatus,
    pub judge_score: f64,
    /// Sample standard deviation of per-item scores; absent below two items
    pub std_dev: Option<f64>,
    pub total: usize,
    pub failed: usize,
    #[serde(default)]
    pub completed: usize,
    pub elapsed_ms: u64,
}

/// One example's line in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReport {
    pub id: Option<String>,
    pub prompt_sha256: String,
    pub outcome: JudgeOutcome,
    pub exact_match: Option<f64>,
}

/// Input for one report line, aligned with the prompt batch
#[derive(Debug, Clone)]
pub struct ItemInput<'a> {
    pub id: Option<&'a str>,
    pub prompt: &'a JudgePrompt,
    pub exact_match: Option<f64>,
}

impl EvalReport {
    /// Combine per-item inputs with the aggregate result, index by index
    pub fn new(
        settings: &JudgeSettings,
        max_workers: usize,
        items: &[ItemInput<'_>],
        result: AggregateResult,
    ) -> Self {
        let scores = result.scores();
        let std_dev = if scores.len() >= 2 {
            Some(scores.iter().std_dev())
        } else {
            None
        };

        let exact: Vec<f64> = items.iter().filter_map(|i| i.exact_match).collect();
        let exact_match = if exact.is_empty() {
            None
        } else {
            Some(exact.iter().sum::<f64>() / exact.len() as f64)
        };

        let summary = JudgeSummary {
            status: result.status,
            judge_score: result.mean,
            std_dev,
            total: result.total,
            failed: result.failed,
            completed: result.completed,
            elapsed_ms: result.elapsed_ms,
        };

        let item_reports = items
            .iter()
            .zip(result.outcomes)
            .map(|(input, outcome)| ItemReport {
                id: input.id.map(str::to_string),
                prompt_sha256: prompt_digest(input.prompt),
                outcome,
                exact_match: input.exact_match,
            })
            .collect();

        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            model: settings.model.clone(),
            max_workers,
            summary,
            exact_match,
            items: item_reports,
        }
    }
}

/// SHA-256 of the prompt text, hex encoded
pub fn prompt_digest(prompt: &JudgePrompt) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// Ten-cell bar for a score; values outside [0, 1] are clamped first
fn score_bar(score: f64) -> String {
    let filled = (score.clamp(0.0, 1.0) * 10.0).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
}

/// Print evaluation results in a human-readable format
pub fn print_eval_report(report: &EvalReport) {
    let summary = &report.summary;

    println!("\n┌─────────────────────────────────────────────────────────────┐");
    println!("│ ⚖️  JUDGE EVALUATION REPORT                                  │");
    println!("└─────────────────────────────────────────────────────────────┘\n");

    println!("Run:     {}", report.run_id);
    println!("Time:    {}", report.timestamp);
    println!("Model:   {} ({} workers)", report.model, report.max_workers);
    println!();

    println!(
        "JUDGE SCORE: [{}] {:.4}",
        score_bar(summary.judge_score),
        summary.judge_score
    );
    if let Some(sd) = summary.std_dev {
        println!("   Std dev: {:.4}", sd);
    }
    if let Some(em) = report.exact_match {
        println!("   Exact match: {:.1}%", em * 100.0);
    }
    println!(
        "   Judged: {}/{}  Failed: {}  Elapsed: {}ms",
        summary.total - summary.failed,
        summary.total,
        summary.failed,
        summary.elapsed_ms
    );
    println!();

    match summary.status {
        AggregateStatus::Empty => println!("⚠️  No examples to judge."),
        AggregateStatus::Unconfigured => {
            println!("⚠️  API key not set: judge score is 0.0 because nothing was judged.")
        }
        AggregateStatus::Completed if summary.failed > 0 => {
            println!("⚠️  {} judge calls failed and count as 0.0:", summary.failed);
            for item in report.items.iter().filter(|i| i.outcome.is_failure()).take(10) {
                if let Some(reason) = item.outcome.failure() {
                    let label = item
                        .id
                        .as_deref()
                        .or_else(|| item.prompt_sha256.get(..12))
                        .unwrap_or("?");
                    println!("   • {}: {}", label, reason);
                }
            }
            if summary.failed > 10 {
                println!("   ... and {} more", summary.failed - 10);
            }
        }
        AggregateStatus::Completed => println!("✅ All judge calls succeeded."),
    }
    println!();
}
