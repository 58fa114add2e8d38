//! Batch judging with bounded concurrency
//!
//! Prompts are collected during a run and judged all at once at aggregation
//! time. At most `max_workers` judge calls are in flight; every prompt is
//! judged exactly once and its outcome lands at its input index.

use crate::eval::client::{JudgeClient, JudgeFailure, JudgeOutcome};
use crate::types::JudgePrompt;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// How a batch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateStatus {
    /// Every prompt was dispatched (some calls may still have failed)
    Completed,
    /// Nothing to judge
    Empty,
    /// No API key; nothing was dispatched
    Unconfigured,
}

/// Corpus-level judge result
///
/// `mean` counts failed calls as 0.0. `failed` says how many of those zeros
/// came from judging failures rather than from the judge. `completed` counts
/// the judge tasks that ran to the end, whatever their outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResult {
    pub status: AggregateStatus,
    pub mean: f64,
    pub total: usize,
    pub failed: usize,
    pub completed: usize,
    /// One outcome per submitted prompt, in submission order
    pub outcomes: Vec<JudgeOutcome>,
    pub elapsed_ms: u64,
}

impl AggregateResult {
    fn empty() -> Self {
        Self {
            status: AggregateStatus::Empty,
            mean: 0.0,
            total: 0,
            failed: 0,
            completed: 0,
            outcomes: Vec::new(),
            elapsed_ms: 0,
        }
    }

    fn unconfigured(total: usize) -> Self {
        Self {
            status: AggregateStatus::Unconfigured,
            mean: 0.0,
            total,
            failed: total,
            completed: 0,
            outcomes: vec![JudgeOutcome::from(JudgeFailure::MissingCredentials); total],
            elapsed_ms: 0,
        }
    }

    fn from_outcomes(outcomes: Vec<JudgeOutcome>, completed: usize, elapsed: Duration) -> Self {
        let total = outcomes.len();
        let failed = outcomes.iter().filter(|o| o.is_failure()).count();
        let sum: f64 = outcomes.iter().map(|o| o.score().value()).sum();
        let mean = if total == 0 { 0.0 } else { sum / total as f64 };

        Self {
            status: AggregateStatus::Completed,
            mean,
            total,
            failed,
            completed,
            outcomes,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Per-prompt scores with failures as 0.0
    pub fn scores(&self) -> Vec<f64> {
        self.outcomes.iter().map(|o| o.score().value()).collect()
    }

    pub fn succeeded(&self) -> usize {
        self.total - self.failed
    }
}

/// Fans prompts out to a [`JudgeClient`] and reduces the scores to a mean
pub struct JudgeAggregator {
    client: JudgeClient,
    max_workers: usize,
    show_progress: bool,
    label: String,
    completed: Arc<AtomicUsize>,
}

impl JudgeAggregator {
    /// Worker count comes from the client's settings
    pub fn new(client: JudgeClient) -> Self {
        let max_workers = client.settings().max_workers.max(1);
        Self {
            client,
            max_workers,
            show_progress: false,
            label: "Judging".to_string(),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_max_workers(mut self, n: usize) -> Self {
        self.max_workers = n.max(1);
        self
    }

    /// Draw a progress bar on stderr while the batch runs
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Share a counter that is bumped once per finished judge task
    ///
    /// The counter is reset to zero at the start of each dispatched batch,
    /// so another task can poll it while `run` is in progress.
    pub fn with_progress_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.completed = counter;
        self
    }

    /// Judge tasks finished so far in the current (or last) batch
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Judge every prompt and aggregate
    pub async fn run(&self, prompts: Vec<JudgePrompt>) -> AggregateResult {
        let total = prompts.len();
        if total == 0 {
            return AggregateResult::empty();
        }

        if !self.client.settings().has_credentials() {
            tracing::warn!(
                "API key not set. Returning 0.0 judge score for {} prompts.",
                total
            );
            return AggregateResult::unconfigured(total);
        }

        tracing::info!(
            "Starting batch judging for {} samples with {} workers (model: {})",
            total,
            self.max_workers,
            self.client.settings().model
        );

        self.completed.store(0, Ordering::SeqCst);
        let started = Instant::now();
        let progress = self.progress_bar(total);
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks = JoinSet::new();

        for (index, prompt) in prompts.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let client = self.client.clone();

            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => client.judge(&prompt).await,
                    Err(e) => JudgeFailure::Aborted(e.to_string()).into(),
                };
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<JudgeOutcome>> = vec![None; total];
        let mut failed = 0usize;
        let mut completed = 0usize;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    if outcome.is_failure() {
                        failed += 1;
                    }
                    slots[index] = Some(outcome);
                    completed += 1;
                    self.completed.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!("Judge task did not complete: {}", e);
                }
            }
            progress.inc(1);
            progress.set_message(format!("{} failed", failed));
        }

        let outcomes: Vec<JudgeOutcome> = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    JudgeFailure::Aborted("judge task did not complete".to_string()).into()
                })
            })
            .collect();

        let result = AggregateResult::from_outcomes(outcomes, completed, started.elapsed());
        progress.finish_with_message(format!("mean {:.4}, {} failed", result.mean, result.failed));

        tracing::info!(
            mean = result.mean,
            failed = result.failed,
            elapsed_ms = result.elapsed_ms,
            "Batch judging finished for {} samples",
            result.total
        );

        result
    }

    /// Judge every prompt and return only the mean
    pub async fn mean(&self, prompts: Vec<JudgePrompt>) -> f64 {
        self.run(prompts).await.mean
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{prefix} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        ) {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_prefix(self.label.clone());
        pb
    }
}
