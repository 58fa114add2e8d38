//! judge-eval - LLM-as-judge scoring for reading-comprehension tasks
//!
//! Grades model answers by asking an external judge model how closely each
//! answer matches the reference answers, then averages the grades into one
//! corpus-level score.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use judge_eval::{build_judge_prompt, JudgeAggregator, JudgeClient, JudgeRequest, JudgeSettings};
//! use std::sync::Arc;
//!
//! let settings = Arc::new(JudgeSettings::from_env());
//! let client = JudgeClient::new(settings)?;
//!
//! let prompt = build_judge_prompt(&JudgeRequest::new(context, question, golds, prediction));
//! let result = JudgeAggregator::new(client).run(vec![prompt]).await;
//! println!("judge score {:.4} ({} failed)", result.mean, result.failed);
//! ```
//!
//! # Architecture
//!
//! ```text
//! harness ──► process_results() ──► JudgePrompt ─┐
//!                                                │ JudgeBatch
//!                                                ▼
//!                            JudgeAggregator (≤ max_workers in flight)
//!                                                │
//!                                  JudgeClient × N ──► judge API
//!                                                │
//!                                     scores ──► mean ──► harness
//! ```

pub mod config;
pub mod convenience;
pub mod eval;
pub mod records;
pub mod types;

pub use config::JudgeSettings;
pub use types::*;

// Pipeline
pub use eval::aggregate::{AggregateResult, AggregateStatus, JudgeAggregator};
pub use eval::client::{
    parse_score, JudgeBackend, JudgeClient, JudgeFailure, JudgeOutcome, OpenAiChatBackend,
};
pub use eval::prompt::{build_judge_prompt, NO_REFERENCE_MARKER};

// Reporting
pub use eval::{print_eval_report, EvalReport, ItemInput};

// Harness hooks
pub use convenience::{exact_match, judge_aggregate, process_results, ExampleMetrics};
pub use records::{load_records, ExampleRecord};
