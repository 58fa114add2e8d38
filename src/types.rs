//! Core types for judge-based scoring
//!
//! A judge run is a straight pipeline:
//! `JudgeRequest` → `JudgePrompt` → judge call → `JudgeScore` → mean.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Everything the judge needs to grade one example
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeRequest {
    pub context: String,
    pub question: String,
    /// Ground-truth answers, in dataset order. May be empty.
    pub reference_answers: Vec<String>,
    pub candidate_answer: String,
}

impl JudgeRequest {
    pub fn new(
        context: impl Into<String>,
        question: impl Into<String>,
        reference_answers: Vec<String>,
        candidate_answer: impl Into<String>,
    ) -> Self {
        Self {
            context: context.into(),
            question: question.into(),
            reference_answers,
            candidate_answer: candidate_answer.into(),
        }
    }
}

/// Grading prompt sent verbatim to the judge model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JudgePrompt(String);

impl JudgePrompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for JudgePrompt {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for JudgePrompt {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl AsRef<str> for JudgePrompt {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JudgePrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Semantic-equivalence grade in the closed interval [0.0, 1.0]
///
/// The only way to build one is through [`JudgeScore::new`], which rejects
/// anything outside the interval (including NaN), or the `ZERO`/`ONE`
/// constants. Failed judge calls map to `ZERO`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
#[serde(transparent)]
pub struct JudgeScore(f64);

impl JudgeScore {
    pub const ZERO: JudgeScore = JudgeScore(0.0);
    pub const ONE: JudgeScore = JudgeScore(1.0);

    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            // folds -0.0 into 0.0
            Some(Self(value.abs()))
        } else {
            None
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl<'de> Deserialize<'de> for JudgeScore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        JudgeScore::new(value).ok_or_else(|| {
            serde::de::Error::custom(format!("judge score {} outside [0, 1]", value))
        })
    }
}

impl From<JudgeScore> for f64 {
    fn from(score: JudgeScore) -> f64 {
        score.0
    }
}

impl fmt::Display for JudgeScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Gold answers as they appear in task datasets
///
/// Reading-comprehension datasets ship answers either as a SQuAD-style
/// record (`{"text": [...], "answer_start": [...]}`), a bare list, or a
/// single string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GoldAnswers {
    Record {
        #[serde(default)]
        text: Vec<String>,
    },
    List(Vec<String>),
    Single(String),
}

impl GoldAnswers {
    /// Normalize to an ordered list of answer texts
    pub fn texts(&self) -> Vec<String> {
        match self {
            GoldAnswers::Record { text } => text.clone(),
            GoldAnswers::List(items) => items.clone(),
            GoldAnswers::Single(s) => vec![s.clone()],
        }
    }

    pub fn contains(&self, candidate: &str) -> bool {
        match self {
            GoldAnswers::Record { text } => text.iter().any(|t| t == candidate),
            GoldAnswers::List(items) => items.iter().any(|t| t == candidate),
            GoldAnswers::Single(s) => s == candidate,
        }
    }
}

impl Default for GoldAnswers {
    fn default() -> Self {
        GoldAnswers::List(Vec::new())
    }
}

/// Prompts collected over a run, judged together at aggregation time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JudgeBatch(Vec<JudgePrompt>);

impl JudgeBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, prompt: JudgePrompt) {
        self.0.push(prompt);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn prompts(&self) -> &[JudgePrompt] {
        &self.0
    }

    pub fn into_prompts(self) -> Vec<JudgePrompt> {
        self.0
    }
}

impl FromIterator<JudgePrompt> for JudgeBatch {
    fn from_iter<I: IntoIterator<Item = JudgePrompt>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One reading-comprehension document as the harness hands it over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDoc {
    pub context: String,
    pub question: String,
    #[serde(default, alias = "gold_answers")]
    pub answers: GoldAnswers,
}
