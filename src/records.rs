//! JSONL example files for offline judging
//!
//! One JSON object per line: the task document fields plus the model's
//! prediction. Blank lines are skipped.

use crate::types::TaskDoc;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A task document paired with the answer a model produced for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub doc: TaskDoc,
    #[serde(alias = "pred", alias = "pred_answer")]
    pub prediction: String,
}

/// Load every record from a JSONL file
pub fn load_records(path: &Path) -> Result<Vec<ExampleRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read examples from {}", path.display()))?;
    parse_records(&content).with_context(|| format!("Invalid examples file {}", path.display()))
}

/// Parse JSONL text into records
pub fn parse_records(content: &str) -> Result<Vec<ExampleRecord>> {
    let mut records = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: ExampleRecord = serde_json::from_str(line)
            .with_context(|| format!("line {}: not a valid example record", line_no + 1))?;
        records.push(record);
    }
    Ok(records)
}
