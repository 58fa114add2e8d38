//! judge-eval CLI
//!
//! Offline batch judging over a JSONL file of examples.
//!
//! Run with: judge-eval score --input predictions.jsonl

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use judge_eval::{
    eval::{print_eval_report, EvalReport, ItemInput},
    load_records, parse_score, process_results, ExampleMetrics, JudgeAggregator, JudgeBatch,
    JudgeClient, JudgePrompt, JudgeSettings,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "judge-eval", version, about = "Score model answers with an LLM judge")]
struct Cli {
    /// Log per-call details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Judge every example in a JSONL file and report the mean score
    Score(ScoreArgs),

    /// Print the judge prompts for a JSONL file without calling the judge
    Prompts {
        #[arg(short, long)]
        input: PathBuf,

        /// Only print the first N prompts
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show the score the parser extracts from a judge reply
    Parse {
        #[arg(required = true)]
        reply: Vec<String>,
    },
}

#[derive(clap::Args)]
struct ScoreArgs {
    /// JSONL file: context, question, answers, prediction per line
    #[arg(short, long)]
    input: PathBuf,

    /// Maximum concurrent judge calls; overrides JUDGE_MAX_WORKERS, zero is ignored
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    base_url: Option<String>,

    /// Write the full JSON report here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the JSON report instead of the summary
    #[arg(long)]
    json: bool,

    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Score(args) => run_score(args).await,
        Command::Prompts { input, limit } => run_prompts(input, limit),
        Command::Parse { reply } => run_parse(&reply.join(" ")),
    }
}

async fn run_score(args: ScoreArgs) -> Result<()> {
    let records = load_records(&args.input)?;
    tracing::info!("Loaded {} examples from {:?}", records.len(), args.input);

    let settings = Arc::new(settings_for(&args));

    let metrics: Vec<ExampleMetrics> = records
        .iter()
        .map(|r| process_results(&r.doc, std::slice::from_ref(&r.prediction)))
        .collect();
    let batch: JudgeBatch = metrics
        .iter()
        .map(|m| JudgePrompt::from(m.judge_score.as_str()))
        .collect();

    let items: Vec<ItemInput<'_>> = records
        .iter()
        .zip(metrics.iter())
        .zip(batch.prompts())
        .map(|((record, m), prompt)| ItemInput {
            id: record.id.as_deref(),
            prompt,
            exact_match: Some(m.exact_match),
        })
        .collect();

    let client = JudgeClient::new(Arc::clone(&settings))?;
    let aggregator = JudgeAggregator::new(client).with_progress(!args.no_progress && !args.json);
    let result = aggregator.run(batch.prompts().to_vec()).await;

    let report = EvalReport::new(&settings, aggregator.max_workers(), &items, result);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_eval_report(&report);
    }

    if let Some(path) = args.output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        eprintln!("Report written to {}", path.display());
    }

    Ok(())
}

/// Environment settings with command-line flags layered on top
fn settings_for(args: &ScoreArgs) -> JudgeSettings {
    let mut settings = JudgeSettings::from_env();
    if let Some(model) = &args.model {
        settings = settings.with_model(model.clone());
    }
    if let Some(url) = &args.base_url {
        settings = settings.with_base_url(url.clone());
    }
    settings.with_worker_override(args.workers)
}

fn run_prompts(input: PathBuf, limit: Option<usize>) -> Result<()> {
    let records = load_records(&input)?;
    let take = limit.unwrap_or(records.len());

    for (i, record) in records.iter().take(take).enumerate() {
        let metrics = process_results(&record.doc, std::slice::from_ref(&record.prediction));
        let label = record.id.clone().unwrap_or_else(|| format!("#{}", i + 1));
        println!("───── {} ─────", label);
        println!("{}", metrics.judge_score);
    }

    Ok(())
}

fn run_parse(reply: &str) -> Result<()> {
    match parse_score(reply) {
        Some(score) => println!("{}", score),
        None => println!("no score in [0, 1] found (counts as 0.00)"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_args(argv: &[&str]) -> ScoreArgs {
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Score(args) => args,
            _ => panic!("expected score command"),
        }
    }

    #[test]
    fn test_workers_flag_does_not_read_env() {
        std::env::set_var("JUDGE_MAX_WORKERS", "many");
        let args = score_args(&["judge-eval", "score", "--input", "in.jsonl"]);
        assert_eq!(args.workers, None);
        assert_eq!(settings_for(&args).max_workers, 10);
        std::env::remove_var("JUDGE_MAX_WORKERS");
    }

    #[test]
    fn test_zero_workers_flag_keeps_default() {
        let args = score_args(&["judge-eval", "score", "-i", "in.jsonl", "--workers", "0"]);
        assert_eq!(args.workers, Some(0));
        assert_eq!(
            JudgeSettings::default().with_worker_override(args.workers).max_workers,
            10
        );

        let args = score_args(&["judge-eval", "score", "-i", "in.jsonl", "--workers", "4"]);
        assert_eq!(settings_for(&args).max_workers, 4);
    }
}
