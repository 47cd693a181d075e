mod config;
mod data;
mod error;
mod export;
mod processing;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use serde_json::json;

use config::FilterConfig;
use data::loader::{load_comments, load_questions};
use data::types::attach_comments;
use export::writer::export_time_series_with_comments;
use processing::align::link_comments_to_forecasts;
use processing::filter::filter_questions;

#[derive(Parser, Debug)]
#[command(name = "metaculus-timeseries")]
#[command(about = "Process Metaculus question/comment exports into forecast time series with comments attached")]
struct Args {
    /// Path to the questions JSON export
    #[arg(long)]
    questions: PathBuf,

    /// Path to the comments export (JSON file or directory)
    #[arg(long)]
    comments: PathBuf,

    /// Path to the output time-series JSON file
    #[arg(long)]
    output: PathBuf,

    /// Filter questions by status (e.g. open, resolved)
    #[arg(long)]
    status: Option<String>,

    /// Filter questions by tag
    #[arg(long)]
    tag: Option<String>,

    /// Filter questions by minimum number of forecasters
    #[arg(long)]
    min_forecasters: Option<i64>,

    /// Only include questions created at or after this date (ISO or YYYY-MM-DD)
    #[arg(long)]
    created_after: Option<String>,

    /// Only include questions created at or before this date (ISO or YYYY-MM-DD)
    #[arg(long)]
    created_before: Option<String>,

    /// Only include questions with (true) or without (false) resolution criteria
    #[arg(long)]
    has_resolution_criteria: Option<bool>,

    /// Only include questions with at least this many attached comments
    #[arg(long)]
    min_comments: Option<usize>,

    /// Optional TOML file with filter settings; CLI flags take precedence
    #[arg(long)]
    filter_file: Option<PathBuf>,
}

impl Args {
    fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            status: self.status.clone(),
            tag: self.tag.clone(),
            min_forecasters: self.min_forecasters,
            created_after: self.created_after.clone(),
            created_before: self.created_before.clone(),
            has_resolution_criteria: self.has_resolution_criteria,
            min_comments: self.min_comments,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let file_config = match &args.filter_file {
        Some(path) => FilterConfig::load(path)?,
        None => FilterConfig::default(),
    };
    let filter_config = args.filter_config().overlaid_on(file_config);
    let filter = filter_config.to_filter()?;

    let mut questions = load_questions(&args.questions)?;
    let comments = load_comments(&args.comments)?;
    tracing::info!(
        "Loaded {} questions and comments for {} questions",
        questions.len(),
        comments.len()
    );

    // The min_comments predicate reads the attached comment lists.
    attach_comments(&mut questions, &comments);

    let filtered = filter_questions(questions, &filter);
    tracing::info!("{} questions after filtering", filtered.len());

    let aligned = link_comments_to_forecasts(&filtered, &comments);
    if aligned.skipped_comments > 0 {
        tracing::warn!(
            "Skipped {} comments with missing or unparseable created_at",
            aligned.skipped_comments
        );
    }
    if aligned.dropped_snapshots > 0 {
        tracing::warn!(
            "Dropped {} forecast snapshots with unparseable end_time",
            aligned.dropped_snapshots
        );
    }

    let script = std::env::args()
        .next()
        .unwrap_or_else(|| "metaculus-timeseries".to_string());
    let params = json!({
        "questions": args.questions,
        "comments": args.comments,
        "output": args.output,
        "filters": filter_config,
    });
    export_time_series_with_comments(&aligned.series, &args.output, &script, &params, &filtered)?;

    Ok(())
}
