//! The redpen binary reviews one essay and prints the result as JSON.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use redpen_core::ModelId;
use redpen_pipeline::client::OpenAiClient;
use redpen_pipeline::review::{ReviewOptions, ReviewPipeline};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Essay file to review (reads stdin when omitted)
    file: Option<PathBuf>,

    /// Also generate quizzes from the classified mistakes
    #[arg(long)]
    quiz: bool,

    /// Skip the teacher comment
    #[arg(long)]
    no_comment: bool,

    /// Also score the essay against the rubric
    #[arg(long)]
    score: bool,

    /// Skip the native rewrite and its expression notes
    #[arg(long)]
    no_native: bool,

    /// Model every consumer samples from
    #[arg(long, default_value = "gpt-4")]
    model: ModelId,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let essay_text = match &cli.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("reading stdin")?;
            buffer
        }
    };

    let options = ReviewOptions {
        quiz: cli.quiz,
        comment: !cli.no_comment,
        score: cli.score,
        native: !cli.no_native,
    };

    let client = OpenAiClient::from_env().context("building the API client")?;
    let review = ReviewPipeline::new(&client)
        .model(cli.model)
        .review(&essay_text, &options)
        .await
        .context("reviewing the essay")?;

    println!("{}", serde_json::to_string_pretty(&review)?);
    eprintln!(
        "{} calls, ${:.4}",
        review.usage.calls, review.usage.total_cost_usd
    );

    Ok(())
}
