//! bgremove-studio CLI
//!
//! Feeds each input through one [`UploadPipeline`] in order, the way a user
//! would drop files onto the page one after another, and saves every result.

use super::config::CliConfigBuilder;
use crate::{
    backends::BorderKeyBackend,
    controller::{SubmitOutcome, UploadPipeline},
    services::{io::PathSource, progress::ConsoleProgressReporter},
    tracing_config::{events, init_cli_tracing, spans},
    view::ViewState,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn, Instrument};

/// Remove image backgrounds through the studio upload pipeline
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremove-studio")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input images (PNG, JPEG or WEBP), processed in order
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<PathBuf>,

    /// Directory for the processed images
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Output format [default: png]
    #[arg(short, long, value_enum)]
    pub format: Option<CliOutputFormat>,

    /// Encoder quality for lossy formats (0.0-1.0) [default: 0.8]
    #[arg(short, long)]
    pub quality: Option<f32>,

    /// Model preset (isnet, isnet_fp16, isnet_quint8) [default: isnet_quint8]
    #[arg(short, long)]
    pub model: Option<String>,

    /// Largest accepted input in bytes [default: 5242880]
    #[arg(long, value_name = "BYTES")]
    pub max_size: Option<u64>,

    /// JSON configuration file; flags override its values
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v: INFO, -vv: DEBUG, -vvv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON (needs the tracing-json feature)
    #[arg(long)]
    pub json_logs: bool,

    /// Print the final view state as JSON on stdout
    #[arg(long)]
    pub view_json: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    Jpeg,
    Webp,
}

/// Per-run counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id =
        init_cli_tracing(cli.verbose, cli.json_logs).context("Failed to initialize tracing")?;
    let span = spans::session(&session_id, "border-key");

    let summary = run(&cli).instrument(span).await?;
    if summary.failed > 0 {
        anyhow::bail!(
            "{} of {} input(s) failed",
            summary.failed,
            summary.succeeded + summary.failed
        );
    }
    Ok(())
}

/// Process every input of `cli` and save the results
pub async fn run(cli: &Cli) -> Result<RunSummary> {
    let config = CliConfigBuilder::from_cli(cli).context("Failed to build configuration")?;
    let pipeline = Arc::new(
        UploadPipeline::new(config, Arc::new(BorderKeyBackend::new()))
            .context("Failed to create pipeline")?
            .with_reporter(Arc::new(ConsoleProgressReporter::new(cli.verbose > 0))),
    );

    tokio::fs::create_dir_all(&cli.output)
        .await
        .with_context(|| format!("Failed to create output directory: {}", cli.output.display()))?;

    let mut summary = RunSummary::default();
    let batch = spans::batch_processing(cli.input.len());
    for input in &cli.input {
        let ok = process_one(&pipeline, input, &cli.output, !cli.no_progress)
            .instrument(batch.clone())
            .await;
        if ok {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }
    }

    if cli.view_json {
        let view = serde_json::to_string_pretty(&pipeline.view()).context("Failed to serialize view")?;
        println!("{}", view);
    }

    pipeline.teardown();
    info!(succeeded = summary.succeeded, failed = summary.failed, "Done");
    Ok(summary)
}

async fn process_one(pipeline: &Arc<UploadPipeline>, input: &Path, output_dir: &Path, show_progress: bool) -> bool {
    let source = match PathSource::open(input).await {
        Ok(source) => source,
        Err(e) => {
            error!("❌ {}: {}", input.display(), e);
            return false;
        },
    };

    let watcher = show_progress.then(|| watch_progress(pipeline, input));
    let result = pipeline.submit_file(&source).await;
    if let Some((bar, task)) = watcher {
        task.abort();
        bar.finish_and_clear();
    }

    match result {
        Ok(SubmitOutcome::Completed(_)) => match pipeline.save_download(output_dir).await {
            Ok(Some(path)) => {
                println!("✅ {} -> {}", input.display(), path.display());
                true
            },
            Ok(None) => {
                warn!("{}: result vanished before it could be saved", input.display());
                false
            },
            Err(e) => {
                events::error_with_context(&e, "saving result");
                false
            },
        },
        Ok(SubmitOutcome::Discarded) => {
            warn!("{}: processing was cancelled", input.display());
            false
        },
        Err(e) => {
            error!("❌ {}: {}", input.display(), e);
            false
        },
    }
}

/// Drive a progress bar from the pipeline's view subscription
fn watch_progress(pipeline: &Arc<UploadPipeline>, input: &Path) -> (ProgressBar, JoinHandle<()>) {
    let bar = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.set_message(input.display().to_string());

    let mut rx = pipeline.subscribe();
    let task_bar = bar.clone();
    let task = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let view: ViewState = rx.borrow_and_update().clone();
            if view.show_progress {
                task_bar.set_position(u64::from(view.progress_percent));
            }
        }
    });
    (bar, task)
}
