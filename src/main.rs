//! postvec - Batch pipeline for post and vocabulary embeddings

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use postvec::config::ARTIFACT_VAR;
use postvec::services::{ExportOptions, ExportStart};
use postvec::App;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "postvec",
    version,
    about = "Upload word-vector embeddings for blog posts to the table store"
)]
struct Cli {
    /// Settings file holding the store URL and service key
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Embedding artifact (.safetensors, .json or word-vector text)
    #[arg(long, global = true, env = ARTIFACT_VAR)]
    artifact: Option<PathBuf>,

    /// Vocabulary file for a .safetensors artifact [default: <stem>.vocab.json]
    #[arg(long, global = true)]
    vocab: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upsert every vocabulary token's vector into the embeddings table
    Vocab(VocabArgs),
    /// Upsert the table-wide mean vector row
    Mean,
    /// Embed every post and write the vectors back
    Posts,
}

#[derive(Args, Debug)]
struct VocabArgs {
    /// Rows per upsert request
    #[arg(long)]
    batch_size: Option<usize>,

    /// Pause between batches, in milliseconds
    #[arg(long)]
    pause_ms: Option<u64>,

    /// Skip this many entries (resume a previous export)
    #[arg(long, conflicts_with = "skip_fraction")]
    start_offset: Option<usize>,

    /// Skip this fraction of the entries, in [0, 1)
    #[arg(long)]
    skip_fraction: Option<f64>,
}

impl VocabArgs {
    fn options(&self, app: &App) -> ExportOptions {
        let mut options = ExportOptions::from(&app.settings().upload);
        if let Some(batch_size) = self.batch_size {
            options.batch_size = batch_size;
        }
        if let Some(pause_ms) = self.pause_ms {
            options.pause = Duration::from_millis(pause_ms);
        }
        options.start = match (self.start_offset, self.skip_fraction) {
            (Some(offset), _) => ExportStart::Offset(offset),
            (None, Some(fraction)) => ExportStart::Fraction(fraction),
            (None, None) => ExportStart::Beginning,
        };
        options
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    postvec::app::init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let app = App::bootstrap(cli.env_file.as_deref(), cli.artifact, cli.vocab).await?;
    let upload = app.upload_service();

    match cli.command {
        Command::Vocab(args) => {
            let report = upload.export_vocabulary(&args.options(&app)).await?;
            print_summary(&report)?;
            Ok(exit_code(report.is_success()))
        }
        Command::Mean => {
            upload.upsert_mean_embedding().await?;
            println!("Mean embedding written");
            Ok(ExitCode::SUCCESS)
        }
        Command::Posts => {
            let report = upload.populate_post_embeddings().await?;
            print_summary(&report)?;
            Ok(exit_code(report.is_success()))
        }
    }
}

fn print_summary<T: Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
