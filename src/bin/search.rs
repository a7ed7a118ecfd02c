//! postvec-search - Ranks stored posts against a query and prints JSON
//!
//! Stdout carries exactly one JSON value: the ranked posts, or
//! `{"error": "..."}` with exit code 1.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use postvec::config::ARTIFACT_VAR;
use postvec::services::{SearchHit, SearchOutcome};
use postvec::App;

#[derive(Parser, Debug)]
#[command(
    name = "postvec-search",
    version,
    about = "Find the blog posts most similar to a query"
)]
struct SearchCli {
    /// Free-text query
    query: String,

    /// Maximum number of posts to return [default: 10]
    #[arg(allow_negative_numbers = true)]
    limit: Option<i64>,

    /// Settings file holding the store URL and service key
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Embedding artifact (.safetensors, .json or word-vector text)
    #[arg(long, env = ARTIFACT_VAR)]
    artifact: Option<PathBuf>,

    /// Vocabulary file for a .safetensors artifact [default: <stem>.vocab.json]
    #[arg(long)]
    vocab: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    postvec::app::init_tracing();

    let outcome = match SearchCli::try_parse() {
        Ok(cli) => SearchOutcome::from(search(cli).await),
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            ErrorKind::MissingRequiredArgument => SearchOutcome::failure("Query is required"),
            _ => SearchOutcome::failure(e.to_string().trim()),
        },
    };

    let json = match outcome.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("failed to render results: {}", e);
            SearchOutcome::failure("failed to render results")
                .to_json()
                .unwrap_or_default()
        }
    };
    println!("{}", json);

    if outcome.exit_code() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn search(cli: SearchCli) -> Result<Vec<SearchHit>> {
    let app = App::bootstrap(cli.env_file.as_deref(), cli.artifact, cli.vocab).await?;
    let limit = cli.limit.unwrap_or(app.settings().search.default_limit);
    app.search_service().search(&cli.query, limit).await
}
