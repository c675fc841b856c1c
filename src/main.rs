use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use url::Url;

use jobdesc_scraper::api::{ErrorResponse, SummaryRequest, SummaryResponse};
use jobdesc_scraper::{batch, server, Config, SummaryService};

#[derive(Parser)]
#[command(name = "jobdesc-scraper", about = "Extract job posting descriptions")]
struct Cli {
    /// Comma-separated strategy chain, overrides JOBDESC_STRATEGIES
    #[arg(long, global = true)]
    strategies: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize one posting and print the JSON result
    Fetch {
        url: Url,
        #[arg(long)]
        job_id: Option<String>,
    },
    /// Run the HTTP service
    Serve {
        /// Defaults to PORT
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Summarize every row of a job_id,apply_url CSV
    Batch {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(list) = &cli.strategies {
        config = config.with_strategies(list)?;
    }
    let service = SummaryService::from_config(&config)?;
    info!(strategies = ?service.strategies(), timeout_secs = config.timeout.as_secs(), "service ready");

    match cli.command {
        Commands::Fetch { url, job_id } => {
            let request = SummaryRequest { apply_url: url, job_id };
            match service.summarize(&request.apply_url).await {
                Ok(summary) => {
                    let response = SummaryResponse::new(&request, summary);
                    println!("{}", serde_json::to_string_pretty(&response)?);
                }
                Err(err) => {
                    println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&err))?);
                    std::process::exit(1);
                }
            }
        }
        Commands::Serve { port } => {
            server::serve(Arc::new(service), port.unwrap_or(config.port)).await?;
        }
        Commands::Batch { input, output } => {
            batch::run_files(&service, &input, &output).await?;
        }
    }

    Ok(())
}
