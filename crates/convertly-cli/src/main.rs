//! Convertly CLI: command-line client for the Convertly API.
//!
//! Set CONVERTLY_API_URL (or API_URL) to point at the server.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use convertly_api_client::ApiClient;
use convertly_cli::{init_tracing, options_from_args};
use convertly_core::{PollError, PollPolicy};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "convertly", about = "Convertly API CLI")]
struct Cli {
    /// API base URL
    #[arg(long, env = "CONVERTLY_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file and print its metadata
    Upload {
        /// Path to the file to upload
        file: PathBuf,
    },
    /// Upload a file and convert it
    Convert {
        /// Path to the file to convert
        file: PathBuf,
        /// Output format (pdf, docx) or conversion type (pdf-to-word)
        #[arg(long)]
        to: String,
        /// Conversion option as key=value, repeatable
        #[arg(long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,
        /// Return right after the job is created
        #[arg(long)]
        no_wait: bool,
        /// Save the result to this path once finished
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Convert several uploaded files in one request
    Batch {
        /// File UUIDs returned by `upload`
        #[arg(required = true)]
        file_ids: Vec<Uuid>,
        #[arg(long)]
        to: String,
        #[arg(long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,
    },
    /// Check the status of a conversion job once
    Status {
        /// Job UUID
        job_id: Uuid,
    },
    /// Poll a conversion job until it finishes
    Wait {
        /// Job UUID
        job_id: Uuid,
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
        #[arg(long, default_value = "60")]
        max_attempts: u32,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Cancel `token` on Ctrl+C so a running poll stops without further requests.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping");
            token.cancel();
        }
    });
}

async fn wait(
    client: &ApiClient,
    job_id: Uuid,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> anyhow::Result<convertly_api_client::JobStatusResponse> {
    match client.wait_for_job(job_id, policy, cancel).await {
        Ok(status) => Ok(status),
        Err(PollError::Request(e)) => Err(e.context("Failed to check job status")),
        Err(e) => bail!("Job {}: {}", job_id, e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let client = match cli.api_url {
        Some(url) => ApiClient::new(url),
        None => ApiClient::from_env(),
    }
    .context("Failed to create API client")?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match cli.command {
        Commands::Upload { file } => {
            let response = client.upload_file(&file).await?;
            print_json(&response)?;
        }
        Commands::Convert {
            file,
            to,
            options,
            no_wait,
            output,
        } => {
            let options = options_from_args(&options)?;
            let uploaded = client.upload_file(&file).await?;
            tracing::info!(file_id = %uploaded.id, "Uploaded {}", uploaded.name);

            let created = client.create_conversion(uploaded.id, &to, options).await?;
            if no_wait {
                print_json(&created)?;
                return Ok(());
            }

            let status = wait(&client, created.job_id, PollPolicy::single_job(), &cancel).await?;
            if let (Some(path), Some(url)) = (output, status.result_url.as_deref()) {
                let bytes = client.download(url).await?;
                tokio::fs::write(&path, bytes)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                tracing::info!("Saved {}", path.display());
            }
            print_json(&status)?;
        }
        Commands::Batch {
            file_ids,
            to,
            options,
        } => {
            let options = options_from_args(&options)?;
            let response = client.convert_batch(file_ids, &to, options).await?;
            print_json(&response)?;
        }
        Commands::Status { job_id } => {
            let response = client.get_status(job_id).await?;
            print_json(&response)?;
        }
        Commands::Wait {
            job_id,
            interval_ms,
            max_attempts,
        } => {
            let policy = PollPolicy::new(Duration::from_millis(interval_ms), max_attempts);
            let status = wait(&client, job_id, policy, &cancel).await?;
            print_json(&status)?;
        }
    }

    Ok(())
}
