//! Revve developer CLI.
//!
//! Resolves call credentials for an assistant through the configured
//! credential strategy and prints them as JSON.

use clap::Parser;
use revve_api::Metadata;
use revve_call::{load_config, CallRequest, ConfigError, SdkConfig};
use std::process::ExitCode;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "revve.toml";

#[derive(Parser, Debug)]
#[command(name = "revve-cli")]
#[command(about = "Resolve Revve call credentials for an assistant", long_about = None)]
struct Cli {
    /// Configuration file. Falls back to REVVE_CONFIG_PATH, then revve.toml.
    #[arg(short, long)]
    config: Option<String>,

    /// Assistant to start the call with.
    #[arg(value_parser = parse_assistant_id)]
    assistant_id: String,

    /// Call metadata as key=value pairs.
    #[arg(value_parser = parse_metadata_entry)]
    metadata: Vec<(String, String)>,
}

impl Cli {
    fn request(&self) -> CallRequest {
        let metadata: Metadata = self.metadata.iter().cloned().collect();
        CallRequest {
            assistant_id: self.assistant_id.clone(),
            metadata: (!metadata.is_empty()).then_some(metadata),
        }
    }
}

fn parse_assistant_id(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("assistant id must not be empty".to_string());
    }
    Ok(value.to_string())
}

fn parse_metadata_entry(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(format!("expected key=value, got `{value}`")),
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Call(#[from] revve_call::CallError),

    #[error("failed to encode credentials: {0}")]
    Encode(#[from] serde_json::Error),
}

fn resolve_config_path(cli_path: Option<String>) -> (String, &'static str) {
    if let Some(path) = cli_path.filter(|value| !value.trim().is_empty()) {
        return (path, "cli-arg");
    }

    if let Ok(path) = std::env::var("REVVE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (path, "env-var");
        }
    }

    (DEFAULT_CONFIG_PATH.to_string(), "default")
}

fn init_tracing(config: &SdkConfig) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the credentials; logs go to stderr.
    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let request = cli.request();
    let (config_path, config_source) = resolve_config_path(cli.config);
    let config = load_config(Some(&config_path))?;
    init_tracing(&config);

    tracing::info!(
        source = config_source,
        path = %config_path,
        "resolved configuration path"
    );

    let source = config.credential_source()?;
    let credentials = source.credentials(&request).await?;

    tracing::info!(
        assistant_id = %request.assistant_id,
        server_url = credentials.server_url(),
        "resolved call credentials"
    );

    println!("{}", serde_json::to_string_pretty(&credentials)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
