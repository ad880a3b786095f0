//! Portal CLI - command-line client for the portal API

mod commands;
mod config;
mod logging;
mod session;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use portal_core::{CredentialStore, FileStore};
use portal_http::ApiClient;
use session::CliSessionListener;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, error};

#[derive(Parser)]
#[command(name = "portal")]
#[command(about = "Command-line client for the portal API")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Data directory for the stored session, configuration and logs
    #[arg(short = 'd', long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to portal.toml in the data directory)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the API (overrides the configuration file)
    #[arg(long, global = true, env = "PORTAL_BASE_URL")]
    base_url: Option<String>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "60")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = config::resolve_data_dir(cli.data_dir.clone());
    logging::init_logging(cli.log_level.clone().into(), &data_dir, cli.no_file_log)?;

    let client = match build_client(&cli, &data_dir) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to set up client: {e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };
    debug!(base_url = client.base_url(), data_dir = %data_dir.display(), "Client ready");

    // Execute command with optional timeout
    let result = if cli.timeout == 0 {
        cli.command.execute(&client).await
    } else {
        let timeout_duration = Duration::from_secs(cli.timeout);
        match tokio::time::timeout(timeout_duration, cli.command.execute(&client)).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!(
                "Command timed out after {} seconds",
                cli.timeout
            )),
        }
    };

    if let Err(e) = result {
        error!("Command failed: {e}");
        // The session listener already reported failed API calls
        let reported = e
            .downcast_ref::<portal_http::ClientError>()
            .is_some_and(portal_http::ClientError::is_handled);
        if !reported {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }

    Ok(())
}

fn build_client(cli: &Cli, data_dir: &Path) -> Result<ApiClient> {
    let config = config::load_client_config(cli.config.as_deref(), data_dir, cli.base_url.clone())?;
    let store = FileStore::open(data_dir.join(config::CREDENTIALS_FILE))?;

    let client = ApiClient::builder()
        .config(config)
        .credentials(CredentialStore::new(Arc::new(store)))
        .listener(Arc::new(CliSessionListener))
        .build()?;
    Ok(client)
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}
