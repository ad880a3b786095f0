//! CLI configuration utilities

use anyhow::{Context, Result};
use directories::ProjectDirs;
use portal_http::ClientConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the configuration file looked up in the data directory
pub const CONFIG_FILE: &str = "portal.toml";

/// File the session is persisted to
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Resolve the data directory: the explicit flag, then `PORTAL_STATE_DIR`,
/// then the platform data directory
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir;
    }
    if let Ok(dir) = std::env::var("PORTAL_STATE_DIR") {
        return PathBuf::from(dir);
    }
    match ProjectDirs::from("com", "Portal", "portal") {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => {
            warn!("Failed to determine platform-specific directories, using ./.portal");
            PathBuf::from(".portal")
        }
    }
}

/// Load the client configuration
///
/// Sources, lowest precedence first: built-in defaults, the configuration
/// file (`path` if given, otherwise an optional `portal.toml` in the data
/// directory), `PORTAL_*` environment variables (`PORTAL_PATHS__LOGIN` for
/// nested keys), and finally `base_url` from the command line.
pub fn load_client_config(
    path: Option<&Path>,
    data_dir: &Path,
    base_url: Option<String>,
) -> Result<ClientConfig> {
    let mut builder = config::Config::builder();

    builder = match path {
        Some(path) => builder.add_source(config::File::from(path)),
        None => builder.add_source(config::File::from(data_dir.join(CONFIG_FILE)).required(false)),
    };
    builder = builder.add_source(
        config::Environment::with_prefix("PORTAL")
            .prefix_separator("_")
            .separator("__"),
    );
    if let Some(url) = base_url {
        builder = builder.set_override("base_url", url)?;
    }

    let settings = builder.build().context("Failed to read configuration")?;
    let config: ClientConfig = settings
        .try_deserialize()
        .context("Invalid configuration")?;

    debug!(base_url = %config.base_url, "Loaded client configuration");
    Ok(config)
}
