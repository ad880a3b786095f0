//! CLI commands

use anyhow::{Result, bail};
use clap::Subcommand;
use portal_core::UserIdentity;
use portal_http::client::{ApiClient, ApiRequest, ErrorKind};
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Password
        #[arg(short, long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Show the stored session
    Status,

    /// Call an API endpoint and print the JSON response
    Call {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,

        /// Path relative to the base URL
        path: String,

        /// Query parameter (repeatable)
        #[arg(short, long = "query", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        query: Vec<(String, String)>,

        /// JSON request body
        #[arg(long)]
        data: Option<String>,
    },
}

impl Commands {
    pub async fn execute(self, client: &ApiClient) -> Result<()> {
        match self {
            Commands::Login { username, password } => login(client, &username, &password).await,
            Commands::Logout => {
                client.logout().await?;
                println!("Signed out");
                Ok(())
            }
            Commands::Whoami => whoami(client).await,
            Commands::Status => {
                status(client);
                Ok(())
            }
            Commands::Call {
                method,
                path,
                query,
                data,
            } => call(client, &method, path, query, data).await,
        }
    }
}

async fn login(client: &ApiClient, username: &str, password: &str) -> Result<()> {
    let response = client.login(username, password).await?;
    let name = response
        .user
        .as_ref()
        .map_or(username, UserIdentity::display)
        .to_string();
    info!(base_url = client.base_url(), "Session stored");
    println!("Signed in as {name}");
    Ok(())
}

async fn whoami(client: &ApiClient) -> Result<()> {
    if !client.is_authenticated() {
        bail!("Not signed in");
    }
    let user = match client.current_user().await {
        Ok(user) => user,
        Err(e) if e.kind() == Some(ErrorKind::Network) => match client.identity() {
            Some(user) => {
                warn!("Server unreachable, showing stored identity");
                user
            }
            None => return Err(e.into()),
        },
        Err(e) => return Err(e.into()),
    };
    print_user(&user);
    Ok(())
}

fn status(client: &ApiClient) {
    let Some(credentials) = client.credentials().credentials() else {
        println!("Not signed in ({})", client.base_url());
        return;
    };

    println!("Signed in to {}", client.base_url());
    if let Some(user) = client.identity() {
        print_user(&user);
    }
    match credentials.expires_at {
        Some(at) if credentials.is_expired() => {
            println!("Access token expired at {at} (renewed on next call)")
        }
        Some(at) => println!("Access token expires at {at}"),
        None => println!("Access token expiry unknown"),
    }
    if credentials.refresh_token.is_none() {
        println!("No refresh token stored");
    }
}

fn print_user(user: &UserIdentity) {
    println!("{} ({})", user.display(), user.username);
    println!("  id:          {}", user.user_id);
    if let Some(email) = &user.email {
        println!("  email:       {email}");
    }
    println!("  roles:       {}", user.roles.join(", "));
    println!("  permissions: {}", user.permissions.join(", "));
}

async fn call(
    client: &ApiClient,
    method: &str,
    path: String,
    query: Vec<(String, String)>,
    data: Option<String>,
) -> Result<()> {
    let mut request = match method.to_ascii_uppercase().as_str() {
        "GET" => ApiRequest::get(path),
        "POST" => ApiRequest::post(path),
        "PUT" => ApiRequest::put(path),
        "PATCH" => ApiRequest::patch(path),
        "DELETE" => ApiRequest::delete(path),
        other => bail!("Unsupported method: {other}"),
    };
    for (key, value) in query {
        request = request.query_pair(key, value);
    }
    if let Some(data) = data {
        let body: Value = serde_json::from_str(&data)?;
        request = request.json(&body)?;
    }

    let response = client.send_value(request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Parse a `KEY=VALUE` pair
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}
