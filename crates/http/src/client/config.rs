//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Endpoints of the authentication API, relative to the base URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthPaths {
    pub login: String,
    pub refresh: String,
    pub logout: String,
    pub me: String,
    pub validate: String,
}

impl Default for AuthPaths {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            refresh: "/auth/refresh".to_string(),
            logout: "/auth/logout".to_string(),
            me: "/auth/me".to_string(),
            validate: "/auth/validate".to_string(),
        }
    }
}

/// Front-end routes the session layer navigates to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Routes {
    /// Sign-in entry point
    pub login: String,
    /// Dedicated "forbidden" view; `None` keeps the user where they are
    pub forbidden: Option<String>,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            forbidden: Some("/403".to_string()),
        }
    }
}

/// Configuration for one backend client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base address every request path is appended to
    pub base_url: String,

    /// Request timeout in seconds (0 disables the timeout)
    pub timeout_secs: u64,

    pub user_agent: String,

    /// Header carrying the signed-in user's id
    pub user_id_header: String,

    pub paths: AuthPaths,

    pub routes: Routes,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: 30,
            user_agent: format!("portal-client/{}", env!("CARGO_PKG_VERSION")),
            user_id_header: "X-User-Id".to_string(),
            paths: AuthPaths::default(),
            routes: Routes::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}
