//! Browser adapter for the portal client
//!
//! Wires [`ApiClient`] to `localStorage` and to browser navigation so web
//! front-ends share credentials under the same keys.

pub mod session;
pub mod storage;

pub use session::{BrowserSessionListener, Notice, NoticeLevel, clear_notifier, set_notifier};
pub use storage::LocalStorageStore;

use portal_core::CredentialStore;
use portal_http::{ApiClient, ClientConfig, ClientError};
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_web::MakeWebConsoleWriter;

/// Build a client for the page's origin
///
/// An empty base URL means the page origin; a path (`/api/admin-center`) is
/// resolved against it.
pub fn browser_client(mut config: ClientConfig) -> Result<ApiClient, ClientError> {
    let origin = web_sys::window().and_then(|w| w.location().origin().ok());
    config.base_url = resolve_base_url(&config.base_url, origin.as_deref());

    ApiClient::builder()
        .config(config)
        .credentials(CredentialStore::new(Arc::new(LocalStorageStore::new())))
        .listener(Arc::new(BrowserSessionListener))
        .build()
}

fn resolve_base_url(configured: &str, origin: Option<&str>) -> String {
    let configured = configured.trim();
    match origin {
        Some(origin) if configured.is_empty() => origin.to_string(),
        Some(origin) if configured.starts_with('/') => {
            format!("{}{}", origin.trim_end_matches('/'), configured)
        }
        _ => configured.to_string(),
    }
}

/// Route `tracing` output to the browser console
///
/// Returns false if a subscriber was already installed.
pub fn init_tracing() -> bool {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_writer(MakeWebConsoleWriter::new());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_ok()
}
