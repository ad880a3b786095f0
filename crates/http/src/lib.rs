//! Authenticated HTTP client for the portal front-ends
//!
//! [`ApiClient`] attaches the stored credentials to every call, renews an
//! expired access token once for any number of concurrent callers, replays
//! the rejected calls, and reports the session consequence of failures to a
//! [`SessionListener`](client::SessionListener).

pub mod client;
pub mod types;

pub use client::{
    ApiClient, ApiClientBuilder, ApiError, ApiRequest, ClientConfig, ClientError, ErrorKind,
    SessionAction, SessionListener,
};
pub use types::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse};
