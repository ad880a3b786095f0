//! Session consequences of failed calls
//!
//! The HTTP layer never touches UI state. It resolves a [`SessionAction`]
//! for every failed call and hands it to a [`SessionListener`] supplied by
//! the front-end, which performs the navigation or shows the message.

use super::config::Routes;
use super::error::{ApiError, ErrorKind};
use tracing::{info, warn};

/// What the front-end should do about a failed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Credentials were cleared; send the user to the sign-in view
    SignIn { route: String, message: String },
    /// Signed in but not allowed; credentials are kept
    Forbidden {
        route: Option<String>,
        message: String,
    },
    /// Show the message, nothing else
    Notify { message: String },
}

impl SessionAction {
    pub fn clears_credentials(&self) -> bool {
        matches!(self, Self::SignIn { .. })
    }

    pub fn route(&self) -> Option<&str> {
        match self {
            Self::SignIn { route, .. } => Some(route),
            Self::Forbidden { route, .. } => route.as_deref(),
            Self::Notify { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::SignIn { message, .. }
            | Self::Forbidden { message, .. }
            | Self::Notify { message } => message,
        }
    }
}

/// Decide the session consequence of `error`
///
/// A 403 without a stored token is treated as "not signed in": backends
/// that conflate the two answer 403 to anonymous requests.
pub fn resolve_action(error: &ApiError, has_token: bool, routes: &Routes) -> SessionAction {
    let message = error.user_message();
    match error.kind {
        ErrorKind::Unauthenticated => SessionAction::SignIn {
            route: routes.login.clone(),
            message,
        },
        ErrorKind::PermissionDenied if !has_token => SessionAction::SignIn {
            route: routes.login.clone(),
            message: "Please sign in to continue.".to_string(),
        },
        ErrorKind::PermissionDenied => SessionAction::Forbidden {
            route: routes.forbidden.clone(),
            message,
        },
        _ => SessionAction::Notify { message },
    }
}

/// Decide the consequence of a rejected sign-in
///
/// The stored session stays as it is and the user sees why the credentials
/// were refused.
pub fn resolve_sign_in_action(error: &ApiError) -> SessionAction {
    let message = match error.kind {
        ErrorKind::Unauthenticated | ErrorKind::PermissionDenied => {
            if error.message.trim().is_empty() {
                "Invalid username or password.".to_string()
            } else {
                error.message.clone()
            }
        }
        _ => error.user_message(),
    };
    SessionAction::Notify { message }
}

/// Receives the session consequence of every failed call, exactly once per
/// call
pub trait SessionListener: Send + Sync {
    fn on_session_action(&self, action: &SessionAction, error: &ApiError);
}

/// Listener that only records actions in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogListener;

impl SessionListener for LogListener {
    fn on_session_action(&self, action: &SessionAction, error: &ApiError) {
        match action {
            SessionAction::SignIn { route, .. } => {
                info!("Session ended ({}), sign-in required at {route}", error.kind);
            }
            SessionAction::Forbidden { message, .. } => warn!("Access denied: {message}"),
            SessionAction::Notify { message } => warn!("Request failed: {message}"),
        }
    }
}
