//! Terminal rendition of session actions

use portal_http::client::{ApiError, SessionAction, SessionListener};
use tracing::warn;

/// Reports session actions on stderr
///
/// A terminal has no sign-in view to navigate to, so `SignIn` becomes a hint
/// to run `portal login`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CliSessionListener;

impl SessionListener for CliSessionListener {
    fn on_session_action(&self, action: &SessionAction, error: &ApiError) {
        match action {
            SessionAction::SignIn { message, .. } => {
                warn!(kind = %error.kind, "Session ended");
                eprintln!("{message}");
                eprintln!("Run \"portal login\" to sign in.");
            }
            SessionAction::Forbidden { message, .. } | SessionAction::Notify { message } => {
                warn!(kind = %error.kind, status = ?error.status, "{}", error.message);
                eprintln!("{message}");
            }
        }
    }
}
