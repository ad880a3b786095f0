//! Browser rendition of session actions
//!
//! Navigation goes through `window.location`; messages go to whatever
//! notifier the UI registered with [`set_notifier`].

use portal_http::client::{ApiError, SessionAction, SessionListener};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

/// Severity of a user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// Message for the UI to display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn for_action(action: &SessionAction) -> Self {
        let level = match action {
            SessionAction::SignIn { .. } => NoticeLevel::Warning,
            SessionAction::Forbidden { .. } | SessionAction::Notify { .. } => NoticeLevel::Error,
        };
        Self {
            level,
            message: action.message().to_string(),
        }
    }
}

thread_local! {
    /// Notifier registered by the UI
    static NOTIFIER: RefCell<Option<Rc<dyn Fn(&Notice)>>> = RefCell::new(None);
}

/// Register the function that displays messages
pub fn set_notifier(notifier: Rc<dyn Fn(&Notice)>) {
    NOTIFIER.with(|cb| {
        *cb.borrow_mut() = Some(notifier);
    });
}

/// Clear the notifier
pub fn clear_notifier() {
    NOTIFIER.with(|cb| {
        *cb.borrow_mut() = None;
    });
}

/// Show `notice` through the registered notifier; returns false when none is
/// registered
pub fn notify(notice: &Notice) -> bool {
    // Clone out of the cell so the notifier may re-register itself
    let notifier = NOTIFIER.with(|cb| cb.borrow().clone());
    match notifier {
        Some(notifier) => {
            notifier(notice);
            true
        }
        None => false,
    }
}

/// Whether navigating to `route` from `current_path` changes anything
fn needs_navigation(current_path: &str, route: &str) -> bool {
    let route_path = route.split(['?', '#']).next().unwrap_or(route);
    current_path != route_path
}

fn navigate(route: &str) {
    let Some(window) = web_sys::window() else {
        warn!("No window object, cannot navigate to {route}");
        return;
    };
    let location = window.location();
    let current = location.pathname().unwrap_or_default();
    if !needs_navigation(&current, route) {
        debug!("Already at {route}");
        return;
    }
    if let Err(e) = location.assign(route) {
        warn!("Navigation to {route} failed: {e:?}");
    }
}

/// Listener that navigates and notifies in the browser
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserSessionListener;

impl SessionListener for BrowserSessionListener {
    fn on_session_action(&self, action: &SessionAction, error: &ApiError) {
        debug!(kind = %error.kind, status = ?error.status, "Applying session action");

        let notice = Notice::for_action(action);
        if !notify(&notice) {
            warn!("{}", notice.message);
        }
        if let Some(route) = action.route() {
            navigate(route);
        }
    }
}
