//! Shared fixtures for the client integration tests

#![allow(dead_code)]

use portal_core::{CredentialStore, Credentials, UserIdentity};
use portal_http::client::{ApiClient, ApiError, SessionAction, SessionListener};
use std::sync::{Arc, Mutex};
use wiremock::MockServer;

/// Listener that remembers every action it was given
#[derive(Default)]
pub struct RecordingListener {
    actions: Mutex<Vec<SessionAction>>,
}

impl RecordingListener {
    pub fn actions(&self) -> Vec<SessionAction> {
        self.actions.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.actions.lock().unwrap().len()
    }
}

impl SessionListener for RecordingListener {
    fn on_session_action(&self, action: &SessionAction, _error: &ApiError) {
        self.actions.lock().unwrap().push(action.clone());
    }
}

pub fn alice() -> UserIdentity {
    UserIdentity {
        user_id: "u-1".into(),
        username: "alice".into(),
        roles: vec!["DEVELOPER".into()],
        permissions: vec!["process:design".into()],
        ..Default::default()
    }
}

/// Store holding a signed-in session (`T1` / `R1`)
pub fn signed_in() -> CredentialStore {
    let store = CredentialStore::in_memory();
    store
        .save_login(
            &Credentials::issued_now("T1", Some("R1".into()), Some(3600)),
            Some(&alice()),
        )
        .unwrap();
    store
}

/// Store holding an access token but no refresh token
pub fn access_only() -> CredentialStore {
    let store = CredentialStore::in_memory();
    store
        .save_login(&Credentials::issued_now("T1", None, None), None)
        .unwrap();
    store
}

pub fn client(server: &MockServer, store: CredentialStore) -> (ApiClient, Arc<RecordingListener>) {
    let listener = Arc::new(RecordingListener::default());
    let client = ApiClient::builder()
        .base_url(server.uri())
        .credentials(store)
        .listener(listener.clone())
        .build()
        .unwrap();
    (client, listener)
}

/// Number of received requests to `path` that carried `Bearer <token>`
pub async fn requests_with_token(server: &MockServer, path: &str, token: &str) -> usize {
    let expected = format!("Bearer {token}");
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == path)
        .filter(|request| {
            request
                .headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                == Some(expected.as_str())
        })
        .count()
}

pub async fn requests_to(server: &MockServer, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == path)
        .count()
}
