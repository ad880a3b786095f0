//! Authentication API client methods

use super::error::{ApiError, ClientError, ErrorKind};
use super::{ApiClient, ApiRequest, envelope};
use crate::types::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse};
use portal_core::{Credentials, UserIdentity};
use reqwest::header;
use tracing::{debug, info, warn};

impl ApiClient {
    /// Sign in and persist the issued session
    ///
    /// Rejected credentials are reported with the server's reason and leave
    /// any stored session untouched; no token refresh is attempted.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let request = ApiRequest::post(self.config.paths.login.as_str())
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })?
            .sign_in();
        let response: LoginResponse = self.send(request).await?;

        let credentials = Credentials::issued_now(
            response.access_token.clone(),
            response.refresh_token.clone(),
            response.expires_in,
        );
        self.credentials
            .save_login(&credentials, response.user.as_ref())?;

        info!(username, "Signed in");
        Ok(response)
    }

    /// Renew the access token now, sharing any renewal already in flight
    pub async fn refresh_session(&self) -> Result<String, ClientError> {
        self.refresh
            .run(|| self.request_refresh())
            .await
            .map_err(|error| self.fail(error))
    }

    /// Sign out
    ///
    /// The server is told on a best-effort basis; local credentials are
    /// cleared whatever it answers. Signing out twice is harmless.
    pub async fn logout(&self) -> Result<(), ClientError> {
        if let Some(token) = self.credentials.access_token() {
            let result = self
                .http
                .post(self.url(&self.config.paths.logout))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => debug!("Server session closed"),
                Ok(response) => warn!(status = %response.status(), "Logout rejected by server"),
                Err(e) => warn!("Logout request failed: {e}"),
            }
        }

        self.credentials.clear()?;
        info!("Signed out");
        Ok(())
    }

    /// Fetch the signed-in user and refresh the stored copy
    pub async fn current_user(&self) -> Result<UserIdentity, ClientError> {
        let user: UserIdentity = self.get(&self.config.paths.me).await?;
        if let Err(e) = self.credentials.save_user(&user) {
            warn!("Failed to store user identity: {e}");
        }
        Ok(user)
    }

    /// Ask the server whether the stored access token is still valid
    pub async fn validate_token(&self) -> Result<bool, ClientError> {
        if !self.credentials.is_authenticated() {
            return Ok(false);
        }
        let request = ApiRequest::get(self.config.paths.validate.as_str()).skip_refresh();
        self.send(request).await
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_authenticated()
    }

    /// Identity stored at sign-in
    pub fn identity(&self) -> Option<UserIdentity> {
        self.credentials.user()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.credentials.has_permission(permission)
    }

    /// Exchange the stored refresh token for a new access token
    ///
    /// Issued directly on the HTTP client so a rejected refresh never
    /// re-enters 401 handling. Every failure is reported as
    /// [`ErrorKind::Unauthenticated`].
    pub(crate) async fn request_refresh(&self) -> Result<String, ApiError> {
        let Some(refresh_token) = self.credentials.refresh_token() else {
            warn!("Access token rejected and no refresh token is stored");
            return Err(session_expired("No refresh token available"));
        };

        let response = self
            .http
            .post(self.url(&self.config.paths.refresh))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| session_expired(format!("Token refresh failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = envelope::error_body(status, &body);
            warn!(%status, "Token refresh rejected: {}", detail.message);
            return Err(session_expired(detail.message).with_trace_id(detail.trace_id));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| session_expired(format!("Invalid token refresh response: {e}")))?;

        let credentials = Credentials::issued_now(
            refreshed.access_token.clone(),
            refreshed.refresh_token,
            refreshed.expires_in,
        );
        if let Err(e) = self.credentials.save_credentials(&credentials) {
            warn!("Failed to store refreshed credentials: {e}");
        }
        if let Some(user) = &refreshed.user {
            if let Err(e) = self.credentials.save_user(user) {
                warn!("Failed to store user identity: {e}");
            }
        }

        info!("Access token refreshed");
        Ok(refreshed.access_token)
    }
}

fn session_expired(message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorKind::Unauthenticated, message).with_status(401)
}
