//! Authenticated portal API client
//!
//! Every call goes through [`ApiClient::execute`]: the stored access token
//! and user id are attached, the response is classified, a 401 triggers one
//! coordinated token refresh and a single replay, and every failure is
//! reported once to the [`SessionListener`] before it is returned.

pub mod auth;
pub mod config;
pub mod directory;
pub mod envelope;
pub mod error;
pub mod refresh;
pub mod request;
pub mod session;

pub use config::{AuthPaths, ClientConfig, Routes};
pub use error::{ApiError, ClientError, ErrorKind};
pub use refresh::RefreshCoordinator;
pub use request::{ApiRequest, Body};
pub use session::{
    LogListener, SessionAction, SessionListener, resolve_action, resolve_sign_in_action,
};

use bytes::Bytes;
use portal_core::CredentialStore;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Client for one backend
///
/// Clones share the HTTP connection pool, the credential store and the
/// refresh coordinator. Separately built clients never share a coordinator.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    config: Arc<ClientConfig>,
    credentials: CredentialStore,
    listener: Arc<dyn SessionListener>,
    refresh: Arc<RefreshCoordinator>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("refresh", &self.refresh)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client with default configuration and in-memory credentials
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Turn a request description into a builder, attaching credentials
    fn build_request(&self, request: &ApiRequest, token: Option<&str>) -> RequestBuilder {
        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if !request.headers.is_empty() {
            builder = builder.headers(request.headers.clone());
        }
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(user) = self.credentials.user() {
            if !user.user_id.is_empty() {
                builder = builder.header(self.config.user_id_header.as_str(), user.user_id);
            }
        }

        match &request.body {
            Some(Body::Json(value)) => builder.json(value),
            Some(Body::Bytes { data, content_type }) => builder
                .header(header::CONTENT_TYPE, content_type.as_str())
                .body(data.clone()),
            None => builder,
        }
    }

    /// Issue `request`, renewing the token and replaying once on 401
    async fn execute(&self, request: &ApiRequest) -> Result<Response, ClientError> {
        let mut token = self.credentials.access_token();
        let mut retried = false;

        loop {
            debug!(
                method = %request.method,
                path = %request.path,
                retried,
                "Dispatching request"
            );

            let response = match self.build_request(request, token.as_deref()).send().await {
                Ok(response) => response,
                Err(e) => return Err(self.fail_request(request, ApiError::network(&e))),
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::UNAUTHORIZED && !request.skip_refresh && !retried {
                // Flag before renewing so a replay that fails again is terminal
                retried = true;
                match self.renew_token(token.as_deref()).await {
                    Ok(fresh) => {
                        token = Some(fresh);
                        continue;
                    }
                    Err(error) => return Err(self.fail(error)),
                }
            }

            return Err(self.fail_request(request, classify_response(response).await));
        }
    }

    /// Token to replay a rejected request with
    ///
    /// When the store already holds a different token than the one the
    /// request carried, another request renewed it in the meantime and no
    /// refresh is needed. The check is repeated once this request leads a
    /// refresh, since a renewal may have settled just before it joined.
    async fn renew_token(&self, rejected: Option<&str>) -> Result<String, ApiError> {
        if let Some(current) = self.renewed_since(rejected) {
            return Ok(current);
        }
        self.refresh
            .run(|| async move {
                match self.renewed_since(rejected) {
                    Some(current) => Ok(current),
                    None => self.request_refresh().await,
                }
            })
            .await
    }

    /// Stored token, if it is no longer the `rejected` one
    fn renewed_since(&self, rejected: Option<&str>) -> Option<String> {
        let current = self.credentials.access_token()?;
        if rejected == Some(current.as_str()) {
            return None;
        }
        debug!("Access token was renewed concurrently, replaying");
        Some(current)
    }

    /// Apply the session consequence of a failure and wrap it for the caller
    fn fail(&self, error: ApiError) -> ClientError {
        let has_token = self.credentials.is_authenticated();
        let action = resolve_action(&error, has_token, &self.config.routes);

        if action.clears_credentials() {
            if let Err(e) = self.credentials.clear() {
                warn!("Failed to clear credentials: {e}");
            }
        }
        self.report(&action, error)
    }

    /// Like [`fail`](Self::fail), but a rejected sign-in keeps the stored
    /// session
    fn fail_request(&self, request: &ApiRequest, error: ApiError) -> ClientError {
        if request.sign_in {
            let action = resolve_sign_in_action(&error);
            self.report(&action, error)
        } else {
            self.fail(error)
        }
    }

    /// Hand `action` to the listener once and mark `error` as handled
    fn report(&self, action: &SessionAction, mut error: ApiError) -> ClientError {
        debug!(kind = %error.kind, status = ?error.status, "Request failed");
        self.listener.on_session_action(action, &error);
        error.handled = true;
        ClientError::Api(error)
    }

    /// Issue a request and return the response body as JSON
    ///
    /// Empty bodies become `null`; non-JSON bodies are returned as a string.
    /// A 2xx body carrying an embedded error is reported as a failure.
    pub async fn send_value(&self, request: ApiRequest) -> Result<Value, ClientError> {
        let response = self.execute(&request).await?;
        let text = response
            .text()
            .await
            .map_err(|e| self.fail_request(&request, ApiError::network(&e)))?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text))
        };

        if let Some(error) = envelope::embedded_error(&body) {
            return Err(self.fail_request(&request, error));
        }
        Ok(body)
    }

    /// Issue a request and deserialize the response body
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let body = self.send_value(request).await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(ApiRequest::get(path).query(query)?).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::put(path).json(body)?).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(ApiRequest::delete(path)).await
    }

    /// POST raw bytes (file import, attachment upload)
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        data: impl Into<Bytes>,
        content_type: &str,
    ) -> Result<T, ClientError> {
        self.send(ApiRequest::post(path).bytes(data, content_type))
            .await
    }

    /// Issue a request and return the raw response body (file export)
    pub async fn download(&self, request: ApiRequest) -> Result<Bytes, ClientError> {
        let response = self.execute(&request).await?;
        response
            .bytes()
            .await
            .map_err(|e| self.fail_request(&request, ApiError::network(&e)))
    }
}

/// Classify a non-2xx response
async fn classify_response(response: Response) -> ApiError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();
    let detail = envelope::error_body(status, &body);

    ApiError::from_status(status, detail.message)
        .with_trace_id(detail.trace_id)
        .with_retry_after(retry_after)
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    config: ClientConfig,
    credentials: Option<CredentialStore>,
    listener: Option<Arc<dyn SessionListener>>,
}

impl ApiClientBuilder {
    /// Start from a complete configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_secs = timeout.as_secs();
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set the header that carries the signed-in user's id
    pub fn user_id_header(mut self, name: impl Into<String>) -> Self {
        self.config.user_id_header = name.into();
        self
    }

    pub fn paths(mut self, paths: AuthPaths) -> Self {
        self.config.paths = paths;
        self
    }

    pub fn routes(mut self, routes: Routes) -> Self {
        self.config.routes = routes;
        self
    }

    /// Use `credentials` instead of a fresh in-memory store
    pub fn credentials(mut self, credentials: CredentialStore) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Receive session actions (defaults to [`LogListener`])
    pub fn listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self.config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base_url is required".into()));
        }
        header::HeaderName::from_bytes(self.config.user_id_header.as_bytes()).map_err(|_| {
            ClientError::Configuration(format!(
                "invalid user id header name: {}",
                self.config.user_id_header
            ))
        })?;

        #[cfg_attr(target_arch = "wasm32", allow(unused_mut))]
        let mut client_builder = ClientBuilder::new().user_agent(self.config.user_agent.as_str());

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = self.config.timeout() {
            client_builder = client_builder.timeout(timeout);
        }

        let http = client_builder.build().map_err(ClientError::Build)?;
        let config = ClientConfig {
            base_url: base_url.clone(),
            ..self.config
        };

        Ok(ApiClient {
            http,
            base_url,
            config: Arc::new(config),
            credentials: self.credentials.unwrap_or_else(CredentialStore::in_memory),
            listener: self.listener.unwrap_or_else(|| Arc::new(LogListener)),
            refresh: Arc::new(RefreshCoordinator::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::{CoreResult, KeyValueStore, MemoryStore, keys};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose access token changes after the first read, as if another
    /// request finished renewing it in between
    struct RenewedAfterFirstRead {
        inner: MemoryStore,
        token_reads: AtomicUsize,
    }

    impl KeyValueStore for RenewedAfterFirstRead {
        fn get(&self, key: &str) -> CoreResult<Option<String>> {
            if key == keys::TOKEN && self.token_reads.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(Some("T1".to_string()));
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> CoreResult<()> {
            self.inner.set(key, value)
        }

        fn remove_keys(&self, keys: &[&str]) -> CoreResult<()> {
            self.inner.remove_keys(keys)
        }
    }

    #[tokio::test]
    async fn test_leader_rechecks_token_before_refreshing() {
        let inner = MemoryStore::new();
        inner.set(keys::TOKEN, "T2").unwrap();
        let store = CredentialStore::new(Arc::new(RenewedAfterFirstRead {
            inner,
            token_reads: AtomicUsize::new(0),
        }));

        // No refresh token and nothing listening: a refresh would fail
        let client = ApiClient::builder()
            .base_url("http://127.0.0.1:9")
            .credentials(store)
            .build()
            .unwrap();

        let token = client.renew_token(Some("T1")).await.unwrap();
        assert_eq!(token, "T2");
        assert!(!client.refresh_coordinator().is_refreshing());
    }

    #[tokio::test]
    async fn test_same_token_starts_refresh() {
        let store = CredentialStore::in_memory();
        store
            .save_credentials(&portal_core::Credentials::issued_now("T1", None, None))
            .unwrap();
        let client = ApiClient::builder()
            .base_url("http://127.0.0.1:9")
            .credentials(store)
            .build()
            .unwrap();

        let err = client.renew_token(Some("T1")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthenticated);
        assert_eq!(err.message, "No refresh token available");
    }
}
