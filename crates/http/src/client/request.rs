//! Replayable request description

use super::error::ClientError;
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;

/// Request payload
#[derive(Debug, Clone)]
pub enum Body {
    Json(Value),
    /// Binary upload
    Bytes { data: Bytes, content_type: String },
}

/// A request that can be issued more than once
///
/// `reqwest::RequestBuilder` cannot always be cloned, and a request may have
/// to be replayed with a renewed token, so calls are described by this type
/// and turned into a builder per attempt.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Body>,
    pub(crate) skip_refresh: bool,
    pub(crate) sign_in: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            skip_refresh: false,
            sign_in: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Append one query parameter
    pub fn query_pair(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append the fields of a serializable struct as query parameters;
    /// `None` fields are left out
    pub fn query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Result<Self, ClientError> {
        match serde_json::to_value(query)? {
            Value::Object(fields) => {
                for (key, value) in fields {
                    match value {
                        Value::Null => {}
                        Value::String(text) => self.query.push((key, text)),
                        other => self.query.push((key, other.to_string())),
                    }
                }
                Ok(self)
            }
            Value::Null => Ok(self),
            _ => Err(ClientError::Configuration(
                "query parameters must serialize to an object".into(),
            )),
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = Some(Body::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    pub fn bytes(mut self, data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        self.body = Some(Body::Bytes {
            data: data.into(),
            content_type: content_type.into(),
        });
        self
    }

    /// Never attempt a token refresh for this request (sign-in and the
    /// refresh call itself)
    pub fn skip_refresh(mut self) -> Self {
        self.skip_refresh = true;
        self
    }

    /// Mark the request as a credential exchange
    ///
    /// No refresh is attempted, and a rejection is shown with the server's
    /// reason instead of ending the stored session.
    pub fn sign_in(mut self) -> Self {
        self.sign_in = true;
        self.skip_refresh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct GroupFilter<'a> {
        #[serde(rename = "type")]
        kind: Option<&'a str>,
        status: Option<&'a str>,
        page: u32,
    }

    #[test]
    fn test_query_skips_absent_fields() {
        let request = ApiRequest::get("/virtual-groups")
            .query(&GroupFilter {
                kind: Some("PROJECT"),
                status: None,
                page: 2,
            })
            .unwrap();

        let mut query = request.query.clone();
        query.sort();
        assert_eq!(
            query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("type".to_string(), "PROJECT".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_rejects_non_objects() {
        let result = ApiRequest::get("/roles").query(&["a", "b"]);
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[test]
    fn test_json_body_and_flags() {
        let request = ApiRequest::post("/auth/login")
            .json(&json!({"username": "alice"}))
            .unwrap()
            .skip_refresh();

        assert_eq!(request.method(), &Method::POST);
        assert!(request.skip_refresh);
        assert!(!request.sign_in);
        assert!(matches!(request.body, Some(Body::Json(_))));
    }

    #[test]
    fn test_sign_in_never_refreshes() {
        let request = ApiRequest::post("/auth/login").sign_in();
        assert!(request.sign_in);
        assert!(request.skip_refresh);
    }
}
