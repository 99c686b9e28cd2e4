use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::ApiError;

/// Description of an outgoing API call.
///
/// Requests are rebuilt from this description on every attempt, so a retry
/// picks up whatever access credential is current at that moment.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `api/posts/5/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Re-issue once after a successful silent refresh
    pub retry: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retry: false,
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

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }
}

/// A successful API response with its decoded body.
///
/// Empty bodies decode to `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(self.body.clone())
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response body: {}", e)))
    }

    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        serde_json::from_value(self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response body: {}", e)))
    }

    /// String field at the top level of the body
    pub fn field(&self, name: &str) -> Option<&str> {
        self.body.get(name).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_builder_defaults() {
        let request = ApiRequest::get("api/posts/5/");
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "api/posts/5/");
        assert!(!request.retry);
        assert!(request.body.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let request = ApiRequest::post("api/posts/")
            .json(&json!({"text": "hello"}))
            .expect("encode")
            .query("page", "2")
            .retry(true);
        assert_eq!(request.body, Some(json!({"text": "hello"})));
        assert_eq!(request.query, vec![("page".to_string(), "2".to_string())]);
        assert!(request.retry);
    }

    #[test]
    fn test_response_decoding() {
        #[derive(Deserialize)]
        struct Post {
            id: i64,
        }

        let response = ApiResponse {
            status: StatusCode::OK,
            body: json!({"id": 5, "access": "a"}),
        };
        assert_eq!(response.json::<Post>().expect("decode").id, 5);
        assert_eq!(response.field("access"), Some("a"));
        assert_eq!(response.field("id"), None);
        assert!(response.json::<Vec<i64>>().is_err());
    }
}
