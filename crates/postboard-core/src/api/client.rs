//! API client for the postboard REST API.
//!
//! Every call goes through the [`AuthInterceptor`]: the access credential is
//! attached on the way out, credentials in response bodies are stored on the
//! way back, and a 401 triggers one silent refresh-and-retry cycle.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{Credential, SessionContext};

use super::interceptor::{AuthInterceptor, Recovery, RefreshOutcome};
use super::{ApiError, ApiRequest, ApiResponse};

// ============================================================================
// Constants
// ============================================================================

/// Token refresh endpoint, relative to the API base URL
pub const REFRESH_PATH: &str = "api/token/refresh/";

/// Token obtain (login) endpoint, relative to the API base URL
pub const LOGIN_PATH: &str = "api/token/";

/// Default HTTP request timeout in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Authenticated API client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    auth: AuthInterceptor,
}

impl ApiClient {
    /// Create a client for `base_url` with the default timeout
    pub fn new(base_url: &str, session: SessionContext) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, session, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: &str,
        session: SessionContext,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: Self::normalize_base(base_url)?,
            auth: AuthInterceptor::new(session),
        })
    }

    /// Create a client bound to another session, sharing the connection pool.
    pub fn with_session(&self, session: SessionContext) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            auth: AuthInterceptor::new(session),
        }
    }

    pub fn session(&self) -> &SessionContext {
        self.auth.session()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URLs are treated as directories so relative paths join below them.
    fn normalize_base(base_url: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(base_url)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Send a request through the full interceptor chain.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        match self.dispatch(request).await {
            Err(e) if e.is_unauthorized() => self.recover(request, e).await,
            other => other,
        }
    }

    /// Send a request and decode its body
    pub async fn fetch<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        self.send(request).await?.into_json()
    }

    /// One attempt: request phase, transport, success-path token capture.
    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url(&request.path)?;
        let mut headers = HeaderMap::new();
        self.auth.authorize(&mut headers)?;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        debug!(method = %request.method, path = %request.path, "Sending request");
        let response = builder.send().await?;
        let response = Self::check_response(response).await?;
        self.auth.capture(&response.body);
        Ok(response)
    }

    /// 401 handling: drop access, refresh, maybe retry once.
    async fn recover(&self, request: &ApiRequest, error: ApiError) -> Result<ApiResponse, ApiError> {
        debug!(method = %request.method, path = %request.path, retry = request.retry, "Unauthorized response");

        let outcome = match self.auth.begin_recovery() {
            Some(refresh) => self.refresh(&refresh).await,
            None => RefreshOutcome::Unavailable,
        };

        match self.auth.finish_recovery(outcome, request.retry) {
            Recovery::Retry => match self.dispatch(request).await {
                Err(e) if e.is_unauthorized() => {
                    self.auth.fail_retry();
                    Err(e)
                }
                other => other,
            },
            Recovery::Reject => Err(error),
        }
    }

    /// Call the refresh endpoint. Success is a 200; any new credentials are
    /// picked up by the regular body capture.
    async fn refresh(&self, refresh: &str) -> RefreshOutcome {
        let url = match self.url(REFRESH_PATH) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Invalid refresh URL");
                return RefreshOutcome::Failed;
            }
        };

        let response = match self
            .client
            .post(url)
            .json(&RefreshRequest { refresh })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh request failed");
                return RefreshOutcome::Failed;
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            warn!(%status, "Token refresh rejected");
            return RefreshOutcome::Failed;
        }

        match response.text().await {
            Ok(text) => {
                self.auth.capture(&Self::parse_body(&text));
            }
            Err(e) => warn!(error = %e, "Failed to read token refresh response"),
        }
        info!("Access token refreshed");
        RefreshOutcome::Refreshed
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<ApiResponse, ApiError> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &text));
        }
        Ok(ApiResponse {
            status,
            body: Self::parse_body(&text),
        })
    }

    /// JSON bodies decode as JSON, empty bodies as null, anything else as a
    /// plain string.
    fn parse_body(text: &str) -> Value {
        if text.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }

    // ===== Session Methods =====

    /// Log in with username and password.
    ///
    /// Any previous credentials are dropped first. The remember-me choice is
    /// recorded before the call so the issued tokens land in the right scope.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<(), ApiError> {
        let tokens = self.session().tokens();
        tokens.remove_all();
        if remember_me {
            tokens.set_remember_me();
        } else {
            tokens.clear_remember_me();
        }

        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest { username, password })?;
        self.dispatch(&request).await?;

        if !tokens.has(Credential::Access) {
            return Err(ApiError::InvalidResponse(
                "Login response did not include an access token".to_string(),
            ));
        }
        info!(username, remember_me, "Logged in");
        Ok(())
    }

    /// Forget all credentials locally.
    pub fn logout(&self) {
        self.session().clear();
        info!("Logged out");
    }
}
