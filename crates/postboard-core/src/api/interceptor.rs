//! Authentication hooks wrapped around every API call.
//!
//! The request phase attaches the access credential. The response phase
//! stores any credentials a response body carries and, on a 401, walks the
//! refresh-and-retry state machine:
//!
//! ```text
//! Sent -> 2xx: Done
//!      -> 401: RefreshAttempted -> RetrySent -> Done | Failed
//!                               -> RefreshFailed -> Failed
//! ```
//!
//! The refresh call itself lives on [`ApiClient`](super::ApiClient); this
//! type owns the token bookkeeping on either side of it.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::{Credential, SessionContext};

use super::ApiError;

/// Result of the refresh call made during 401 recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The refresh endpoint answered 200
    Refreshed,
    /// Non-200 answer or transport failure
    Failed,
    /// No refresh credential to try with
    Unavailable,
}

/// What the client should do after 401 recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Re-issue the original request once
    Retry,
    /// Surface the original error
    Reject,
}

#[derive(Clone, Debug)]
pub struct AuthInterceptor {
    session: SessionContext,
}

impl AuthInterceptor {
    pub fn new(session: SessionContext) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Request phase: set the bearer header when an access credential exists.
    pub fn authorize(&self, headers: &mut HeaderMap) -> Result<(), ApiError> {
        if let Some(token) = self.session.tokens().get(Credential::Access) {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(())
    }

    /// Response phase, success path: persist `access`/`refresh` fields.
    ///
    /// Returns the credentials that were stored.
    pub fn capture(&self, body: &Value) -> Vec<Credential> {
        let mut captured = Vec::new();
        for credential in Credential::ALL {
            let value = body
                .get(credential.response_field())
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty());
            if let Some(value) = value {
                self.session.tokens().store(credential, value);
                captured.push(credential);
            }
        }

        if !captured.is_empty() {
            debug!(?captured, "Captured credentials from response body");
        }
        if captured.contains(&Credential::Access) {
            self.session.set_logged_in(true);
        }
        captured
    }

    /// First step of 401 handling: drop the access credential and hand back
    /// the refresh credential, if any.
    pub fn begin_recovery(&self) -> Option<String> {
        let tokens = self.session.tokens();
        if tokens.has(Credential::Access) {
            tokens.remove(Credential::Access);
        }
        tokens.get(Credential::Refresh)
    }

    /// Remaining 401 handling once the refresh outcome is known.
    ///
    /// The remember-me flag is cleared on every branch.
    pub fn finish_recovery(&self, outcome: RefreshOutcome, retryable: bool) -> Recovery {
        let tokens = self.session.tokens();
        let recovery = match outcome {
            RefreshOutcome::Refreshed if retryable => Recovery::Retry,
            RefreshOutcome::Refreshed | RefreshOutcome::Failed => {
                tokens.remove(Credential::Refresh);
                Recovery::Reject
            }
            RefreshOutcome::Unavailable => Recovery::Reject,
        };
        tokens.clear_remember_me();

        match recovery {
            Recovery::Retry => info!("Session refreshed, retrying request"),
            Recovery::Reject => {
                warn!(?outcome, retryable, "Could not recover from unauthorized response");
                self.session.set_logged_in(false);
            }
        }
        recovery
    }

    /// A retried request came back 401 as well. Terminal: nothing is
    /// refreshed or retried again.
    pub fn fail_retry(&self) {
        let tokens = self.session.tokens();
        tokens.remove_all();
        tokens.clear_remember_me();
        self.session.set_logged_in(false);
        warn!("Retried request was rejected, session cleared");
    }
}
