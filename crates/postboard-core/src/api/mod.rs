//! REST API client module.
//!
//! This module provides the `ApiClient` for communicating with the postboard
//! API. All calls pass through the `AuthInterceptor`, which attaches the
//! bearer token, stores credentials returned in response bodies, and performs
//! a single silent refresh-and-retry when the server answers 401.

pub mod client;
pub mod error;
pub mod interceptor;
pub mod request;

pub use reqwest::Method;

pub use client::{ApiClient, LOGIN_PATH, REFRESH_PATH};
pub use error::ApiError;
pub use interceptor::{AuthInterceptor, Recovery, RefreshOutcome};
pub use request::{ApiRequest, ApiResponse};
