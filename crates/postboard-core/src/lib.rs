//! Core library for postboard.
//!
//! - `auth`: credential storage and the session context
//! - `api`: the authenticated REST client and its interceptor chain
//! - `routes`: the login-gated route table and router
//! - `config`: on-disk configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod routes;

pub use api::{ApiClient, ApiError, ApiRequest, ApiResponse};
pub use auth::{Credential, SessionContext, TokenStore};
pub use config::Config;
pub use routes::{build_routes, Navigation, Router};
