//! Application state for the command-line client.
//!
//! `App` wires the configuration, the session context, the API client and
//! the router together. Each command runs against one `App`.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use postboard_core::api::{ApiClient, ApiRequest, Method};
use postboard_core::auth::{Credential, Scope, SessionContext};
use postboard_core::config::Config;
use postboard_core::routes::{Navigation, Router};
use serde_json::Value;
use tracing::{debug, warn};

pub struct App {
    pub config: Config,
    pub session: SessionContext,
    pub api: ApiClient,
    pub router: Router,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let data_dir = Config::data_dir()?;
        debug!(?data_dir, "Data directory configured");
        let session = SessionContext::open(&data_dir).context("Failed to open token storage")?;

        let api_url = config.api_url();
        debug!(%api_url, "API base URL configured");
        let api = ApiClient::with_timeout(&api_url, session.clone(), config.request_timeout())?;
        let router = Router::new(&session);

        Ok(Self {
            config,
            session,
            api,
            router,
        })
    }

    /// Log in, falling back to the last used username.
    pub async fn login(&mut self, username: Option<String>, remember: bool) -> Result<()> {
        let username = match username.or_else(|| self.config.last_username.clone()) {
            Some(u) => u,
            None => prompt_username()?,
        };
        let password = rpassword::prompt_password(format!("Password for {}: ", username))
            .context("Failed to read password")?;

        self.api
            .authenticate(&username, &password, remember)
            .await
            .context("Login failed")?;

        self.config.last_username = Some(username);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
        Ok(())
    }

    pub fn logout(&self) {
        self.api.logout();
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        data: Option<&str>,
        retry: bool,
    ) -> Result<Value> {
        let mut request = ApiRequest::new(parse_method(method)?, path).retry(retry);
        if let Some(data) = data {
            let body: Value = serde_json::from_str(data).context("Request body is not valid JSON")?;
            request = request.body(body);
        }
        let response = self.api.send(&request).await?;
        Ok(response.body)
    }

    pub fn open(&mut self, location: &str) -> Result<Navigation> {
        Ok(self.router.navigate(location)?)
    }

    pub fn status(&self) -> String {
        let tokens = self.session.tokens();
        let mut out = String::new();
        let _ = writeln!(out, "API:         {}", self.api.base_url());
        let _ = writeln!(out, "Logged in:   {}", self.session.is_logged_in());
        let _ = writeln!(out, "Remember me: {}", tokens.remember_me());
        for credential in Credential::ALL {
            let scopes = describe_scopes(
                tokens.get_in(Scope::Persistent, credential).is_some(),
                tokens.get_in(Scope::Session, credential).is_some(),
            );
            let label = format!("{}:", credential);
            let _ = writeln!(out, "{:<12} {}", label, scopes);
        }
        out
    }
}

fn prompt_username() -> Result<String> {
    eprint!("Username: ");
    let mut username = String::new();
    std::io::stdin()
        .read_line(&mut username)
        .context("Failed to read username")?;
    let username = username.trim().to_string();
    if username.is_empty() {
        anyhow::bail!("Username is required");
    }
    Ok(username)
}

/// Parse an HTTP method name, case-insensitively
pub fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {}", method))
}

fn describe_scopes(persistent: bool, session: bool) -> &'static str {
    match (persistent, session) {
        (true, true) => "persistent + session",
        (true, false) => "persistent",
        (false, true) => "session",
        (false, false) => "absent",
    }
}

/// Message printed after a successful login.
///
/// Without remember-me the tokens live in the session scope, which is this
/// process's memory, so the next command starts logged out.
pub fn login_summary(remember: bool) -> &'static str {
    if remember {
        "Logged in"
    } else {
        "Logged in for this process only; pass --remember to stay logged in"
    }
}

/// Render a navigation result for the terminal
pub fn format_navigation(nav: &Navigation) -> String {
    let mut out = String::new();
    for from in &nav.redirected_from {
        let _ = writeln!(out, "redirect: {}", from);
    }
    for pending in &nav.redirect_loads {
        let _ = writeln!(out, "preload:  {:?} at {}", pending.loader, pending.location);
    }
    let _ = writeln!(out, "location: {}", nav.location);
    match nav.view {
        Some(view) => {
            let _ = writeln!(out, "view:     {}", view);
        }
        None => {
            let _ = writeln!(out, "view:     (none)");
        }
    }
    if let Some(loader) = nav.loader {
        let _ = writeln!(out, "loader:   {:?}", loader);
    }
    if let Some(action) = nav.action {
        let _ = writeln!(out, "action:   {:?}", action);
    }
    for (name, value) in &nav.params.params {
        let _ = writeln!(out, "param:    {} = {}", name, value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("get").unwrap(), Method::GET);
        assert_eq!(parse_method(" Post ").unwrap(), Method::POST);
        assert_eq!(parse_method("DELETE").unwrap(), Method::DELETE);
        assert!(parse_method("not a method").is_err());
    }

    #[test]
    fn test_describe_scopes() {
        assert_eq!(describe_scopes(false, false), "absent");
        assert_eq!(describe_scopes(true, false), "persistent");
        assert_eq!(describe_scopes(false, true), "session");
        assert_eq!(describe_scopes(true, true), "persistent + session");
    }

    #[test]
    fn test_format_navigation_redirect() {
        let session = SessionContext::in_memory();
        session.set_logged_in(true);
        let mut router = Router::new(&session);

        let nav = router.navigate("/register").unwrap();
        let rendered = format_navigation(&nav);
        assert!(rendered.contains("redirect: /register"));
        assert!(rendered.contains("location: /home"));
        assert!(rendered.contains("view:     feed"));
        assert!(rendered.contains("loader:   Feed"));
    }

    #[test]
    fn test_format_navigation_params() {
        let session = SessionContext::in_memory();
        let mut router = Router::new(&session);

        let nav = router.navigate("/posts/42/delete").unwrap();
        let rendered = format_navigation(&nav);
        assert!(rendered.contains("view:     (none)"));
        assert!(rendered.contains("param:    id = 42"));
        assert!(rendered.contains("action:   DeletePost"));
    }

    #[test]
    fn test_login_summary_warns_about_session_scope() {
        assert_eq!(login_summary(true), "Logged in");
        let summary = login_summary(false);
        assert!(summary.starts_with("Logged in"));
        assert!(summary.contains("--remember"));
    }

    #[test]
    fn test_format_navigation_lists_preloads() {
        let session = SessionContext::in_memory();
        let mut router = Router::new(&session);

        let nav = router.navigate("/posts/5/edit").unwrap();
        let rendered = format_navigation(&nav);
        assert!(rendered.contains("redirect: /posts/5/edit"));
        assert!(rendered.contains("preload:  PostForm at /posts/5/edit"));
        assert!(rendered.contains("location: /home"));
    }
}
