use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use crate::api::ApiError;
use crate::auth::SessionContext;

use super::table::{build_routes, Action, Element, Loader, RouteParams, RouteTable, View};

/// Upper bound on redirects followed by a single navigation
const MAX_REDIRECTS: usize = 8;

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("Too many redirects starting from {0}")]
    TooManyRedirects(String),

    #[error("Route {0} has no action")]
    NoAction(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Loaders and actions are supplied by the route modules that own them.
pub trait RouteHooks: Send + Sync {
    fn load<'a>(
        &'a self,
        loader: Loader,
        params: &'a RouteParams,
    ) -> BoxFuture<'a, Result<Value, ApiError>>;

    fn act<'a>(
        &'a self,
        action: Action,
        params: &'a RouteParams,
        form: Value,
    ) -> BoxFuture<'a, Result<Value, ApiError>>;
}

/// Loader declared on a route that redirected elsewhere.
///
/// Such a loader still runs before the redirect takes effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectLoad {
    pub location: String,
    pub loader: Loader,
    pub params: RouteParams,
}

/// Where a navigation ended up after following redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// Final location
    pub location: String,
    /// Locations redirected away from, in order
    pub redirected_from: Vec<String>,
    /// Loaders of redirecting routes, in the order they were passed
    pub redirect_loads: Vec<RedirectLoad>,
    pub view: Option<View>,
    pub loader: Option<Loader>,
    pub action: Option<Action>,
    pub params: RouteParams,
}

impl Navigation {
    pub fn was_redirected(&self) -> bool {
        !self.redirected_from.is_empty()
    }

    /// Run the route's loader, if it has one.
    pub async fn load(&self, hooks: &dyn RouteHooks) -> Result<Option<Value>, RouteError> {
        match self.loader {
            Some(loader) => Ok(Some(hooks.load(loader, &self.params).await?)),
            None => Ok(None),
        }
    }

    /// Run the loaders of the routes redirected through, in order.
    pub async fn load_redirects(&self, hooks: &dyn RouteHooks) -> Result<Vec<Value>, RouteError> {
        let mut loaded = Vec::with_capacity(self.redirect_loads.len());
        for pending in &self.redirect_loads {
            loaded.push(hooks.load(pending.loader, &pending.params).await?);
        }
        Ok(loaded)
    }

    /// Run the route's action with submitted form data.
    pub async fn submit(&self, hooks: &dyn RouteHooks, form: Value) -> Result<Value, RouteError> {
        let action = self
            .action
            .ok_or_else(|| RouteError::NoAction(self.location.clone()))?;
        Ok(hooks.act(action, &self.params, form).await?)
    }
}

/// Route table bound to a session's login state.
///
/// The table is rebuilt from scratch whenever a login-state-changed event
/// has fired since the last look.
pub struct Router {
    login_state: watch::Receiver<bool>,
    table: RouteTable,
}

impl Router {
    pub fn new(session: &SessionContext) -> Self {
        let mut login_state = session.subscribe();
        let logged_in = *login_state.borrow_and_update();
        Self {
            login_state,
            table: build_routes(logged_in),
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Rebuild the table if the login state changed. Returns whether it did.
    pub fn sync(&mut self) -> bool {
        if !self.login_state.has_changed().unwrap_or(false) {
            return false;
        }
        let logged_in = *self.login_state.borrow_and_update();
        self.rebuild(logged_in)
    }

    /// Wait for the next login-state change and rebuild.
    ///
    /// Returns `false` once the session has gone away.
    pub async fn changed(&mut self) -> bool {
        if self.login_state.changed().await.is_err() {
            return false;
        }
        let logged_in = *self.login_state.borrow_and_update();
        self.rebuild(logged_in);
        true
    }

    fn rebuild(&mut self, logged_in: bool) -> bool {
        if self.table.logged_in() == logged_in {
            return false;
        }
        debug!(logged_in, "Rebuilding route table");
        self.table = build_routes(logged_in);
        true
    }

    /// Resolve `location`, following redirects.
    pub fn navigate(&mut self, location: &str) -> Result<Navigation, RouteError> {
        self.sync();

        let mut current = location.to_string();
        let mut redirected_from = Vec::new();
        let mut redirect_loads = Vec::new();
        loop {
            let matched = self.table.resolve(&current);
            match matched.route.element {
                Some(Element::Redirect { to, .. }) => {
                    if redirected_from.len() >= MAX_REDIRECTS {
                        return Err(RouteError::TooManyRedirects(location.to_string()));
                    }
                    debug!(from = %current, to, "Redirecting");
                    if let Some(loader) = matched.route.loader {
                        redirect_loads.push(RedirectLoad {
                            location: current.clone(),
                            loader,
                            params: matched.params,
                        });
                    }
                    redirected_from.push(std::mem::replace(&mut current, to.to_string()));
                }
                element => {
                    let view = match element {
                        Some(Element::View(view)) => Some(view),
                        _ => None,
                    };
                    return Ok(Navigation {
                        location: current,
                        redirected_from,
                        redirect_loads,
                        view,
                        loader: matched.route.loader,
                        action: matched.route.action,
                        params: matched.params,
                    });
                }
            }
        }
    }
}
