//! Client-side routing gated by login state.
//!
//! `build_routes` derives the whole table from the login flag; `Router`
//! keeps a table in step with a `SessionContext` and follows redirects.

pub mod router;
pub mod table;

pub use router::{Navigation, RedirectLoad, RouteError, RouteHooks, Router};
pub use table::{
    build_routes, Action, Element, Loader, Route, RouteMatch, RouteParams, RouteTable, View,
};
