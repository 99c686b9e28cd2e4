//! The client route table.
//!
//! [`build_routes`] is a pure function of the login flag. A handful of paths
//! swap their view for a redirect depending on that flag; everything else
//! renders the same either way. Unmatched paths redirect to `/`.

use std::collections::BTreeMap;
use std::fmt;

use percent_encoding::percent_decode_str;

/// Views the client can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Landing,
    /// Generic home page shown to anonymous visitors
    Home,
    Feed,
    Login,
    Register,
    Logout,
    ProfileDetail,
    ProfileEdit,
    Explore,
    Search,
    Liked,
    PostForm,
    PostDetail,
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::Landing => "landing",
            View::Home => "home",
            View::Feed => "feed",
            View::Login => "login",
            View::Register => "register",
            View::Logout => "logout",
            View::ProfileDetail => "profile-detail",
            View::ProfileEdit => "profile-edit",
            View::Explore => "explore",
            View::Search => "search",
            View::Liked => "liked",
            View::PostForm => "post-form",
            View::PostDetail => "post-detail",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Data fetched before a route renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Loader {
    Feed,
    ProfileDetail,
    ProfileUserDetail,
    ProfileEdit,
    Explore,
    Search,
    Liked,
    PostForm,
    PostDetail,
    DeletePost,
}

/// Mutation run when a route's form is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ProfileEdit,
    PostForm,
    PostDetail,
    DeletePost,
}

/// What a matched route produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    View(View),
    Redirect { to: &'static str, replace: bool },
}

impl Element {
    fn redirect(to: &'static str) -> Self {
        Element::Redirect { to, replace: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Slash-separated pattern; `:name` captures a segment
    pub pattern: &'static str,
    pub element: Option<Element>,
    pub loader: Option<Loader>,
    pub action: Option<Action>,
}

impl Route {
    fn new(pattern: &'static str, element: Element) -> Self {
        Self {
            pattern,
            element: Some(element),
            loader: None,
            action: None,
        }
    }

    fn view(pattern: &'static str, view: View) -> Self {
        Self::new(pattern, Element::View(view))
    }

    fn hooks_only(pattern: &'static str) -> Self {
        Self {
            pattern,
            element: None,
            loader: None,
            action: None,
        }
    }

    fn loader(mut self, loader: Loader) -> Self {
        self.loader = Some(loader);
        self
    }

    fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Match `segments` against this route, returning captured params and a
    /// rank. Static segments outrank captures and compare case-insensitively;
    /// captured segments are percent-decoded.
    fn matches(&self, segments: &[&str]) -> Option<(usize, BTreeMap<String, String>)> {
        let pattern: Vec<&str> = split_segments(self.pattern).collect();
        if pattern.len() != segments.len() {
            return None;
        }

        let mut rank = 1;
        let mut params = BTreeMap::new();
        for (expected, actual) in pattern.iter().zip(segments) {
            if let Some(name) = expected.strip_prefix(':') {
                let value = percent_decode_str(actual).decode_utf8_lossy();
                params.insert(name.to_string(), value.into_owned());
                rank += 3;
            } else if expected.eq_ignore_ascii_case(actual) {
                rank += 10;
            } else {
                return None;
            }
        }
        Some((rank, params))
    }
}

/// Captured path params and query string of a resolved location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    pub params: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
}

impl RouteParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: RouteParams,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    logged_in: bool,
    routes: Vec<Route>,
    /// Used when nothing in `routes` matches
    fallback: Route,
}

impl RouteTable {
    pub fn logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Resolve a location (path plus optional query) to its best route.
    pub fn resolve(&self, location: &str) -> RouteMatch<'_> {
        let (path, query) = split_location(location);
        let segments: Vec<&str> = split_segments(path).collect();

        let mut best: Option<(usize, &Route, BTreeMap<String, String>)> = None;
        for route in &self.routes {
            if let Some((rank, params)) = route.matches(&segments) {
                if best.as_ref().map_or(true, |(r, _, _)| rank > *r) {
                    best = Some((rank, route, params));
                }
            }
        }

        let (route, params) = match best {
            Some((_, route, params)) => (route, params),
            None => (&self.fallback, BTreeMap::new()),
        };
        RouteMatch {
            route,
            params: RouteParams {
                params,
                query: url::form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect(),
            },
        }
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn split_location(location: &str) -> (&str, &str) {
    let location = location.split('#').next().unwrap_or_default();
    match location.split_once('?') {
        Some((path, query)) => (path, query),
        None => (location, ""),
    }
}

/// Build the route table for the given login state.
pub fn build_routes(is_logged_in: bool) -> RouteTable {
    let home = if is_logged_in {
        Route::view("/home", View::Feed).loader(Loader::Feed)
    } else {
        Route::view("/home", View::Home)
    };

    let login = if is_logged_in {
        Route::new("/login", Element::redirect("/home"))
    } else {
        Route::view("/login", View::Login)
    };

    let register = if is_logged_in {
        Route::new("/register", Element::redirect("/home"))
    } else {
        Route::view("/register", View::Register)
    };

    let logout = if is_logged_in {
        Route::view("/logout", View::Logout)
    } else {
        Route::new("/logout", Element::redirect("/home"))
    };

    let edit_post = if is_logged_in {
        Route::view("/posts/:id/edit", View::PostForm)
            .loader(Loader::PostForm)
            .action(Action::PostForm)
    } else {
        Route::new(
            "/posts/:id/edit",
            Element::Redirect {
                to: "/home",
                replace: false,
            },
        )
        .loader(Loader::PostForm)
        .action(Action::PostForm)
    };

    let routes = vec![
        Route::view("/", View::Landing),
        home,
        login,
        register,
        logout,
        Route::view("/profiles/:id", View::ProfileDetail).loader(Loader::ProfileDetail),
        Route::view("/profiles/user", View::ProfileDetail).loader(Loader::ProfileUserDetail),
        Route::view("/profiles/edit", View::ProfileEdit)
            .loader(Loader::ProfileEdit)
            .action(Action::ProfileEdit),
        Route::view("/explore", View::Explore).loader(Loader::Explore),
        Route::view("/search", View::Search).loader(Loader::Search),
        Route::view("/liked", View::Liked).loader(Loader::Liked),
        Route::view("/posts/create", View::PostForm).action(Action::PostForm),
        Route::view("/posts/:id", View::PostDetail)
            .loader(Loader::PostDetail)
            .action(Action::PostDetail),
        Route::hooks_only("/posts/:id/delete")
            .loader(Loader::DeletePost)
            .action(Action::DeletePost),
        edit_post,
    ];

    RouteTable {
        logged_in: is_logged_in,
        routes,
        fallback: Route::new("*", Element::redirect("/")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(table: &RouteTable, path: &str) -> Option<Element> {
        table.resolve(path).route.element
    }

    #[test]
    fn test_login_gate() {
        assert_eq!(
            element(&build_routes(false), "/login"),
            Some(Element::View(View::Login))
        );
        assert_eq!(
            element(&build_routes(true), "/login"),
            Some(Element::Redirect { to: "/home", replace: true })
        );
    }

    #[test]
    fn test_register_and_logout_gates() {
        let anon = build_routes(false);
        let user = build_routes(true);

        assert_eq!(element(&anon, "/register"), Some(Element::View(View::Register)));
        assert!(matches!(element(&user, "/register"), Some(Element::Redirect { to: "/home", .. })));

        assert_eq!(element(&user, "/logout"), Some(Element::View(View::Logout)));
        assert!(matches!(element(&anon, "/logout"), Some(Element::Redirect { to: "/home", .. })));
    }

    #[test]
    fn test_home_swaps_view_and_loader() {
        let anon = build_routes(false).resolve("/home").route.clone();
        assert_eq!(anon.element, Some(Element::View(View::Home)));
        assert_eq!(anon.loader, None);

        let user = build_routes(true).resolve("/home").route.clone();
        assert_eq!(user.element, Some(Element::View(View::Feed)));
        assert_eq!(user.loader, Some(Loader::Feed));
    }

    #[test]
    fn test_edit_post_gate() {
        let user = build_routes(true);
        let m = user.resolve("/posts/7/edit");
        assert_eq!(m.route.element, Some(Element::View(View::PostForm)));
        assert_eq!(m.route.loader, Some(Loader::PostForm));
        assert_eq!(m.route.action, Some(Action::PostForm));
        assert_eq!(m.params.get("id"), Some("7"));

        let anon = build_routes(false);
        let m = anon.resolve("/posts/7/edit");
        assert_eq!(
            m.route.element,
            Some(Element::Redirect { to: "/home", replace: false })
        );
        assert_eq!(m.route.loader, Some(Loader::PostForm));
        assert_eq!(m.route.action, Some(Action::PostForm));
    }

    #[test]
    fn test_ungated_routes_are_identical() {
        let anon = build_routes(false);
        let user = build_routes(true);
        for path in [
            "/",
            "/profiles/3",
            "/profiles/user",
            "/profiles/edit",
            "/explore",
            "/search?q=rust",
            "/liked",
            "/posts/create",
            "/posts/9",
            "/posts/9/delete",
        ] {
            assert_eq!(anon.resolve(path).route, user.resolve(path).route, "{path}");
        }
    }

    #[test]
    fn test_unmatched_redirects_to_root() {
        for logged_in in [false, true] {
            let table = build_routes(logged_in);
            for path in ["/nope", "/posts", "/posts/1/2/3", "/profiles", "/home/extra"] {
                assert_eq!(
                    element(&table, path),
                    Some(Element::Redirect { to: "/", replace: true }),
                    "{path}"
                );
            }
        }
    }

    #[test]
    fn test_static_segments_outrank_params() {
        let table = build_routes(false);

        let m = table.resolve("/profiles/user");
        assert_eq!(m.route.loader, Some(Loader::ProfileUserDetail));
        assert!(m.params.params.is_empty());

        let m = table.resolve("/profiles/edit");
        assert_eq!(m.route.element, Some(Element::View(View::ProfileEdit)));

        let m = table.resolve("/profiles/12");
        assert_eq!(m.route.loader, Some(Loader::ProfileDetail));
        assert_eq!(m.params.get("id"), Some("12"));

        let m = table.resolve("/posts/create");
        assert_eq!(m.route.action, Some(Action::PostForm));
        assert_eq!(m.route.loader, None);
    }

    #[test]
    fn test_delete_route_has_no_view() {
        let routes = build_routes(true);
        let m = routes.resolve("/posts/4/delete");
        assert_eq!(m.route.element, None);
        assert_eq!(m.route.loader, Some(Loader::DeletePost));
        assert_eq!(m.route.action, Some(Action::DeletePost));
    }

    #[test]
    fn test_location_normalization() {
        let table = build_routes(false);
        assert_eq!(element(&table, ""), Some(Element::View(View::Landing)));
        assert_eq!(element(&table, "/login/"), Some(Element::View(View::Login)));
        assert_eq!(element(&table, "login"), Some(Element::View(View::Login)));
        assert_eq!(element(&table, "/login#top"), Some(Element::View(View::Login)));

        let m = table.resolve("/search?q=hello%20world&page=2");
        assert_eq!(m.route.element, Some(Element::View(View::Search)));
        assert_eq!(m.params.query_value("q"), Some("hello world"));
        assert_eq!(m.params.query_value("page"), Some("2"));
        assert_eq!(m.params.query_value("missing"), None);
    }

    #[test]
    fn test_static_segments_ignore_case() {
        let anon = build_routes(false);
        assert_eq!(element(&anon, "/Login"), Some(Element::View(View::Login)));
        assert_eq!(element(&anon, "/EXPLORE"), Some(Element::View(View::Explore)));

        let m = anon.resolve("/Profiles/User");
        assert_eq!(m.route.loader, Some(Loader::ProfileUserDetail));

        let routes = build_routes(true);
        let m = routes.resolve("/Posts/7/Edit");
        assert_eq!(m.route.element, Some(Element::View(View::PostForm)));
        assert_eq!(m.params.get("id"), Some("7"));
    }

    #[test]
    fn test_captured_segments_are_decoded() {
        let table = build_routes(false);
        assert_eq!(table.resolve("/profiles/a%20b").params.get("id"), Some("a b"));
        assert_eq!(table.resolve("/profiles/caf%C3%A9").params.get("id"), Some("café"));
        // Plus is literal in a path, unlike in a query string
        assert_eq!(table.resolve("/profiles/a+b").params.get("id"), Some("a+b"));
        // Captures keep their case
        assert_eq!(table.resolve("/profiles/Alice").params.get("id"), Some("Alice"));
    }

    #[test]
    fn test_table_records_login_state() {
        assert!(build_routes(true).logged_in());
        assert!(!build_routes(false).logged_in());
        assert_eq!(build_routes(true), build_routes(true));
    }
}
