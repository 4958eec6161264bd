//! Route Table
//!
//! The client's views are grouped by the guard that gates them, one module per group, so the
//! access level of a route is visible where the route is declared.

/// Routes reachable without a session.
pub mod public;

/// Routes gated by the authenticated guard.
pub mod authenticated;

/// Routes gated by the admin guard.
pub mod admin;

use std::collections::BTreeMap;

use crate::{
    config::AppConfig,
    guard::{Guard, GuardDecision, Navigator},
    session::SessionStore,
};

/// View
///
/// Every screen of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Home,
    Login,
    Signup,
    Unauthorized,
    PostFeed,
    PostPage,
    AddPost,
    EditPost,
    MyProfile,
    UserPosts,
    RandomUserPosts,
    AdminPostList,
    CategoryList,
    AddCategory,
    EditCategory,
    UserList,
    ModerationQueue,
}

/// RouteEntry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pattern: String,
    view: View,
    guard: Option<Guard>,
}

impl RouteEntry {
    pub fn new(pattern: impl Into<String>, view: View, guard: Option<Guard>) -> Self {
        Self {
            pattern: pattern.into(),
            view,
            guard,
        }
    }

    pub fn public(pattern: impl Into<String>, view: View) -> Self {
        Self::new(pattern, view, None)
    }

    pub fn authenticated(pattern: impl Into<String>, view: View) -> Self {
        Self::new(pattern, view, Some(Guard::Authenticated))
    }

    pub fn admin(pattern: impl Into<String>, view: View) -> Self {
        Self::new(pattern, view, Some(Guard::Admin))
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn guard(&self) -> Option<Guard> {
        self.guard
    }

    /// Matches `path` segment by segment; `:name` segments capture.
    fn capture(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let pattern: Vec<&str> = segments(&self.pattern).collect();
        let actual: Vec<&str> = segments(path).collect();
        if pattern.len() != actual.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (expected, found) in pattern.iter().zip(actual) {
            match expected.strip_prefix(':') {
                Some(name) => {
                    params.insert(name.to_string(), found.to_string());
                }
                None if *expected == found => {}
                None => return None,
            }
        }
        Some(params)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['?', '#'])
        .next()
        .unwrap_or_default()
        .split('/')
        .filter(|s| !s.is_empty())
}

/// RouteTable
///
/// Ordered list of routes; the first entry whose pattern matches wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The portal's own routes: admin routes first so that `/admin/...` never falls through to
    /// a looser pattern.
    pub fn portal() -> Self {
        let mut table = Self::new();
        table.extend(admin::admin_routes());
        table.extend(authenticated::authenticated_routes());
        table.extend(public::public_routes());
        table
    }

    pub fn push(&mut self, entry: RouteEntry) {
        self.entries.push(entry);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = RouteEntry>) {
        self.entries.extend(entries);
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn lookup(&self, path: &str) -> Option<(&RouteEntry, BTreeMap<String, String>)> {
        self.entries
            .iter()
            .find_map(|entry| entry.capture(path).map(|params| (entry, params)))
    }
}

/// RouteMatch
///
/// A route the current session may render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub view: View,
    pub path: String,
    pub params: BTreeMap<String, String>,
}

impl RouteMatch {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// RedirectReason
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    /// The route exists but its guard refused the session.
    Denied(Guard),
    /// No route matches. Treated the same for every unknown path so the client does not reveal
    /// which paths exist.
    UnknownRoute,
}

/// Navigation
///
/// Outcome of resolving a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render(RouteMatch),
    Redirect { to: String, reason: RedirectReason },
}

/// Router
///
/// Resolves paths against the route table and the current session.
#[derive(Debug, Clone)]
pub struct Router {
    table: RouteTable,
    login_route: String,
    fallback_route: String,
}

impl Router {
    pub fn new(
        table: RouteTable,
        login_route: impl Into<String>,
        fallback_route: impl Into<String>,
    ) -> Self {
        Self {
            table,
            login_route: login_route.into(),
            fallback_route: fallback_route.into(),
        }
    }

    /// The portal routes with the redirect targets from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            RouteTable::portal(),
            config.login_route.clone(),
            config.fallback_route.clone(),
        )
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    pub fn fallback_route(&self) -> &str {
        &self.fallback_route
    }

    /// resolve
    ///
    /// Decides what entering `path` leads to, evaluated against the session as it is now.
    pub fn resolve(&self, session: &SessionStore, path: &str) -> Navigation {
        let Some((entry, params)) = self.table.lookup(path) else {
            tracing::info!(path, to = %self.fallback_route, "unknown route");
            return Navigation::Redirect {
                to: self.fallback_route.clone(),
                reason: RedirectReason::UnknownRoute,
            };
        };

        if let Some(guard) = entry.guard() {
            if let GuardDecision::Redirect(to) = guard.check(session, &self.login_route) {
                tracing::info!(path, guard = guard.as_str(), %to, "navigation denied");
                return Navigation::Redirect {
                    to,
                    reason: RedirectReason::Denied(guard),
                };
            }
        }

        Navigation::Render(RouteMatch {
            view: entry.view(),
            path: path.to_string(),
            params,
        })
    }

    /// enter
    ///
    /// Resolves `path` and moves `navigator` accordingly. Returns the route to render, or `None`
    /// when navigation was redirected.
    pub fn enter(
        &self,
        session: &SessionStore,
        path: &str,
        navigator: &mut impl Navigator,
    ) -> Option<RouteMatch> {
        match self.resolve(session, path) {
            Navigation::Render(route) => {
                navigator.navigate_to(&route.path);
                Some(route)
            }
            Navigation::Redirect { to, .. } => {
                navigator.navigate_to(&to);
                None
            }
        }
    }

    /// sign_out
    ///
    /// Drops the session and sends the user to the login view.
    pub fn sign_out(&self, session: &mut SessionStore, navigator: &mut impl Navigator) {
        session.clear();
        navigator.navigate_to(&self.login_route);
    }
}
