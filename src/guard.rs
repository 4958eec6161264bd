use crate::{capability::CapabilityResolver, session::SessionStore};

/// Guard
///
/// A route-entry check. Both variants share one shape: a pure predicate over the current
/// session ([`Guard::allows`]) and a decision that names where a denied navigation goes
/// ([`Guard::check`]). Neither touches navigation state; applying a redirect is the
/// [`Navigator`]'s job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Guard {
    /// Any signed-in user.
    Authenticated,
    /// Signed-in administrators only.
    Admin,
}

impl Guard {
    /// allows
    ///
    /// The guard's predicate. Pure: it reads the resolver and nothing else.
    pub fn allows(&self, caps: &CapabilityResolver<'_>) -> bool {
        match self {
            Guard::Authenticated => caps.is_authenticated(),
            Guard::Admin => caps.is_authenticated() && caps.can_moderate(),
        }
    }

    /// check
    ///
    /// Evaluates the guard against the session as it is right now.
    pub fn check(&self, session: &SessionStore, login_route: &str) -> GuardDecision {
        if self.allows(&CapabilityResolver::new(session)) {
            GuardDecision::Allow
        } else {
            GuardDecision::Redirect(login_route.to_string())
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Guard::Authenticated => "authenticated",
            Guard::Admin => "admin",
        }
    }
}

/// GuardDecision
///
/// Outcome of a guard check. The guard only decides; moving the navigator is left to the caller
/// (see [`crate::routes::Router::enter`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session may enter the route.
    Allow,
    /// Denied; the target must not render and navigation continues at the contained route.
    Redirect(String),
}

impl GuardDecision {
    /// is_allowed
    ///
    /// `true` for [`GuardDecision::Allow`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// Navigator
///
/// The navigation side effect, kept apart from the guard decision. The router calls
/// `navigate_to` exactly once per entered path, with either the path itself or its redirect
/// target.
pub trait Navigator {
    /// navigate_to
    ///
    /// Makes `path` the current location.
    fn navigate_to(&mut self, path: &str);

    /// current
    ///
    /// The current location, or `None` before the first navigation.
    fn current(&self) -> Option<&str>;
}

/// History
///
/// In-process navigator that records every path it was sent to. The CLI and the tests use it in
/// place of a browser location bar.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    /// entries
    ///
    /// Every location navigated to, oldest first, redirects included.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

impl Navigator for History {
    fn navigate_to(&mut self, path: &str) {
        self.entries.push(path.to_string());
    }

    fn current(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }
}
