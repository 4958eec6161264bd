use super::{RouteEntry, View};

/// Public Routes
///
/// Views any visitor may open, signed in or not. The login and unauthorized views live here
/// because they are the targets of guard and unknown-route redirects; gating them would make a
/// redirect lead to another redirect.
pub fn public_routes() -> Vec<RouteEntry> {
    vec![
        // Landing page with the featured posts.
        RouteEntry::public("/", View::Home),
        RouteEntry::public("/login", View::Login),
        RouteEntry::public("/signup", View::Signup),
        RouteEntry::public("/unauthorized", View::Unauthorized),
    ]
}
