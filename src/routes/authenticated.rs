use super::{RouteEntry, View};

/// Authenticated Routes
///
/// Views for any signed-in user. Per-post edit and delete rights are not decided here; the
/// capability resolver checks ownership when the action is attempted.
pub fn authenticated_routes() -> Vec<RouteEntry> {
    vec![
        // Published feed and post detail.
        RouteEntry::authenticated("/posts", View::PostFeed),
        RouteEntry::authenticated("/posts/:id", View::PostPage),
        // Submission form. It sits under /admin for historical reasons but any user may post.
        RouteEntry::authenticated("/admin/blogposts/add", View::AddPost),
        RouteEntry::authenticated("/edit-post", View::EditPost),
        RouteEntry::authenticated("/my-profile", View::MyProfile),
        // An author's posts; pending ones are filtered per viewer by the moderation pipeline.
        RouteEntry::authenticated("/user-posts/:id", View::UserPosts),
        RouteEntry::authenticated("/random-user-posts/:userId", View::RandomUserPosts),
    ]
}
