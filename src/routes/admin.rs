use super::{RouteEntry, View};

/// Admin Routes
///
/// Moderation and account management views, gated by the admin guard.
pub fn admin_routes() -> Vec<RouteEntry> {
    vec![
        RouteEntry::admin("/admin/blogposts", View::AdminPostList),
        RouteEntry::admin("/admin/categories", View::CategoryList),
        // Must precede the `:id` pattern below.
        RouteEntry::admin("/admin/categories/add", View::AddCategory),
        RouteEntry::admin("/admin/categories/:id", View::EditCategory),
        RouteEntry::admin("/user-list", View::UserList),
        // Pending posts waiting for approval, newest first.
        RouteEntry::admin("/posts-table", View::ModerationQueue),
    ]
}
