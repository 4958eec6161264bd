mod common;

use blog_portal::{
    auth::Role,
    capability::{Action, CapabilityResolver, Denied},
};
use common::{comment_by, guest, post_by, session_for};
use uuid::Uuid;

#[test]
fn test_moderation_is_admin_only() {
    assert!(CapabilityResolver::new(&session_for("a1", "admin")).can_moderate());
    assert!(!CapabilityResolver::new(&session_for("u1", "user")).can_moderate());
    assert!(!CapabilityResolver::new(&guest()).can_moderate());
}

#[test]
fn test_pre_approval_is_admin_only() {
    assert!(CapabilityResolver::new(&session_for("a1", "admin")).can_submit_pre_approved());
    assert!(!CapabilityResolver::new(&session_for("u1", "user")).can_submit_pre_approved());
    assert!(!CapabilityResolver::new(&guest()).can_submit_pre_approved());
}

#[test]
fn test_edit_or_delete_requires_owner_or_admin() {
    let post = post_by("u1", true, 1);

    assert!(CapabilityResolver::new(&session_for("u1", "user")).can_edit_or_delete(&post));
    assert!(CapabilityResolver::new(&session_for("a1", "admin")).can_edit_or_delete(&post));
    assert!(!CapabilityResolver::new(&session_for("u2", "user")).can_edit_or_delete(&post));
    assert!(!CapabilityResolver::new(&guest()).can_edit_or_delete(&post));
}

#[test]
fn test_comment_ownership_uses_the_comment_author() {
    let comment = comment_by("c1", Uuid::new_v4());

    assert!(CapabilityResolver::new(&session_for("c1", "user")).can_edit_or_delete(&comment));
    assert!(!CapabilityResolver::new(&session_for("c2", "user")).can_edit_or_delete(&comment));
}

#[test]
fn test_blank_author_is_denied_to_everyone() {
    let mut post = post_by("u1", true, 1);
    post.author_user_id = "   ".to_string();

    assert!(!CapabilityResolver::new(&session_for("a1", "admin")).can_edit_or_delete(&post));
    assert!(!CapabilityResolver::new(&session_for("u1", "user")).can_edit_or_delete(&post));
}

#[test]
fn test_pending_posts_are_only_visible_to_owner_and_admin() {
    let pending = post_by("u1", false, 1);
    let published = post_by("u1", true, 1);

    assert!(CapabilityResolver::new(&guest()).can_view(&published));
    assert!(!CapabilityResolver::new(&guest()).can_view(&pending));
    assert!(CapabilityResolver::new(&session_for("u1", "user")).can_view(&pending));
    assert!(CapabilityResolver::new(&session_for("a1", "admin")).can_view(&pending));
    assert!(!CapabilityResolver::new(&session_for("u2", "user")).can_view(&pending));
}

#[test]
fn test_require_names_the_refused_action() {
    let session = session_for("u1", "user");
    let caps = CapabilityResolver::new(&session);

    assert_eq!(caps.require(true, Action::ApprovePost), Ok(()));
    let denied = caps.require(caps.can_moderate(), Action::ApprovePost).unwrap_err();
    assert_eq!(
        denied,
        Denied {
            action: Action::ApprovePost,
            role: Role::User
        }
    );
    assert_eq!(denied.to_string(), "approve post is not permitted for a user session");
}

#[test]
fn test_resolver_reflects_session_changes() {
    let mut session = session_for("u1", "admin");
    assert!(CapabilityResolver::new(&session).can_moderate());

    session.clear();
    let caps = CapabilityResolver::new(&session);
    assert!(!caps.can_moderate());
    assert!(!caps.can_submit());
    assert!(!caps.can_comment());
    assert!(caps.acting_user(Action::CreatePost).is_err());
}
