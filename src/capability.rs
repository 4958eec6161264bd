use std::fmt;

use thiserror::Error;

use crate::{
    auth::{Role, Session},
    models::Post,
    session::SessionStore,
};

/// Owned
///
/// Anything that records which user created it. The author id is the only resource attribute
/// that takes part in an authorization decision.
pub trait Owned {
    /// The creator's user id, or `None` if the record carries none.
    fn author_user_id(&self) -> Option<&str>;
}

/// Action
///
/// The user actions that need a capability. Used to name a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreatePost,
    EditPost,
    DeletePost,
    ApprovePost,
    ViewModerationQueue,
    AddComment,
    EditComment,
    DeleteComment,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreatePost => "create post",
            Action::EditPost => "edit post",
            Action::DeletePost => "delete post",
            Action::ApprovePost => "approve post",
            Action::ViewModerationQueue => "view moderation queue",
            Action::AddComment => "add comment",
            Action::EditComment => "edit comment",
            Action::DeleteComment => "delete comment",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Denied
///
/// An authorization decision that came out negative. This is an expected outcome, not a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{action} is not permitted for a {role} session")]
pub struct Denied {
    pub action: Action,
    pub role: Role,
}

/// CapabilityResolver
///
/// Answers "may the current session do this" questions. A resolver borrows the session it was
/// built from, so it cannot outlive an `establish`/`clear`; build a new one at the point of use
/// instead of keeping one (or any of its answers) around.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityResolver<'s> {
    session: &'s Session,
}

impl<'s> CapabilityResolver<'s> {
    pub fn new(store: &'s SessionStore) -> Self {
        Self {
            session: store.session(),
        }
    }

    pub fn for_session(session: &'s Session) -> Self {
        Self { session }
    }

    pub fn role(&self) -> Role {
        self.session.role()
    }

    pub fn user_id(&self) -> Option<&'s str> {
        self.session.user_id()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Approving posts and reading the moderation queue.
    pub fn can_moderate(&self) -> bool {
        self.role() == Role::Admin
    }

    /// can_edit_or_delete
    ///
    /// Owner or admin. A resource without an author id is a broken record and is denied to
    /// everyone, admins included.
    pub fn can_edit_or_delete<R: Owned + ?Sized>(&self, resource: &R) -> bool {
        let Some(author) = resource.author_user_id() else {
            tracing::warn!("capability check on a resource without an author id, denying");
            return false;
        };

        if self.role() == Role::Admin {
            return true;
        }

        self.user_id().is_some_and(|me| me == author)
    }

    /// Whether a post submitted now goes straight to the public feed.
    pub fn can_submit_pre_approved(&self) -> bool {
        self.role() == Role::Admin
    }

    pub fn can_submit(&self) -> bool {
        self.is_authenticated()
    }

    pub fn can_comment(&self) -> bool {
        self.is_authenticated()
    }

    /// Approved posts are public; pending ones are visible to their author and to admins.
    pub fn can_view(&self, post: &Post) -> bool {
        post.approved || self.can_edit_or_delete(post)
    }

    /// require
    ///
    /// Turns a decision into a `Result` naming what was refused.
    pub fn require(&self, allowed: bool, action: Action) -> Result<(), Denied> {
        if allowed {
            Ok(())
        } else {
            tracing::warn!(%action, role = %self.role(), "action denied");
            Err(Denied {
                action,
                role: self.role(),
            })
        }
    }

    /// The acting user's id, or a denial of `action` for sessions without one.
    pub fn acting_user(&self, action: Action) -> Result<&'s str, Denied> {
        self.user_id().ok_or(Denied {
            action,
            role: self.role(),
        })
    }
}
