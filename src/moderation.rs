use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::{
    capability::{Action, CapabilityResolver, Denied, Owned},
    models::{Comment, NewComment, NewPost, Post, PostUpdate},
    repository::{CommentRepositoryState, PostRepositoryState, RepositoryError},
    session::SessionStore,
};

/// Posts shown per page of the moderation queue unless the caller asks otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// EditPolicy
///
/// What happens to the approval flag when a post is edited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditPolicy {
    /// The flag is left as it is.
    #[default]
    KeepApproval,
    /// A non-admin edit of an approved post sends it back to the queue.
    ResetToPending,
}

impl EditPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keep-approval" | "keep" => Some(EditPolicy::KeepApproval),
            "reset-to-pending" | "reset" => Some(EditPolicy::ResetToPending),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EditPolicy::KeepApproval => "keep-approval",
            EditPolicy::ResetToPending => "reset-to-pending",
        }
    }
}

/// ModerationError
#[derive(Debug, Error)]
pub enum ModerationError {
    /// The session lacks the capability. Raised before any repository call.
    #[error(transparent)]
    Denied(#[from] Denied),
    #[error("post {0} is not on the board")]
    NotFound(Uuid),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ModerationError {
    pub fn is_denied(&self) -> bool {
        matches!(self, ModerationError::Denied(_))
    }
}

pub type ModerationResult<T> = Result<T, ModerationError>;

/// ModerationPipeline
///
/// Every post and comment operation of the client. Each call takes the session store and builds
/// a fresh [`CapabilityResolver`] from it, so the check always sees the identity as it is at the
/// moment of the call. A mutation the session may not perform fails with
/// [`ModerationError::Denied`] and never reaches the repository.
#[derive(Clone)]
pub struct ModerationPipeline {
    posts: PostRepositoryState,
    comments: CommentRepositoryState,
    edit_policy: EditPolicy,
}

impl ModerationPipeline {
    pub fn new(posts: PostRepositoryState, comments: CommentRepositoryState) -> Self {
        Self {
            posts,
            comments,
            edit_policy: EditPolicy::default(),
        }
    }

    pub fn with_edit_policy(mut self, edit_policy: EditPolicy) -> Self {
        self.edit_policy = edit_policy;
        self
    }

    pub fn edit_policy(&self) -> EditPolicy {
        self.edit_policy
    }

    // --- Posts ---

    /// create_post
    ///
    /// Submits a post as the current user. Admin submissions are published immediately; everyone
    /// else's land in the moderation queue.
    pub async fn create_post(&self, session: &SessionStore, post: NewPost) -> ModerationResult<Post> {
        let caps = CapabilityResolver::new(session);
        caps.require(caps.can_submit(), Action::CreatePost)?;
        let author = caps.acting_user(Action::CreatePost)?;
        let approved = caps.can_submit_pre_approved();

        let created = self.posts.create(post, author, approved).await?;
        tracing::info!(post_id = %created.id, author, approved, "post submitted");
        Ok(created)
    }

    /// Published posts, newest first. Visible to everyone.
    pub async fn feed(&self) -> ModerationResult<Vec<Post>> {
        let mut posts = self.posts.list(true).await?;
        posts.retain(|p| p.approved);
        newest_first(&mut posts);
        Ok(posts)
    }

    /// unapproved_queue
    ///
    /// Posts waiting for approval, newest first. Admins only.
    pub async fn unapproved_queue(&self, session: &SessionStore) -> ModerationResult<Vec<Post>> {
        let caps = CapabilityResolver::new(session);
        caps.require(caps.can_moderate(), Action::ViewModerationQueue)?;

        let mut posts = self.posts.list(false).await?;
        posts.retain(|p| !p.approved);
        newest_first(&mut posts);
        Ok(posts)
    }

    /// A single post, or `None` when it does not exist or the session may not see it yet.
    pub async fn post_detail(&self, session: &SessionStore, id: Uuid) -> ModerationResult<Option<Post>> {
        let post = self.posts.get(id).await?;
        let caps = CapabilityResolver::new(session);
        Ok(post.filter(|p| caps.can_view(p)))
    }

    /// posts_by_author
    ///
    /// The author's posts, newest first. The author and admins also see pending ones.
    pub async fn posts_by_author(
        &self,
        session: &SessionStore,
        user_id: &str,
    ) -> ModerationResult<Vec<Post>> {
        let caps = CapabilityResolver::new(session);
        let sees_pending = caps.can_moderate() || caps.user_id() == Some(user_id);

        let mut posts = self.posts.list(!sees_pending).await?;
        posts.retain(|p| {
            Owned::author_user_id(p) == Some(user_id) && (sees_pending || p.approved)
        });
        newest_first(&mut posts);
        Ok(posts)
    }

    /// approve
    ///
    /// Publishes a pending post. Approving a published post changes nothing and makes no
    /// repository call.
    pub async fn approve(&self, session: &SessionStore, post: &Post) -> ModerationResult<Post> {
        let caps = CapabilityResolver::new(session);
        caps.require(caps.can_moderate(), Action::ApprovePost)?;

        if post.approved {
            tracing::debug!(post_id = %post.id, "post already approved");
            return Ok(post.clone());
        }

        self.posts.set_approved(post.id).await?;
        tracing::info!(post_id = %post.id, "post approved");
        Ok(Post {
            approved: true,
            ..post.clone()
        })
    }

    /// Deletes a post in any approval state. Its comments go with it.
    pub async fn delete_post(&self, session: &SessionStore, post: &Post) -> ModerationResult<()> {
        let caps = CapabilityResolver::new(session);
        caps.require(caps.can_edit_or_delete(post), Action::DeletePost)?;

        self.posts.delete(post.id).await?;
        tracing::info!(post_id = %post.id, approved = post.approved, "post deleted");
        Ok(())
    }

    /// edit_post
    ///
    /// Applies `changes` to `post`. The approval flag follows the pipeline's [`EditPolicy`].
    pub async fn edit_post(
        &self,
        session: &SessionStore,
        post: &Post,
        changes: PostUpdate,
    ) -> ModerationResult<Post> {
        let caps = CapabilityResolver::new(session);
        caps.require(caps.can_edit_or_delete(post), Action::EditPost)?;

        let mut updated = post.clone();
        changes.apply_to(&mut updated);
        if self.edit_policy == EditPolicy::ResetToPending && updated.approved && !caps.can_moderate()
        {
            updated.approved = false;
            tracing::info!(post_id = %post.id, "edited post returned to the moderation queue");
        }

        let saved = self.posts.update(&updated).await?;
        tracing::info!(post_id = %saved.id, approved = saved.approved, "post edited");
        Ok(saved)
    }

    // --- Comments ---

    pub async fn comments(&self, post_id: Uuid) -> ModerationResult<Vec<Comment>> {
        Ok(self.comments.list_by_post(post_id).await?)
    }

    pub async fn add_comment(
        &self,
        session: &SessionStore,
        comment: NewComment,
    ) -> ModerationResult<Comment> {
        let caps = CapabilityResolver::new(session);
        caps.require(caps.can_comment(), Action::AddComment)?;
        let author = caps.acting_user(Action::AddComment)?;

        let created = self.comments.create(comment, author).await?;
        tracing::info!(comment_id = %created.id, post_id = %created.post_id, "comment added");
        Ok(created)
    }

    pub async fn edit_comment(
        &self,
        session: &SessionStore,
        comment: &Comment,
        content: impl Into<String>,
    ) -> ModerationResult<Comment> {
        let caps = CapabilityResolver::new(session);
        caps.require(caps.can_edit_or_delete(comment), Action::EditComment)?;

        let updated = Comment {
            content: content.into(),
            ..comment.clone()
        };
        let saved = self.comments.update(&updated).await?;
        tracing::info!(comment_id = %saved.id, "comment edited");
        Ok(saved)
    }

    pub async fn delete_comment(&self, session: &SessionStore, comment: &Comment) -> ModerationResult<()> {
        let caps = CapabilityResolver::new(session);
        caps.require(caps.can_edit_or_delete(comment), Action::DeleteComment)?;

        self.comments.delete(comment.id).await?;
        tracing::info!(comment_id = %comment.id, "comment deleted");
        Ok(())
    }
}

fn newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// ModerationBoard
///
/// The admin's view of the portal: the pending queue next to the published feed. After every
/// successful mutation both lists are fetched again instead of being patched locally.
pub struct ModerationBoard {
    pipeline: Arc<ModerationPipeline>,
    pending: Vec<Post>,
    published: Vec<Post>,
}

impl ModerationBoard {
    /// An empty board; call [`ModerationBoard::reload`] to fill it.
    pub fn new(pipeline: Arc<ModerationPipeline>) -> Self {
        Self {
            pipeline,
            pending: Vec::new(),
            published: Vec::new(),
        }
    }

    pub fn pending(&self) -> &[Post] {
        &self.pending
    }

    pub fn published(&self) -> &[Post] {
        &self.published
    }

    pub async fn reload(&mut self, session: &SessionStore) -> ModerationResult<()> {
        let pending = self.pipeline.unapproved_queue(session).await?;
        let published = self.pipeline.feed().await?;
        self.pending = pending;
        self.published = published;
        tracing::debug!(
            pending = self.pending.len(),
            published = self.published.len(),
            "moderation board reloaded"
        );
        Ok(())
    }

    pub async fn approve(&mut self, session: &SessionStore, id: Uuid) -> ModerationResult<()> {
        let post = self.find(id)?.clone();
        self.pipeline.approve(session, &post).await?;
        self.reload(session).await
    }

    pub async fn delete(&mut self, session: &SessionStore, id: Uuid) -> ModerationResult<()> {
        let post = self.find(id)?.clone();
        self.pipeline.delete_post(session, &post).await?;
        self.reload(session).await
    }

    /// page
    ///
    /// One page of the pending queue. Pages are 1-based; a page past the end is empty.
    pub fn page(&self, page: usize, per_page: usize) -> &[Post] {
        let per_page = per_page.max(1);
        let start = page.saturating_sub(1).saturating_mul(per_page);
        if start >= self.pending.len() {
            return &[];
        }
        let end = (start + per_page).min(self.pending.len());
        &self.pending[start..end]
    }

    pub fn total_pages(&self, per_page: usize) -> usize {
        self.pending.len().div_ceil(per_page.max(1))
    }

    fn find(&self, id: Uuid) -> ModerationResult<&Post> {
        self.pending
            .iter()
            .chain(self.published.iter())
            .find(|p| p.id == id)
            .ok_or(ModerationError::NotFound(id))
    }
}
