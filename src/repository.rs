use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{Comment, NewComment, NewPost, Post},
    storage::TokenStoreState,
};

/// RepositoryError
///
/// Transport-level failures of a permitted operation. Authorization denials never show up here:
/// they are decided before a repository is called.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The request never got an answer (connection refused, timeout, TLS).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered 404.
    #[error("resource not found")]
    NotFound,
    /// Any other non-success status, with the response body as the message.
    #[error("server answered {status}: {message}")]
    Status { status: u16, message: String },
    /// A success response whose body is not the expected JSON.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// RepositoryResult
///
/// Result alias used by every repository call.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// PostRepository
///
/// Persistence contract for posts. The wire schema belongs to the implementation; callers only
/// see [`Post`] values.
///
/// **Send + Sync + async_trait** so implementations can sit behind an `Arc<dyn PostRepository>`.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// create
    ///
    /// Stores a new post owned by `author_user_id` with the given approval flag. The caller has
    /// already decided both; the repository records them as given.
    async fn create(&self, post: NewPost, author_user_id: &str, approved: bool)
    -> RepositoryResult<Post>;

    /// list
    ///
    /// All approved posts when `approved_only`, otherwise every post in either state. No
    /// ordering is promised.
    async fn list(&self, approved_only: bool) -> RepositoryResult<Vec<Post>>;

    /// get
    ///
    /// A single post by id. An unknown id is `Ok(None)`, not an error.
    async fn get(&self, id: Uuid) -> RepositoryResult<Option<Post>>;

    /// set_approved
    ///
    /// One-way flip of the approval flag to `true`. There is no counterpart that unsets it.
    async fn set_approved(&self, id: Uuid) -> RepositoryResult<()>;

    /// delete
    ///
    /// Deletes the post in any approval state. The server removes its comments with it.
    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;

    /// update
    ///
    /// Writes the content fields and approval flag of `post`. Ownership and creation time are
    /// never changed by an update. Returns the stored post.
    async fn update(&self, post: &Post) -> RepositoryResult<Post>;
}

/// CommentRepository
///
/// Persistence contract for comments. Comments carry no approval state, so the contract is plain
/// create/list/update/delete keyed by comment or post id.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// create
    ///
    /// Attaches a new comment by `author_user_id` to `comment.post_id`. Fails with
    /// [`RepositoryError::NotFound`] when the post does not exist.
    async fn create(&self, comment: NewComment, author_user_id: &str)
    -> RepositoryResult<Comment>;

    /// list_by_post
    ///
    /// The comments of one post, in the order the server returns them.
    async fn list_by_post(&self, post_id: Uuid) -> RepositoryResult<Vec<Comment>>;

    /// update
    ///
    /// Replaces the comment text. Author and post are fixed at creation.
    async fn update(&self, comment: &Comment) -> RepositoryResult<Comment>;

    /// delete
    ///
    /// Removes a single comment.
    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;
}

/// PostRepositoryState
///
/// The shared post repository handle handed to the moderation pipeline.
pub type PostRepositoryState = Arc<dyn PostRepository>;

/// CommentRepositoryState
///
/// The shared comment repository handle. One value may back both states.
pub type CommentRepositoryState = Arc<dyn CommentRepository>;

// --- HTTP Implementation ---

/// CreatePostBody
///
/// Body of `POST /api/Post`.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreatePostBody<'a> {
    title: &'a str,
    content: &'a str,
    url: &'a str,
    author: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_id: Option<&'a str>,
    user_id: &'a str,
    #[serde(rename = "isApproved")]
    is_approved: bool,
}

/// CreateCommentBody
///
/// Body of `POST /api/Comment`.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateCommentBody<'a> {
    post_id: Uuid,
    user_id: &'a str,
    content: &'a str,
}

/// HttpRepository
///
/// Both repositories against the portal REST API. The bearer token is read from the shared
/// token store on every request, so requests always carry the current session's credential.
#[derive(Clone)]
pub struct HttpRepository {
    client: Client,
    base_url: String,
    tokens: TokenStoreState,
}

impl HttpRepository {
    /// new
    ///
    /// A client for the API rooted at `base_url` (a trailing slash is ignored). `tokens` is the
    /// same store the session writes to.
    pub fn new(base_url: impl Into<String>, tokens: TokenStoreState) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.load() {
            Ok(Some(token)) => request.bearer_auth(token),
            Ok(None) => request,
            Err(e) => {
                tracing::warn!(error = %e, "sending request without a bearer token");
                request
            }
        }
    }

    /// Sends the request and maps non-success statuses to errors.
    async fn send(&self, request: RequestBuilder) -> RepositoryResult<Response> {
        let response = self.authorized(request).send().await.map_err(|e| {
            tracing::error!("repository request error: {:?}", e);
            RepositoryError::Transport(e)
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RepositoryError::NotFound);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), %message, "repository request rejected");
            return Err(RepositoryError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> RepositoryResult<T> {
        let response = self.send(request).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| RepositoryError::Decode(e.to_string()))
    }

    /// Like `fetch`, but an empty body (204 and friends) yields `fallback`.
    async fn fetch_or<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: T,
    ) -> RepositoryResult<T> {
        let response = self.send(request).await?;
        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(fallback);
        }
        serde_json::from_slice(&body).map_err(|e| RepositoryError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PostRepository for HttpRepository {
    async fn create(
        &self,
        post: NewPost,
        author_user_id: &str,
        approved: bool,
    ) -> RepositoryResult<Post> {
        let body = CreatePostBody {
            title: &post.title,
            content: &post.content,
            url: &post.url,
            author: &post.author,
            category_id: post.category_id.as_deref(),
            user_id: author_user_id,
            is_approved: approved,
        };
        self.fetch(self.client.post(self.url("Post")).json(&body))
            .await
    }

    /// The API splits the post list by approval state; the full list is the union.
    async fn list(&self, approved_only: bool) -> RepositoryResult<Vec<Post>> {
        let mut posts: Vec<Post> = self.fetch(self.client.get(self.url("Post"))).await?;
        if !approved_only {
            let pending: Vec<Post> = self
                .fetch(self.client.get(self.url("Post/unapproved")))
                .await?;
            posts.extend(pending.into_iter().filter(|p| !p.approved));
        }
        Ok(posts)
    }

    async fn get(&self, id: Uuid) -> RepositoryResult<Option<Post>> {
        match self.fetch(self.client.get(self.url(&format!("Post/{id}")))).await {
            Ok(post) => Ok(Some(post)),
            Err(RepositoryError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn set_approved(&self, id: Uuid) -> RepositoryResult<()> {
        self.send(self.client.put(self.url(&format!("Post/approve/{id}"))))
            .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        self.send(self.client.delete(self.url(&format!("Post/{id}"))))
            .await?;
        Ok(())
    }

    async fn update(&self, post: &Post) -> RepositoryResult<Post> {
        let request = self
            .client
            .put(self.url(&format!("Post/{}", post.id)))
            .json(post);
        self.fetch_or(request, post.clone()).await
    }
}

#[async_trait]
impl CommentRepository for HttpRepository {
    async fn create(&self, comment: NewComment, author_user_id: &str) -> RepositoryResult<Comment> {
        let body = CreateCommentBody {
            post_id: comment.post_id,
            user_id: author_user_id,
            content: &comment.content,
        };
        self.fetch(self.client.post(self.url("Comment")).json(&body))
            .await
    }

    async fn list_by_post(&self, post_id: Uuid) -> RepositoryResult<Vec<Comment>> {
        self.fetch(self.client.get(self.url(&format!("Comment/post/{post_id}"))))
            .await
    }

    async fn update(&self, comment: &Comment) -> RepositoryResult<Comment> {
        let request = self
            .client
            .put(self.url(&format!("Comment/{}", comment.id)))
            .json(comment);
        self.fetch_or(request, comment.clone()).await
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        self.send(self.client.delete(self.url(&format!("Comment/{id}"))))
            .await?;
        Ok(())
    }
}

// --- In-memory Implementation ---

#[derive(Default)]
struct MemoryState {
    posts: Vec<Post>,
    comments: Vec<Comment>,
}

/// InMemoryRepository
///
/// Both repositories over process memory, with the server's cascade (deleting a post deletes
/// its comments). Every trait call is counted so callers can check that a denied action never
/// reached the repository. A failing instance answers every call with a 503.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<MemoryState>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository whose every call fails like an unavailable server.
    pub fn new_failing() -> Self {
        let repo = Self::default();
        repo.failing.store(true, Ordering::SeqCst);
        repo
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of repository calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Inserts a post as-is, bypassing the call counter.
    pub fn seed_post(&self, post: Post) {
        self.lock().posts.push(post);
    }

    pub fn seed_comment(&self, comment: Comment) {
        self.lock().comments.push(comment);
    }

    /// Current stored copy of a post, bypassing the call counter.
    pub fn post(&self, id: Uuid) -> Option<Post> {
        self.lock().posts.iter().find(|p| p.id == id).cloned()
    }

    pub fn comment(&self, id: Uuid) -> Option<Comment> {
        self.lock().comments.iter().find(|c| c.id == id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts the call and yields the state, or the simulated outage.
    fn begin(&self) -> RepositoryResult<MutexGuard<'_, MemoryState>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Status {
                status: 503,
                message: "repository unavailable".to_string(),
            });
        }
        Ok(self.lock())
    }
}

#[async_trait]
impl PostRepository for InMemoryRepository {
    async fn create(
        &self,
        post: NewPost,
        author_user_id: &str,
        approved: bool,
    ) -> RepositoryResult<Post> {
        let mut state = self.begin()?;
        let stored = Post {
            id: Uuid::new_v4(),
            title: post.title,
            content: post.content,
            url: post.url,
            author: post.author,
            category_id: post.category_id,
            created_at: Utc::now(),
            author_user_id: author_user_id.to_string(),
            approved,
        };
        state.posts.push(stored.clone());
        Ok(stored)
    }

    async fn list(&self, approved_only: bool) -> RepositoryResult<Vec<Post>> {
        let state = self.begin()?;
        Ok(state
            .posts
            .iter()
            .filter(|p| !approved_only || p.approved)
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> RepositoryResult<Option<Post>> {
        let state = self.begin()?;
        Ok(state.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn set_approved(&self, id: Uuid) -> RepositoryResult<()> {
        let mut state = self.begin()?;
        let post = state
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;
        post.approved = true;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let mut state = self.begin()?;
        let before = state.posts.len();
        state.posts.retain(|p| p.id != id);
        if state.posts.len() == before {
            return Err(RepositoryError::NotFound);
        }
        state.comments.retain(|c| c.post_id != id);
        Ok(())
    }

    /// Ownership and creation time are immutable; only content fields and the approval flag
    /// are taken from `post`.
    async fn update(&self, post: &Post) -> RepositoryResult<Post> {
        let mut state = self.begin()?;
        let stored = state
            .posts
            .iter_mut()
            .find(|p| p.id == post.id)
            .ok_or(RepositoryError::NotFound)?;
        stored.title = post.title.clone();
        stored.content = post.content.clone();
        stored.url = post.url.clone();
        stored.category_id = post.category_id.clone();
        stored.approved = post.approved;
        Ok(stored.clone())
    }
}

#[async_trait]
impl CommentRepository for InMemoryRepository {
    async fn create(&self, comment: NewComment, author_user_id: &str) -> RepositoryResult<Comment> {
        let mut state = self.begin()?;
        if !state.posts.iter().any(|p| p.id == comment.post_id) {
            return Err(RepositoryError::NotFound);
        }
        let stored = Comment {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            author_user_id: author_user_id.to_string(),
            content: comment.content,
            created_at: Utc::now(),
        };
        state.comments.push(stored.clone());
        Ok(stored)
    }

    async fn list_by_post(&self, post_id: Uuid) -> RepositoryResult<Vec<Comment>> {
        let state = self.begin()?;
        Ok(state
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn update(&self, comment: &Comment) -> RepositoryResult<Comment> {
        let mut state = self.begin()?;
        let stored = state
            .comments
            .iter_mut()
            .find(|c| c.id == comment.id)
            .ok_or(RepositoryError::NotFound)?;
        stored.content = comment.content.clone();
        Ok(stored.clone())
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let mut state = self.begin()?;
        let before = state.comments.len();
        state.comments.retain(|c| c.id != id);
        if state.comments.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
