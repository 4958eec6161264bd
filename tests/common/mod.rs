#![allow(dead_code)]

use std::sync::Arc;

use blog_portal::{
    models::{Comment, Post},
    moderation::ModerationPipeline,
    repository::{CommentRepositoryState, InMemoryRepository, PostRepositoryState},
    session::SessionStore,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use uuid::Uuid;

pub const TEST_SECRET: &[u8] = b"super-secure-test-secret-value-local";

/// Signs `claims` the way the portal API does. The client never checks the signature.
pub fn sign(claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET),
    )
    .expect("Failed to encode test token")
}

/// A valid token for `sub` with `role`, expiring in an hour.
pub fn token_for(sub: &str, role: &str) -> String {
    sign(json!({
        "sub": sub,
        "role": role,
        "exp": (Utc::now() + Duration::hours(1)).timestamp(),
    }))
}

/// An in-memory session store signed in as `sub`.
pub fn session_for(sub: &str, role: &str) -> SessionStore {
    let mut store = SessionStore::in_memory();
    store.establish(&token_for(sub, role));
    store
}

pub fn guest() -> SessionStore {
    SessionStore::in_memory()
}

/// A stored post by `author`, created `minutes_ago` minutes in the past.
pub fn post_by(author: &str, approved: bool, minutes_ago: i64) -> Post {
    Post {
        id: Uuid::new_v4(),
        title: format!("Post by {author}"),
        content: "Lorem ipsum".to_string(),
        url: "https://example.com/cover.png".to_string(),
        author: author.to_uppercase(),
        category_id: None,
        created_at: Utc::now() - Duration::minutes(minutes_ago),
        author_user_id: author.to_string(),
        approved,
    }
}

pub fn comment_by(author: &str, post_id: Uuid) -> Comment {
    Comment {
        id: Uuid::new_v4(),
        post_id,
        author_user_id: author.to_string(),
        content: format!("Comment by {author}"),
        created_at: Utc::now(),
    }
}

/// A pipeline over a fresh in-memory repository, plus the repository for inspection.
pub fn pipeline() -> (ModerationPipeline, Arc<InMemoryRepository>) {
    let repo = Arc::new(InMemoryRepository::new());
    let pipeline = ModerationPipeline::new(
        repo.clone() as PostRepositoryState,
        repo.clone() as CommentRepositoryState,
    );
    (pipeline, repo)
}
