use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capability::Owned;

// --- Core Records ---

/// Post
///
/// A blog post as the portal API returns it. `author_user_id` is set once at creation and never
/// changes afterwards; `approved` controls whether the post appears in the public feed.
///
/// The serde attributes describe the wire format of the portal API (PascalCase keys, the
/// approval flag under `isApproved` as `0/1`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Post {
    #[serde(rename = "PostId")]
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub url: String,
    // Display name of the author, as typed on the submission form.
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    // FK to the submitting user. Ownership checks only ever look at this field.
    #[serde(rename = "UserId")]
    pub author_user_id: String,
    #[serde(rename = "isApproved", with = "approval_flag", default)]
    pub approved: bool,
}

impl Owned for Post {
    fn author_user_id(&self) -> Option<&str> {
        non_empty(&self.author_user_id)
    }
}

/// Comment
///
/// A comment attached to a post. Comments carry no approval state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Comment {
    #[serde(rename = "CommentId")]
    pub id: Uuid,
    pub post_id: Uuid,
    #[serde(rename = "UserId")]
    pub author_user_id: String,
    pub content: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Owned for Comment {
    fn author_user_id(&self) -> Option<&str> {
        non_empty(&self.author_user_id)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

// --- Request Payloads ---

/// NewPost
///
/// Input for submitting a post. There is deliberately no author id here: the submitting user is
/// always the current session's subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub url: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
}

/// PostUpdate
///
/// Partial update of a post. Only `Some` fields are applied; ownership and approval are never
/// part of an update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PostUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
}

impl PostUpdate {
    /// Copies every provided field onto `post`.
    pub fn apply_to(self, post: &mut Post) {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(content) = self.content {
            post.content = content;
        }
        if let Some(url) = self.url {
            post.url = url;
        }
        if let Some(category_id) = self.category_id {
            post.category_id = Some(category_id);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.url.is_none()
            && self.category_id.is_none()
    }
}

/// NewComment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewComment {
    pub post_id: Uuid,
    pub content: String,
}

// --- Wire Helpers ---

/// The API stores the approval flag as an integer column; older endpoints answer with a JSON
/// boolean. Both are accepted, `0/1` is emitted.
mod approval_flag {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    pub fn serialize<S: Serializer>(approved: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*approved))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Flag::deserialize(deserializer)? {
            Flag::Bool(flag) => Ok(flag),
            Flag::Int(0) => Ok(false),
            Flag::Int(1) => Ok(true),
            Flag::Int(other) => Err(D::Error::custom(format!(
                "approval flag must be 0 or 1, got {other}"
            ))),
        }
    }
}

/// `CreatedAt` arrives either as RFC 3339 or as a zone-less timestamp that is UTC by convention.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&at.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(at) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(at.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| D::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
    }
}
