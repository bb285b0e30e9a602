use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

pub type PostId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub title: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_generating: bool,
    #[serde(default)]
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: PostId,
    pub author: String,
    pub message: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Snapshot of a thread's background reply state, as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStatus {
    pub is_generating: bool,
    pub post_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateThreadInput {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostInput {
    pub message: String,
}

/// Post listings come back either bare or wrapped in `{ "posts": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PostsPayload {
    Bare(Vec<Post>),
    Wrapped { posts: Vec<Post> },
}

impl PostsPayload {
    pub(crate) fn into_posts(self) -> Vec<Post> {
        match self {
            PostsPayload::Bare(posts) => posts,
            PostsPayload::Wrapped { posts } => posts,
        }
    }
}

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_MESSAGE_CHARS: usize = 1000;

pub fn validate_title(title: &str) -> Result<(), SyncError> {
    validate_text("title", title, MAX_TITLE_CHARS)
}

pub fn validate_message(message: &str) -> Result<(), SyncError> {
    validate_text("message", message, MAX_MESSAGE_CHARS)
}

fn validate_text(field: &str, value: &str, max_chars: usize) -> Result<(), SyncError> {
    if value.trim().is_empty() {
        return Err(SyncError::InvalidInput(format!("{field} may not be empty")));
    }
    let chars = value.chars().count();
    if chars > max_chars {
        return Err(SyncError::InvalidInput(format!(
            "{field} is {chars} characters, limit is {max_chars}"
        )));
    }
    Ok(())
}

/// Thread ordering used by every list view: most recently updated first.
pub fn sort_threads(threads: &mut [Thread]) {
    threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

/// ISO-8601 timestamps as the board emits them. Values without an offset
/// are taken to be UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}
