use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::models::{
    CreatePostInput, CreateThreadInput, GenerationStatus, Post, PostId, PostsPayload, Thread,
};

/// Remote operations the sync engine needs from the board.
#[async_trait]
pub trait BoardApi: Send + Sync {
    async fn list_threads(&self) -> SyncResult<Vec<Thread>>;

    async fn create_thread(&self, title: &str, message: &str) -> SyncResult<Thread>;

    /// Full history when `since` is `None`, otherwise only posts with an id
    /// greater than `since`, ascending.
    async fn list_posts(&self, thread_id: &str, since: Option<PostId>) -> SyncResult<Vec<Post>>;

    async fn create_post(&self, thread_id: &str, message: &str) -> SyncResult<()>;

    async fn delete_thread(&self, thread_id: &str) -> SyncResult<()>;

    async fn generation_status(&self, thread_id: &str) -> SyncResult<GenerationStatus>;
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let base = sanitize_base_url(base_url.into())?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> SyncResult<Url> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&raw).map_err(|err| SyncError::InvalidBaseUrl(format!("{raw}: {err}")))
    }
}

#[async_trait]
impl BoardApi for ApiClient {
    async fn list_threads(&self) -> SyncResult<Vec<Thread>> {
        let url = self.url("/threads")?;
        let response = check_status(self.client.get(url).send().await?).await?;
        read_json(response).await
    }

    async fn create_thread(&self, title: &str, message: &str) -> SyncResult<Thread> {
        let url = self.url("/threads")?;
        let input = CreateThreadInput {
            title: title.to_string(),
            message: message.to_string(),
        };
        let response = check_status(self.client.post(url).json(&input).send().await?).await?;
        read_json(response).await
    }

    async fn list_posts(&self, thread_id: &str, since: Option<PostId>) -> SyncResult<Vec<Post>> {
        let url = self.url(&format!("/threads/{thread_id}/posts"))?;
        let mut request = self.client.get(url);
        if let Some(since) = since {
            request = request.query(&[("since", since)]);
        }
        let response = check_status(request.send().await?).await?;
        let payload: PostsPayload = read_json(response).await?;
        let posts = payload.into_posts();
        debug!(thread_id, ?since, count = posts.len(), "listed posts");
        Ok(posts)
    }

    async fn create_post(&self, thread_id: &str, message: &str) -> SyncResult<()> {
        let url = self.url(&format!("/threads/{thread_id}/posts"))?;
        let input = CreatePostInput {
            message: message.to_string(),
        };
        check_status(self.client.post(url).json(&input).send().await?).await?;
        Ok(())
    }

    async fn delete_thread(&self, thread_id: &str) -> SyncResult<()> {
        let url = self.url(&format!("/threads/{thread_id}"))?;
        let response = self.client.delete(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(thread_id, "thread already gone");
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }

    async fn generation_status(&self, thread_id: &str) -> SyncResult<GenerationStatus> {
        let url = self.url(&format!("/threads/{thread_id}/status"))?;
        let response = check_status(self.client.get(url).send().await?).await?;
        read_json(response).await
    }
}

async fn check_status(response: Response) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read body".to_string());
    Err(SyncError::Api {
        status: status.as_u16(),
        message: error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        }),
    })
}

/// Pulls the human-readable message out of an error body: `detail` or
/// `message` when the body is JSON, otherwise the trimmed text itself.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["detail", "message", "error"] {
            match value.get(key) {
                Some(serde_json::Value::String(text)) => return Some(text.clone()),
                Some(other) if !other.is_null() => return Some(other.to_string()),
                _ => {}
            }
        }
    }
    Some(trimmed.to_string())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> SyncResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| SyncError::MalformedResponse(err.to_string()))
}

fn sanitize_base_url(mut base: String) -> SyncResult<String> {
    base = base.trim().to_string();
    if !base.starts_with("http://") && !base.starts_with("https://") {
        base = format!("http://{base}");
    }
    while base.ends_with('/') {
        base.pop();
    }
    Url::parse(&base).map_err(|err| SyncError::InvalidBaseUrl(format!("{base}: {err}")))?;
    Ok(base)
}
