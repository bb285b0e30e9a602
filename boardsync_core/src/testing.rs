//! In-memory board used by the scheduler and controller tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::api::BoardApi;
use crate::error::{SyncError, SyncResult};
use crate::models::{GenerationStatus, Post, PostId, Thread};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListThreads,
    CreateThread(String),
    ListPosts {
        thread_id: String,
        since: Option<PostId>,
    },
    CreatePost(String),
    DeleteThread(String),
    Status(String),
}

#[derive(Default)]
struct BoardState {
    threads: BTreeMap<String, Thread>,
    next_thread: u64,
    calls: Vec<Call>,
    scripted_status: VecDeque<SyncResult<GenerationStatus>>,
    status_delay: Option<Duration>,
    listing_delay: Option<Duration>,
    fail_list_posts: bool,
    fail_since_listings: bool,
    wrap_malformed: bool,
}

#[derive(Default)]
pub struct FakeBoard {
    state: Mutex<BoardState>,
}

impl FakeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_thread(&self, id: &str, title: &str, messages: &[&str]) {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let posts = messages
            .iter()
            .enumerate()
            .map(|(i, message)| Post {
                post_id: i as PostId + 1,
                author: "anon".into(),
                message: (*message).to_string(),
                created_at: now,
            })
            .collect();
        state.threads.insert(
            id.to_string(),
            Thread {
                id: id.to_string(),
                title: title.to_string(),
                created_at: now,
                updated_at: now,
                is_generating: false,
                posts,
            },
        );
    }

    /// Appends a post as the background responder would.
    pub fn add_reply(&self, thread_id: &str, author: &str, message: &str) {
        let mut state = self.state.lock().unwrap();
        let thread = state.threads.get_mut(thread_id).expect("thread");
        push_post(thread, author, message);
    }

    pub fn set_generating(&self, thread_id: &str, generating: bool) {
        let mut state = self.state.lock().unwrap();
        if let Some(thread) = state.threads.get_mut(thread_id) {
            thread.is_generating = generating;
        }
    }

    pub fn set_updated_at(&self, thread_id: &str, at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        if let Some(thread) = state.threads.get_mut(thread_id) {
            thread.updated_at = at;
        }
    }

    /// Queues a status answer that overrides the stored thread state once.
    pub fn script_status(&self, result: SyncResult<GenerationStatus>) {
        self.state.lock().unwrap().scripted_status.push_back(result);
    }

    pub fn set_status_delay(&self, delay: Duration) {
        self.state.lock().unwrap().status_delay = Some(delay);
    }

    pub fn set_listing_delay(&self, delay: Duration) {
        self.state.lock().unwrap().listing_delay = Some(delay);
    }

    pub fn fail_list_posts(&self, fail: bool) {
        self.state.lock().unwrap().fail_list_posts = fail;
    }

    /// Fails only listings that carry a `since` cursor.
    pub fn fail_since_listings(&self, fail: bool) {
        self.state.lock().unwrap().fail_since_listings = fail;
    }

    pub fn malformed_post_listing(&self, malformed: bool) {
        self.state.lock().unwrap().wrap_malformed = malformed;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn count_calls(&self, matcher: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| matcher(call)).count()
    }

    pub fn has_thread(&self, id: &str) -> bool {
        self.state.lock().unwrap().threads.contains_key(id)
    }
}

fn push_post(thread: &mut Thread, author: &str, message: &str) {
    let now = Utc::now();
    let post_id = thread.posts.len() as PostId + 1;
    thread.posts.push(Post {
        post_id,
        author: author.to_string(),
        message: message.to_string(),
        created_at: now,
    });
    thread.updated_at = now;
}

fn listing(state: &BoardState, thread_id: &str, since: Option<PostId>) -> SyncResult<Vec<Post>> {
    if state.fail_list_posts || (since.is_some() && state.fail_since_listings) {
        return Err(SyncError::Api {
            status: 500,
            message: "listing failed".into(),
        });
    }
    if state.wrap_malformed {
        return Err(SyncError::MalformedResponse("expected posts array".into()));
    }
    let thread = state.threads.get(thread_id).ok_or_else(not_found)?;
    let cursor = since.unwrap_or(0);
    Ok(thread
        .posts
        .iter()
        .filter(|post| post.post_id > cursor)
        .cloned()
        .collect())
}

fn not_found() -> SyncError {
    SyncError::Api {
        status: 404,
        message: "Thread not found".into(),
    }
}

#[async_trait]
impl BoardApi for FakeBoard {
    async fn list_threads(&self) -> SyncResult<Vec<Thread>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListThreads);
        Ok(state.threads.values().cloned().collect())
    }

    async fn create_thread(&self, title: &str, message: &str) -> SyncResult<Thread> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateThread(title.to_string()));
        state.next_thread += 1;
        let id = format!("thread-{}", state.next_thread);
        let now = Utc::now();
        let mut thread = Thread {
            id: id.clone(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
            is_generating: false,
            posts: Vec::new(),
        };
        push_post(&mut thread, "OP", message);
        state.threads.insert(id, thread.clone());
        Ok(thread)
    }

    async fn list_posts(&self, thread_id: &str, since: Option<PostId>) -> SyncResult<Vec<Post>> {
        let (delay, result) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::ListPosts {
                thread_id: thread_id.to_string(),
                since,
            });
            (state.listing_delay, listing(&state, thread_id, since))
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn create_post(&self, thread_id: &str, message: &str) -> SyncResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreatePost(message.to_string()));
        let thread = state.threads.get_mut(thread_id).ok_or_else(not_found)?;
        push_post(thread, "OP", message);
        Ok(())
    }

    async fn delete_thread(&self, thread_id: &str) -> SyncResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeleteThread(thread_id.to_string()));
        state.threads.remove(thread_id);
        Ok(())
    }

    async fn generation_status(&self, thread_id: &str) -> SyncResult<GenerationStatus> {
        let (delay, result) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Status(thread_id.to_string()));
            let result = match state.scripted_status.pop_front() {
                Some(scripted) => scripted,
                None => state
                    .threads
                    .get(thread_id)
                    .map(|thread| GenerationStatus {
                        is_generating: thread.is_generating,
                        post_count: thread.posts.len() as u64,
                    })
                    .ok_or_else(not_found),
            };
            (state.status_delay, result)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}
