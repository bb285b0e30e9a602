use std::sync::Arc;
use std::time::Duration;

use flume::{Receiver, Sender};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::anchors::{self, Highlight};
use crate::api::{ApiClient, BoardApi};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::events::{render_posts, ScrollBehavior, ThreadRow, ViewEvent};
use crate::models::{self, Post, PostId, Thread};
use crate::polling::PollingScheduler;
use crate::store::PostStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    ThreadList,
    Chat { thread_id: String, title: String },
}

/// Top-level navigation between the thread list and a single chat, driving
/// the post store and the poller as the view changes.
pub struct ViewController {
    api: Arc<dyn BoardApi>,
    store: Arc<Mutex<PostStore>>,
    scheduler: PollingScheduler,
    events: Sender<ViewEvent>,
    state: ViewState,
    highlight_duration: Duration,
}

impl ViewController {
    pub fn new(api: Arc<dyn BoardApi>, config: &SyncConfig, events: Sender<ViewEvent>) -> Self {
        let store = Arc::new(Mutex::new(PostStore::new()));
        let scheduler = PollingScheduler::new(
            Arc::clone(&api),
            Arc::clone(&store),
            events.clone(),
            config.poll_interval(),
        );
        Self {
            api,
            store,
            scheduler,
            events,
            state: ViewState::ThreadList,
            highlight_duration: config.highlight_duration(),
        }
    }

    /// Builds a controller talking HTTP to `config.api_url`, returning the
    /// receiving end of its event stream.
    pub fn connect(config: &SyncConfig) -> SyncResult<(Self, Receiver<ViewEvent>)> {
        let client = ApiClient::new(config.api_url.clone(), config.request_timeout())?;
        let (tx, rx) = flume::unbounded();
        Ok((Self::new(Arc::new(client), config, tx), rx))
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn scheduler(&self) -> &PollingScheduler {
        &self.scheduler
    }

    pub fn open_thread_id(&self) -> Option<&str> {
        match &self.state {
            ViewState::Chat { thread_id, .. } => Some(thread_id),
            ViewState::ThreadList => None,
        }
    }

    /// Snapshot of the posts currently held for the open thread.
    pub async fn posts(&self) -> Vec<Post> {
        self.store.lock().await.posts().to_vec()
    }

    pub async fn show_thread_list(&mut self) -> SyncResult<Vec<ThreadRow>> {
        self.scheduler.stop();
        self.store.lock().await.clear();
        if self.state != ViewState::ThreadList {
            self.state = ViewState::ThreadList;
            self.emit(ViewEvent::ReturnedToList);
        }
        self.refresh_threads().await
    }

    pub async fn go_back(&mut self) -> SyncResult<Vec<ThreadRow>> {
        self.show_thread_list().await
    }

    async fn refresh_threads(&mut self) -> SyncResult<Vec<ThreadRow>> {
        let mut threads = match self.api.list_threads().await {
            Ok(threads) => threads,
            Err(err) => return Err(self.notice("failed to load threads", err)),
        };
        models::sort_threads(&mut threads);
        let rows: Vec<ThreadRow> = threads.iter().map(ThreadRow::from_thread).collect();
        debug!(count = rows.len(), "threads listed");
        self.emit(ViewEvent::ThreadsListed(rows.clone()));
        Ok(rows)
    }

    /// Enters the chat view: full load, then polling regardless of whether a
    /// reply is pending.
    pub async fn open_thread(&mut self, thread_id: &str, title: &str) -> SyncResult<()> {
        self.scheduler.stop();
        self.state = ViewState::Chat {
            thread_id: thread_id.to_string(),
            title: title.to_string(),
        };
        self.emit(ViewEvent::ChatOpened {
            thread_id: thread_id.to_string(),
            title: title.to_string(),
        });
        info!(thread_id, "opening thread");

        let loaded = match self.api.list_posts(thread_id, None).await {
            Ok(posts) => Ok(posts),
            Err(err) if err.is_malformed() => {
                warn!(thread_id, error = %err, "unreadable post listing, rendering empty");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        };

        let result = match loaded {
            Ok(posts) => {
                let rendered = {
                    let mut store = self.store.lock().await;
                    store.replace_all(thread_id, posts);
                    render_posts(store.posts())
                };
                self.emit(ViewEvent::PostsReplaced {
                    thread_id: thread_id.to_string(),
                    posts: rendered,
                    scroll: ScrollBehavior::Auto,
                });
                Ok(())
            }
            Err(err) => {
                // Nothing from the previous thread may linger under this one.
                self.store.lock().await.replace_all(thread_id, Vec::new());
                Err(self.notice("failed to load posts", err))
            }
        };

        self.scheduler.start(thread_id);
        result
    }

    pub async fn create_thread(&mut self, title: &str, message: &str) -> SyncResult<Thread> {
        models::validate_title(title)?;
        models::validate_message(message)?;
        let thread = match self.api.create_thread(title, message).await {
            Ok(thread) => thread,
            Err(err) => return Err(self.notice("failed to create thread", err)),
        };
        info!(thread_id = %thread.id, "thread created");
        self.open_thread(&thread.id, &thread.title).await?;
        Ok(thread)
    }

    /// Posts to the open thread, pulls in everything after the pre-submit
    /// cursor (the new post included) and restarts polling for a reply.
    pub async fn submit_post(&mut self, message: &str) -> SyncResult<Vec<Post>> {
        let thread_id = self
            .open_thread_id()
            .map(str::to_string)
            .ok_or(SyncError::NotInChat)?;
        models::validate_message(message)?;

        let cursor = self.store.lock().await.highest_id();
        if let Err(err) = self.api.create_post(&thread_id, message).await {
            return Err(self.notice("failed to post", err));
        }

        let accepted = match self.api.list_posts(&thread_id, Some(cursor)).await {
            Ok(posts) => self.merge_for(&thread_id, posts).await,
            Err(err) => {
                warn!(
                    thread_id = %thread_id,
                    since = cursor,
                    error = %err,
                    "fetch after post failed"
                );
                Vec::new()
            }
        };

        self.scheduler.start(&thread_id);
        Ok(accepted)
    }

    async fn merge_for(&self, thread_id: &str, posts: Vec<Post>) -> Vec<Post> {
        let accepted = {
            let mut store = self.store.lock().await;
            if store.thread_id() != Some(thread_id) {
                return Vec::new();
            }
            store.merge_incremental(posts)
        };
        if !accepted.is_empty() {
            self.emit(ViewEvent::PostsAppended {
                thread_id: thread_id.to_string(),
                posts: render_posts(&accepted),
                scroll: ScrollBehavior::Smooth,
            });
        }
        accepted
    }

    pub async fn delete_thread(&mut self, thread_id: &str) -> SyncResult<()> {
        if let Err(err) = self.api.delete_thread(thread_id).await {
            return Err(self.notice("failed to delete thread", err));
        }
        info!(thread_id, "thread deleted");

        if self.open_thread_id() == Some(thread_id) {
            self.show_thread_list().await?;
        } else if self.state == ViewState::ThreadList {
            self.refresh_threads().await?;
        }
        Ok(())
    }

    /// Follows a `>N` reference. Unloaded targets are ignored. The highlight
    /// is cleared again once its duration has passed.
    pub async fn click_anchor(&self, post_id: PostId) -> Option<Highlight> {
        let highlight = {
            let store = self.store.lock().await;
            anchors::resolve_click(&store, post_id, self.highlight_duration)
        }?;

        self.emit(ViewEvent::Highlight(highlight.clone()));
        let events = self.events.clone();
        let cleared = ViewEvent::HighlightCleared {
            post_id,
            element_id: highlight.element_id.clone(),
        };
        let duration = highlight.duration;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = events.send(cleared);
        });
        Some(highlight)
    }

    fn emit(&self, event: ViewEvent) {
        if self.events.send(event).is_err() {
            debug!("view event dropped, no receiver");
        }
    }

    fn notice(&self, context: &str, err: SyncError) -> SyncError {
        warn!(error = %err, "{context}");
        self.emit(ViewEvent::Notice(format!("{context}: {err}")));
        err
    }
}
