use chrono::{DateTime, Utc};

use crate::anchors::{self, Highlight};
use crate::models::{Post, PostId, Thread};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    /// Jump straight to the target (initial loads).
    Auto,
    Smooth,
}

/// One line in the thread list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRow {
    pub id: String,
    pub title: String,
    pub post_count: usize,
    pub updated_at: DateTime<Utc>,
    pub is_generating: bool,
}

impl ThreadRow {
    pub fn from_thread(thread: &Thread) -> Self {
        Self {
            id: thread.id.clone(),
            title: thread.title.clone(),
            post_count: thread.posts.len(),
            updated_at: thread.updated_at,
            is_generating: thread.is_generating,
        }
    }
}

/// A post ready for display; `html` is already escaped and linkified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPost {
    pub post_id: PostId,
    pub element_id: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub html: String,
    pub references: Vec<PostId>,
}

impl RenderedPost {
    pub fn from_post(post: &Post) -> Self {
        Self {
            post_id: post.post_id,
            element_id: anchors::element_id(post.post_id),
            author: post.author.clone(),
            created_at: post.created_at,
            html: anchors::linkify(&post.message),
            references: anchors::references(&post.message),
        }
    }
}

pub fn render_posts(posts: &[Post]) -> Vec<RenderedPost> {
    posts.iter().map(RenderedPost::from_post).collect()
}

/// Everything the rendering surface needs to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    ThreadsListed(Vec<ThreadRow>),
    ChatOpened { thread_id: String, title: String },
    /// Full replacement of the chat pane; the last post is scrolled into view.
    PostsReplaced {
        thread_id: String,
        posts: Vec<RenderedPost>,
        scroll: ScrollBehavior,
    },
    PostsAppended {
        thread_id: String,
        posts: Vec<RenderedPost>,
        scroll: ScrollBehavior,
    },
    Generating(bool),
    Highlight(Highlight),
    HighlightCleared { post_id: PostId, element_id: String },
    /// Blocking notice for the user (failed fetch, create, or delete).
    Notice(String),
    ReturnedToList,
}
