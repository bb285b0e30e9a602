use crate::models::{Post, PostId};

/// Post history for the thread currently open in the chat view.
///
/// Posts are kept strictly ascending by id. Once stored, a post is never
/// replaced; incremental merges only ever append past the highest id.
#[derive(Debug, Default)]
pub struct PostStore {
    thread_id: Option<String>,
    posts: Vec<Post>,
}

impl PostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Full load on view entry. Prior state is discarded.
    pub fn replace_all(&mut self, thread_id: impl Into<String>, mut posts: Vec<Post>) {
        posts.sort_by_key(|post| post.post_id);
        posts.dedup_by_key(|post| post.post_id);
        self.thread_id = Some(thread_id.into());
        self.posts = posts;
    }

    /// Appends the posts whose id is above the current maximum and returns
    /// them. Duplicates and stale ids are dropped without complaint.
    pub fn merge_incremental(&mut self, mut posts: Vec<Post>) -> Vec<Post> {
        posts.sort_by_key(|post| post.post_id);

        let mut accepted = Vec::new();
        for post in posts {
            if post.post_id > self.highest_id() {
                self.posts.push(post.clone());
                accepted.push(post);
            }
        }
        accepted
    }

    pub fn highest_id(&self) -> PostId {
        self.posts.last().map(|post| post.post_id).unwrap_or(0)
    }

    pub fn count(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn get(&self, post_id: PostId) -> Option<&Post> {
        self.posts
            .binary_search_by_key(&post_id, |post| post.post_id)
            .ok()
            .map(|index| &self.posts[index])
    }

    pub fn contains(&self, post_id: PostId) -> bool {
        self.get(post_id).is_some()
    }

    pub fn clear(&mut self) {
        self.thread_id = None;
        self.posts.clear();
    }
}
