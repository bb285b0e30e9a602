//! Back-references between posts.
//!
//! A message may point at an earlier post with `>N`. Rendering escapes the
//! raw text first and only then turns the escaped `&gt;N` form into a link,
//! so nothing the author typed can reintroduce live markup.

use std::time::Duration;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::events::ScrollBehavior;
use crate::models::PostId;
use crate::store::PostStore;

lazy_static! {
    static ref ESCAPED_ANCHOR: Regex = Regex::new(r"&gt;(\d+)").unwrap();
    static ref RAW_ANCHOR: Regex = Regex::new(r">(\d+)").unwrap();
}

pub const ANCHOR_CLASS: &str = "anchor-link";

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Escapes `raw` and turns every `>N` into a link to post `N`. The marker
/// text stays visible inside the link.
pub fn linkify(raw: &str) -> String {
    let escaped = escape_html(raw);
    ESCAPED_ANCHOR
        .replace_all(&escaped, |caps: &Captures| {
            let id = &caps[1];
            format!(r##"<a href="#" class="{ANCHOR_CLASS}" data-post-id="{id}">&gt;{id}</a>"##)
        })
        .into_owned()
}

/// Referenced post ids, deduplicated, in order of first appearance.
pub fn references(raw: &str) -> Vec<PostId> {
    let mut ids = Vec::new();
    for caps in RAW_ANCHOR.captures_iter(raw) {
        if let Ok(id) = caps[1].parse::<PostId>() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

pub fn element_id(post_id: PostId) -> String {
    format!("post-{post_id}")
}

/// Instruction to scroll a rendered post to the center of the view and mark
/// it for `duration`, after which the mark is removed again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub post_id: PostId,
    pub element_id: String,
    pub scroll: ScrollBehavior,
    pub duration: Duration,
}

/// Resolves a clicked reference against the posts currently in view.
/// References to posts that are not loaded resolve to nothing.
pub fn resolve_click(store: &PostStore, post_id: PostId, duration: Duration) -> Option<Highlight> {
    if !store.contains(post_id) {
        return None;
    }
    Some(Highlight {
        post_id,
        element_id: element_id(post_id),
        scroll: ScrollBehavior::Smooth,
        duration,
    })
}
