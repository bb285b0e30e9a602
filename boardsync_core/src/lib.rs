//! Client-side sync engine for a threaded board whose replies may be written
//! by a slow background responder.
//!
//! [`ViewController`] is the entry point: it moves between the thread list and
//! a single chat, keeps the open thread's [`PostStore`] in step with the server
//! through cursor-based fetches, and runs the [`PollingScheduler`] that waits
//! for background replies to finish. Rendering is left to whoever consumes the
//! [`ViewEvent`] stream.

pub mod anchors;
pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod models;
pub mod polling;
pub mod store;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, BoardApi};
pub use config::SyncConfig;
pub use controller::{ViewController, ViewState};
pub use error::{SyncError, SyncResult};
pub use events::{RenderedPost, ScrollBehavior, ThreadRow, ViewEvent};
pub use models::{GenerationStatus, Post, PostId, Thread};
pub use polling::{PollState, PollingScheduler};
pub use store::PostStore;
