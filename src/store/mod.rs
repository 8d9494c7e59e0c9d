//! Document store access.
//!
//! # Data Flow
//! ```text
//! Route handler
//!     → DocumentStore trait (typed queries)
//!     → mongo.rs (MongoDB collections: users, sessions, videos, earnings)
//!       or memory.rs (in-process maps for tests and local runs)
//! ```
//!
//! # Design Decisions
//! - One process-wide handle, built at startup and shared via Arc
//! - Failed initial connection is fatal (caller decides to exit)
//! - Identifiers are opaque strings outside this module

pub mod memory;
pub mod models;
pub mod mongo;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use models::{Earning, Role, User, Video, VideoQuery};
pub use mongo::MongoStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("database unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Queries the route groups need from the document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Round-trip to the server; used at startup and by the health check.
    async fn ping(&self) -> StoreResult<()>;

    /// Resolve an unexpired session, by token digest, to its user.
    async fn find_user_by_session(&self, token_hash: &str) -> StoreResult<Option<User>>;

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>>;

    async fn list_videos(&self, query: &VideoQuery) -> StoreResult<Vec<Video>>;

    async fn find_video(&self, id: &str) -> StoreResult<Option<Video>>;

    /// Earnings credited to one user, newest first.
    async fn list_earnings(&self, user_id: &str) -> StoreResult<Vec<Earning>>;
}
