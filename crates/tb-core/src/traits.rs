//! # Core Traits (Ports)
//!
//! Any storage plugin must implement these traits to be used by the binary.
//! All access to persisted threads and posts goes through them.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{NewPost, Post, Thread, ThreadId};

/// Persistence contract for threads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Creates a bare thread without any post.
    ///
    /// Submissions go through [`ThreadStore::create_thread_with_original_post`]
    /// instead, which upholds the "no thread without an OP" invariant.
    async fn create_thread(&self, subject: &str) -> Result<ThreadId>;

    /// Atomic operation to create a thread and its first post.
    /// Either both rows are persisted or neither is.
    async fn create_thread_with_original_post(
        &self,
        subject: &str,
        original_post: NewPost,
    ) -> Result<(Thread, Post)>;

    async fn get_thread(&self, id: ThreadId) -> Result<Option<Thread>>;

    /// Every thread, most recently active first. Threads bumped at the same
    /// instant are ordered by descending id.
    async fn list_threads_by_activity(&self) -> Result<Vec<Thread>>;
}

/// Persistence contract for posts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Appends a post to an existing thread and bumps the thread.
    async fn create_post(&self, thread_id: ThreadId, post: NewPost) -> Result<Post>;

    /// All posts of a thread in `(created_at, id)` ascending order.
    async fn list_posts_for_thread(&self, thread_id: ThreadId) -> Result<Vec<Post>>;
}
