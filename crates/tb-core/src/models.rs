//! # Domain Models
//!
//! These structs represent the core entities of tinyboard.
//! Identities are integers allocated by the store, timestamps are assigned
//! by the store at write time and travel over the wire as epoch milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned identity of a thread.
pub type ThreadId = i64;

/// Store-assigned identity of a post.
pub type PostId = i64;

/// Display name used when a poster leaves the name field empty.
pub const ANONYMOUS: &str = "Anonymous";

/// An attached image. The board never looks inside `url`; it may be a link
/// or an embedded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    /// Original filename as chosen by the uploader
    #[serde(default)]
    pub filename: String,
}

/// A discussion unit. Its posts live in the post store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: ThreadId,
    pub subject: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Creation time of the newest post; drives listing order
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_bump: DateTime<Utc>,
}

/// The fundamental unit of conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub thread_id: ThreadId,
    pub author: String,
    pub comment: String,
    pub image: Option<Image>,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Content of a post that has not been written yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPost {
    pub author: Option<String>,
    pub comment: String,
    pub image: Option<Image>,
}

/// A thread as the outside world sees it: the original post split off from
/// the replies, replies oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadView {
    pub id: ThreadId,
    pub subject: String,
    #[serde(rename = "op")]
    pub original_post: Post,
    pub replies: Vec<Post>,
}

impl ThreadView {
    /// Splits an ordered post history into OP and replies.
    ///
    /// Returns `None` when `posts` is empty, i.e. the thread has no original post.
    pub fn assemble(thread: Thread, posts: Vec<Post>) -> Option<Self> {
        let mut posts = posts.into_iter();
        let original_post = posts.next()?;
        Some(Self {
            id: thread.id,
            subject: thread.subject,
            original_post,
            replies: posts.collect(),
        })
    }
}
