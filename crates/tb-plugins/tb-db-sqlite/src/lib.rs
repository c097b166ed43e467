//! # tb-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `tb-core` domain models. One pool backs both the `ThreadStore` and
//! the `PostStore` port, so writes spanning both tables share a transaction.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tb_core::error::{AppError, Result};
use tb_core::models::{Image, NewPost, Post, Thread, ThreadId};
use tb_core::traits::{PostStore, ThreadStore};
use tb_core::validate;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

// Each new timestamp is later than every stored one, so (created_at, id) and
// insertion order agree even within one millisecond or if the clock steps back.
const INSERT_THREAD: &str = "
    INSERT INTO threads (subject, created_at, last_bump)
    SELECT ?, ts, ts FROM (
        SELECT MAX(?,
                   COALESCE((SELECT MAX(created_at) FROM posts) + 1, 0),
                   COALESCE((SELECT MAX(created_at) FROM threads) + 1, 0)) AS ts
    )
    RETURNING id, subject, created_at, last_bump";

const INSERT_ORIGINAL_POST: &str = "
    INSERT INTO posts (thread_id, author, comment, image_url, image_filename, created_at)
    VALUES (?, ?, ?, ?, ?, ?)
    RETURNING id, thread_id, author, comment, image_url, image_filename, created_at";

// Selecting from `threads` makes the insert a no-op for unknown thread ids.
const INSERT_REPLY: &str = "
    INSERT INTO posts (thread_id, author, comment, image_url, image_filename, created_at)
    SELECT t.id, ?, ?, ?, ?,
           MAX(?, COALESCE((SELECT MAX(created_at) FROM posts) + 1, 0), t.created_at + 1)
    FROM threads t
    WHERE t.id = ?
    RETURNING id, thread_id, author, comment, image_url, image_filename, created_at";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens the database with the default pool size.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        Self::connect(database_url, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Opens (creating if needed) the database and applies pending migrations.
    ///
    /// An in-memory database lives only as long as its connection, so it
    /// gets exactly one connection that is never recycled.
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url {database_url}"))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open database {database_url}"))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to apply database migrations")?;

        log::info!("SQLite store ready at {database_url}");
        Ok(Self { pool })
    }

    /// Waits for in-flight queries and closes every connection.
    pub async fn close(&self) {
        self.pool.close().await;
        log::info!("SQLite store closed");
    }
}

fn store_err(err: sqlx::Error) -> AppError {
    AppError::Store(err.into())
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn millis_to_utc(ms: i64) -> std::result::Result<DateTime<Utc>, sqlx::Error> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| sqlx::Error::Decode(format!("timestamp out of range: {ms}").into()))
}

fn thread_from_row(row: &SqliteRow) -> std::result::Result<Thread, sqlx::Error> {
    Ok(Thread {
        id: row.try_get("id")?,
        subject: row.try_get("subject")?,
        created_at: millis_to_utc(row.try_get("created_at")?)?,
        last_bump: millis_to_utc(row.try_get("last_bump")?)?,
    })
}

fn post_from_row(row: &SqliteRow) -> std::result::Result<Post, sqlx::Error> {
    let url: Option<String> = row.try_get("image_url")?;
    let filename: Option<String> = row.try_get("image_filename")?;
    Ok(Post {
        id: row.try_get("id")?,
        thread_id: row.try_get("thread_id")?,
        author: row.try_get("author")?,
        comment: row.try_get("comment")?,
        image: url.map(|url| Image {
            url,
            filename: filename.unwrap_or_default(),
        }),
        created_at: millis_to_utc(row.try_get("created_at")?)?,
    })
}

/// Splits a normalized post into its bind values.
fn post_columns(post: NewPost) -> (String, String, Option<String>, Option<String>) {
    let (url, filename) = match post.image {
        Some(Image { url, filename }) => (Some(url), Some(filename)),
        None => (None, None),
    };
    (post.author.unwrap_or_default(), post.comment, url, filename)
}

#[async_trait]
impl ThreadStore for SqliteStore {
    async fn create_thread(&self, subject: &str) -> Result<ThreadId> {
        let subject = subject.trim();
        validate::require_text("subject", subject)?;

        let row = sqlx::query(INSERT_THREAD)
            .bind(subject)
            .bind(now_millis())
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        row.try_get("id").map_err(store_err)
    }

    /// Using a Transaction (tx) ensures we don't end up with "ghost threads"
    /// that have no initial post if the second insert fails.
    async fn create_thread_with_original_post(
        &self,
        subject: &str,
        original_post: NewPost,
    ) -> Result<(Thread, Post)> {
        let subject = subject.trim();
        validate::require_text("subject", subject)?;
        let original_post = validate::normalize_post(original_post)?;
        if original_post.image.is_none() {
            return Err(AppError::ValidationError(
                "image is required for new threads".to_string(),
            ));
        }
        let (author, comment, url, filename) = post_columns(original_post);

        let mut tx = self.pool.begin().await.map_err(store_err)?;

        // 1. Insert Thread
        let row = sqlx::query(INSERT_THREAD)
            .bind(subject)
            .bind(now_millis())
            .fetch_one(&mut *tx)
            .await
            .map_err(store_err)?;
        let thread = thread_from_row(&row).map_err(store_err)?;

        // 2. Insert OP Post, stamped with the thread's own creation time
        let row = sqlx::query(INSERT_ORIGINAL_POST)
            .bind(thread.id)
            .bind(author)
            .bind(comment)
            .bind(url)
            .bind(filename)
            .bind(thread.created_at.timestamp_millis())
            .fetch_one(&mut *tx)
            .await
            .map_err(store_err)?;
        let post = post_from_row(&row).map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;
        Ok((thread, post))
    }

    async fn get_thread(&self, id: ThreadId) -> Result<Option<Thread>> {
        let row = sqlx::query("SELECT id, subject, created_at, last_bump FROM threads WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        row.as_ref()
            .map(thread_from_row)
            .transpose()
            .map_err(store_err)
    }

    async fn list_threads_by_activity(&self) -> Result<Vec<Thread>> {
        let rows = sqlx::query(
            "SELECT id, subject, created_at, last_bump FROM threads ORDER BY last_bump DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter()
            .map(thread_from_row)
            .collect::<std::result::Result<_, _>>()
            .map_err(store_err)
    }
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn create_post(&self, thread_id: ThreadId, post: NewPost) -> Result<Post> {
        let (author, comment, url, filename) = post_columns(validate::normalize_post(post)?);

        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let row = sqlx::query(INSERT_REPLY)
            .bind(author)
            .bind(comment)
            .bind(url)
            .bind(filename)
            .bind(now_millis())
            .bind(thread_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(store_err)?
            .ok_or_else(|| AppError::thread_not_found(thread_id))?;
        let post = post_from_row(&row).map_err(store_err)?;

        // Bump: the new post is the newest one in the thread
        sqlx::query("UPDATE threads SET last_bump = ? WHERE id = ?")
            .bind(post.created_at.timestamp_millis())
            .bind(thread_id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;
        Ok(post)
    }

    async fn list_posts_for_thread(&self, thread_id: ThreadId) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            "SELECT id, thread_id, author, comment, image_url, image_filename, created_at
             FROM posts WHERE thread_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter()
            .map(post_from_row)
            .collect::<std::result::Result<_, _>>()
            .map_err(store_err)
    }
}
