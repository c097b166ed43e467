//! # Services
//!
//! Compose the store ports into the operations the API exposes.

use std::sync::Arc;

use futures_util::future::try_join_all;

use crate::error::{AppError, Result};
use crate::models::{Image, NewPost, Post, ThreadId, ThreadView};
use crate::traits::{PostStore, ThreadStore};
use crate::validate;

/// Read side: threads with their original post and replies.
#[derive(Clone)]
pub struct RetrievalService {
    threads: Arc<dyn ThreadStore>,
    posts: Arc<dyn PostStore>,
}

impl RetrievalService {
    pub fn new(threads: Arc<dyn ThreadStore>, posts: Arc<dyn PostStore>) -> Self {
        Self { threads, posts }
    }

    /// Every thread, most recently active first.
    ///
    /// Post histories are fetched concurrently; `try_join_all` hands them
    /// back in input order, so the activity order survives the fan-out.
    /// Any failure fails the whole listing.
    pub async fn get_threads(&self) -> Result<Vec<ThreadView>> {
        let threads = self
            .threads
            .list_threads_by_activity()
            .await
            .map_err(retrieval_failed)?;

        let histories = try_join_all(
            threads
                .iter()
                .map(|thread| self.posts.list_posts_for_thread(thread.id)),
        )
        .await
        .map_err(retrieval_failed)?;

        threads
            .into_iter()
            .zip(histories)
            .map(|(thread, posts)| {
                let id = thread.id;
                ThreadView::assemble(thread, posts).ok_or_else(|| missing_op(id))
            })
            .collect()
    }

    /// A single thread with all of its replies.
    pub async fn get_thread(&self, id: ThreadId) -> Result<ThreadView> {
        let thread = self
            .threads
            .get_thread(id)
            .await?
            .ok_or_else(|| AppError::thread_not_found(id))?;
        let posts = self.posts.list_posts_for_thread(id).await?;
        ThreadView::assemble(thread, posts).ok_or_else(|| missing_op(id))
    }
}

fn retrieval_failed(err: AppError) -> AppError {
    AppError::Retrieval(err.to_string())
}

fn missing_op(id: ThreadId) -> AppError {
    log::warn!("thread {id} has no posts");
    AppError::Retrieval(format!("thread {id} has no original post"))
}

/// Write side: validates submissions before anything touches the store.
#[derive(Clone)]
pub struct SubmissionService {
    threads: Arc<dyn ThreadStore>,
    posts: Arc<dyn PostStore>,
}

impl SubmissionService {
    pub fn new(threads: Arc<dyn ThreadStore>, posts: Arc<dyn PostStore>) -> Self {
        Self { threads, posts }
    }

    /// Starts a new thread. Subject, comment and image are all mandatory.
    pub async fn submit_thread(
        &self,
        subject: &str,
        comment: &str,
        author: Option<&str>,
        image: Option<Image>,
    ) -> Result<ThreadView> {
        validate::require_text("subject", subject)?;
        validate::require_text("comment", comment)?;
        let image = validate::present_image(image).ok_or_else(|| {
            AppError::ValidationError("image is required for new threads".to_string())
        })?;

        let original_post = NewPost {
            author: author.map(str::to_string),
            comment: comment.to_string(),
            image: Some(image),
        };
        let (thread, original_post) = self
            .threads
            .create_thread_with_original_post(subject.trim(), original_post)
            .await?;
        log::info!("thread {} created", thread.id);

        Ok(ThreadView {
            id: thread.id,
            subject: thread.subject,
            original_post,
            replies: Vec::new(),
        })
    }

    /// Appends a reply. The image is optional.
    pub async fn submit_reply(
        &self,
        thread_id: Option<ThreadId>,
        comment: &str,
        author: Option<&str>,
        image: Option<Image>,
    ) -> Result<Post> {
        let thread_id = thread_id
            .ok_or_else(|| AppError::ValidationError("thread id is required".to_string()))?;
        validate::require_text("comment", comment)?;

        let reply = self
            .posts
            .create_post(
                thread_id,
                NewPost {
                    author: author.map(str::to_string),
                    comment: comment.to_string(),
                    image,
                },
            )
            .await?;
        log::debug!("post {} added to thread {thread_id}", reply.id);
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Thread;
    use crate::traits::{MockPostStore, MockThreadStore};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::time::Duration;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn thread(id: ThreadId, bump: i64) -> Thread {
        Thread {
            id,
            subject: format!("thread {id}"),
            created_at: at(id),
            last_bump: at(bump),
        }
    }

    fn post(id: i64, thread_id: ThreadId) -> Post {
        Post {
            id,
            thread_id,
            author: "Anonymous".into(),
            comment: format!("post {id}"),
            image: None,
            created_at: at(id),
        }
    }

    fn image() -> Image {
        Image {
            url: "data:image/png;base64,AAAA".into(),
            filename: "a.png".into(),
        }
    }

    fn retrieval(threads: MockThreadStore, posts: MockPostStore) -> RetrievalService {
        RetrievalService::new(Arc::new(threads), Arc::new(posts))
    }

    fn submission(threads: MockThreadStore, posts: MockPostStore) -> SubmissionService {
        SubmissionService::new(Arc::new(threads), Arc::new(posts))
    }

    #[tokio::test]
    async fn listing_splits_op_from_replies_in_activity_order() {
        let mut threads = MockThreadStore::new();
        threads
            .expect_list_threads_by_activity()
            .times(1)
            .returning(|| Ok(vec![thread(2, 50), thread(1, 40)]));
        let mut posts = MockPostStore::new();
        posts
            .expect_list_posts_for_thread()
            .returning(|id| match id {
                1 => Ok(vec![post(10, 1), post(11, 1), post(12, 1)]),
                _ => Ok(vec![post(20, 2)]),
            });

        let views = retrieval(threads, posts).get_threads().await.unwrap();

        assert_eq!(views.iter().map(|v| v.id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(views[0].original_post.id, 20);
        assert!(views[0].replies.is_empty());
        assert_eq!(views[1].original_post.id, 10);
        assert_eq!(
            views[1].replies.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![11, 12]
        );
    }

    #[tokio::test]
    async fn one_failed_history_fails_the_whole_listing() {
        let mut threads = MockThreadStore::new();
        threads
            .expect_list_threads_by_activity()
            .returning(|| Ok(vec![thread(1, 1), thread(2, 2), thread(3, 3)]));
        let mut posts = MockPostStore::new();
        posts.expect_list_posts_for_thread().returning(|id| {
            if id == 2 {
                Err(AppError::Store(anyhow::anyhow!("disk I/O error")))
            } else {
                Ok(vec![post(id * 10, id)])
            }
        });

        let err = retrieval(threads, posts).get_threads().await.unwrap_err();
        assert!(matches!(err, AppError::Retrieval(msg) if msg.contains("disk I/O error")));
    }

    #[tokio::test]
    async fn failed_thread_listing_is_a_retrieval_error() {
        let mut threads = MockThreadStore::new();
        threads
            .expect_list_threads_by_activity()
            .returning(|| Err(AppError::Store(anyhow::anyhow!("database is locked"))));
        let mut posts = MockPostStore::new();
        posts.expect_list_posts_for_thread().never();

        let err = retrieval(threads, posts).get_threads().await.unwrap_err();
        assert!(matches!(err, AppError::Retrieval(_)));
    }

    #[tokio::test]
    async fn thread_without_posts_fails_the_listing() {
        let mut threads = MockThreadStore::new();
        threads
            .expect_list_threads_by_activity()
            .returning(|| Ok(vec![thread(1, 1)]));
        let mut posts = MockPostStore::new();
        posts
            .expect_list_posts_for_thread()
            .returning(|_| Ok(Vec::new()));

        let err = retrieval(threads, posts).get_threads().await.unwrap_err();
        assert!(matches!(err, AppError::Retrieval(msg) if msg.contains("no original post")));
    }

    /// Finishes the fetch for low ids last.
    struct SlowForOldThreads;

    #[async_trait]
    impl PostStore for SlowForOldThreads {
        async fn create_post(&self, _thread_id: ThreadId, _post: NewPost) -> Result<Post> {
            unreachable!("read-only fake")
        }

        async fn list_posts_for_thread(&self, thread_id: ThreadId) -> Result<Vec<Post>> {
            tokio::time::sleep(Duration::from_millis(5 * (6 - thread_id as u64))).await;
            Ok(vec![post(thread_id * 100, thread_id)])
        }
    }

    #[tokio::test]
    async fn fan_out_keeps_activity_order_when_fetches_finish_out_of_order() {
        let mut threads = MockThreadStore::new();
        threads.expect_list_threads_by_activity().returning(|| {
            Ok((1..=5).map(|id| thread(id, 100 - id)).collect())
        });
        let service = RetrievalService::new(Arc::new(threads), Arc::new(SlowForOldThreads));

        let views = service.get_threads().await.unwrap();
        assert_eq!(
            views.iter().map(|v| v.id).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
        assert!(views.iter().all(|v| v.original_post.thread_id == v.id));
    }

    #[tokio::test]
    async fn get_thread_reports_unknown_ids() {
        let mut threads = MockThreadStore::new();
        threads.expect_get_thread().returning(|_| Ok(None));
        let mut posts = MockPostStore::new();
        posts.expect_list_posts_for_thread().never();

        let err = retrieval(threads, posts).get_thread(404).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(kind, id) if kind == "Thread" && id == "404"));
    }

    #[tokio::test]
    async fn submit_thread_writes_thread_and_op_together() {
        let mut threads = MockThreadStore::new();
        threads.expect_create_thread().never();
        threads
            .expect_create_thread_with_original_post()
            .times(1)
            .returning(|subject, op| {
                let t = Thread {
                    subject: subject.to_string(),
                    ..thread(7, 70)
                };
                let p = Post {
                    author: op.author.unwrap_or_else(|| "Anonymous".into()),
                    comment: op.comment,
                    image: op.image,
                    ..post(70, 7)
                };
                Ok((t, p))
            });

        let view = submission(threads, MockPostStore::new())
            .submit_thread("Hello", "first", None, Some(image()))
            .await
            .unwrap();

        assert_eq!(view.id, 7);
        assert_eq!(view.subject, "Hello");
        assert_eq!(view.original_post.comment, "first");
        assert_eq!(view.original_post.image, Some(image()));
        assert!(view.replies.is_empty());
    }

    #[tokio::test]
    async fn submit_thread_rejects_missing_fields_without_writing() {
        let cases: [(&str, &str, Option<Image>, &str); 4] = [
            ("", "first", Some(image()), "subject is required"),
            ("Hello", "", Some(image()), "comment is required"),
            ("Hello", "first", None, "image is required for new threads"),
            (
                "Hello",
                "first",
                Some(Image {
                    url: " ".into(),
                    filename: "a.png".into(),
                }),
                "image is required for new threads",
            ),
        ];

        for (subject, comment, image, expected) in cases {
            let mut threads = MockThreadStore::new();
            threads.expect_create_thread().never();
            threads.expect_create_thread_with_original_post().never();
            let err = submission(threads, MockPostStore::new())
                .submit_thread(subject, comment, None, image)
                .await
                .unwrap_err();
            assert!(
                matches!(&err, AppError::ValidationError(msg) if msg == expected),
                "unexpected error {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn submit_reply_requires_thread_and_comment() {
        let mut posts = MockPostStore::new();
        posts.expect_create_post().never();
        let service = submission(MockThreadStore::new(), posts);

        let err = service.submit_reply(None, "second", None, None).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(msg) if msg == "thread id is required"));

        let err = service.submit_reply(Some(1), "", None, None).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(msg) if msg == "comment is required"));
    }

    #[tokio::test]
    async fn submit_reply_passes_store_errors_through() {
        let mut posts = MockPostStore::new();
        posts
            .expect_create_post()
            .returning(|id, _| Err(AppError::thread_not_found(id)));

        let err = submission(MockThreadStore::new(), posts)
            .submit_reply(Some(99), "second", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_, id) if id == "99"));
    }
}
