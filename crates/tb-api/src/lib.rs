//! # tb-api
//!
//! The web routing and orchestration layer for tinyboard.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod pages;

use std::sync::Arc;

use actix_web::web;
use tb_core::service::{RetrievalService, SubmissionService};
use tb_core::traits::{PostStore, ThreadStore};

/// Board-wide presentation and upload limits.
#[derive(Debug, Clone)]
pub struct BoardSettings {
    pub title: String,
    /// Replies shown per thread on the index page
    pub reply_preview: usize,
    /// Largest accepted part of a posting form
    pub max_upload_bytes: usize,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            title: "tinyboard".to_string(),
            reply_preview: 3,
            max_upload_bytes: 4 * 1024 * 1024,
        }
    }
}

/// State shared across all Actix-web workers.
pub struct AppState {
    pub retrieval: RetrievalService,
    pub submission: SubmissionService,
    pub settings: BoardSettings,
}

impl AppState {
    pub fn new(
        threads: Arc<dyn ThreadStore>,
        posts: Arc<dyn PostStore>,
        settings: BoardSettings,
    ) -> Self {
        Self {
            retrieval: RetrievalService::new(threads.clone(), posts.clone()),
            submission: SubmissionService::new(threads, posts),
            settings,
        }
    }
}

/// Configures the routes for the board.
///
/// # Developer Note
/// The JSON API lives in its own `/api` scope so it can be mounted and
/// versioned independently of the HTML pages.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/threads", web::get().to(handlers::list_threads))
            .route("/threads", web::post().to(handlers::create_thread))
            .route("/threads/{thread_id}", web::get().to(handlers::get_thread))
            .route("/posts", web::post().to(handlers::create_post)),
    )
    // The "Board Index"
    .route("/", web::get().to(pages::board_index))
    // The "Thread View" (e.g., /thread/123)
    .route("/thread/{thread_id}", web::get().to(pages::view_thread))
    // The Posting Endpoints
    .route("/form/threads", web::post().to(pages::submit_thread_form))
    .route("/form/posts", web::post().to(pages::submit_reply_form));
}
