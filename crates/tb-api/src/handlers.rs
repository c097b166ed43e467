//! # tb-api JSON Handlers
//!
//! This module coordinates the flow between HTTP requests and the core services.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tb_core::models::{Image, ThreadId};

use crate::error::ApiError;
use crate::AppState;

/// Body of `POST /api/threads`. Missing fields are reported by the
/// submission service, not by the JSON extractor.
#[derive(Debug, Default, Deserialize)]
pub struct CreateThreadRequest {
    pub subject: Option<String>,
    pub comment: Option<String>,
    pub author: Option<String>,
    pub image: Option<Image>,
}

/// Body of `POST /api/posts`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReplyRequest {
    pub thread_id: Option<ThreadId>,
    pub comment: Option<String>,
    pub author: Option<String>,
    pub image: Option<Image>,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    message: &'static str,
}

/// `GET /api/threads`: every thread, most recently active first.
pub async fn list_threads(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let threads = data
        .retrieval
        .get_threads()
        .await
        .map_err(|e| ApiError::new(e, "Failed to fetch threads"))?;
    Ok(HttpResponse::Ok().json(threads))
}

/// `GET /api/threads/{thread_id}`
pub async fn get_thread(
    data: web::Data<AppState>,
    path: web::Path<ThreadId>,
) -> Result<HttpResponse, ApiError> {
    let thread = data
        .retrieval
        .get_thread(path.into_inner())
        .await
        .map_err(|e| ApiError::new(e, "Failed to fetch thread"))?;
    Ok(HttpResponse::Ok().json(thread))
}

/// `POST /api/threads`
pub async fn create_thread(
    data: web::Data<AppState>,
    body: web::Json<CreateThreadRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = body.into_inner();
    let thread = data
        .submission
        .submit_thread(
            req.subject.as_deref().unwrap_or_default(),
            req.comment.as_deref().unwrap_or_default(),
            req.author.as_deref(),
            req.image,
        )
        .await
        .map_err(|e| ApiError::new(e, "Failed to create thread"))?;
    Ok(HttpResponse::Created().json(thread))
}

/// `POST /api/posts`
pub async fn create_post(
    data: web::Data<AppState>,
    body: web::Json<CreateReplyRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = body.into_inner();
    let reply = data
        .submission
        .submit_reply(
            req.thread_id,
            req.comment.as_deref().unwrap_or_default(),
            req.author.as_deref(),
            req.image,
        )
        .await
        .map_err(|e| ApiError::new(e, "Failed to create reply"))?;
    Ok(HttpResponse::Created().json(reply))
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(Health {
        status: "OK",
        message: "Server is running",
    })
}
