//! # Board Pages
//!
//! Server-rendered client view: the board index, single threads, and the
//! multipart forms that create threads and replies.

use std::collections::HashMap;

use actix_multipart::{Multipart, MultipartError};
use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpResponse};
use askama::Template;
use base64::Engine;
use futures_util::TryStreamExt;
use tb_core::error::AppError;
use tb_core::models::{Image, ThreadId};
use tb_ui::{ErrorTemplate, IndexTemplate, ThreadPreview, ThreadTemplate};

use crate::error::ApiError;
use crate::AppState;

/// Renders the board index with a capped reply window per thread.
pub async fn board_index(data: web::Data<AppState>) -> HttpResponse {
    let settings = &data.settings;
    match data.retrieval.get_threads().await {
        Ok(views) => {
            let threads: Vec<_> = views
                .iter()
                .map(|view| ThreadPreview::new(view, Some(settings.reply_preview)))
                .collect();
            render(
                StatusCode::OK,
                &IndexTemplate {
                    threads: &threads,
                    title: &settings.title,
                },
            )
        }
        Err(err) => {
            log::error!("failed to load board index: {err}");
            error_page(&data, StatusCode::INTERNAL_SERVER_ERROR, "Failed to load threads.")
        }
    }
}

/// Renders one thread with every reply.
pub async fn view_thread(data: web::Data<AppState>, path: web::Path<ThreadId>) -> HttpResponse {
    match data.retrieval.get_thread(path.into_inner()).await {
        Ok(view) => {
            let thread = ThreadPreview::new(&view, None);
            render(
                StatusCode::OK,
                &ThreadTemplate {
                    thread: &thread,
                    title: &data.settings.title,
                },
            )
        }
        Err(err @ AppError::NotFound(..)) => {
            error_page(&data, StatusCode::NOT_FOUND, &format!("{err}."))
        }
        Err(err) => {
            log::error!("failed to load thread: {err}");
            error_page(&data, StatusCode::INTERNAL_SERVER_ERROR, "Failed to load thread.")
        }
    }
}

/// Handles the "Start a New Thread" form.
pub async fn submit_thread_form(data: web::Data<AppState>, payload: Multipart) -> HttpResponse {
    match thread_from_form(&data, payload).await {
        Ok(thread_id) => see_other(thread_id),
        Err(err) => submit_failed(&data, err),
    }
}

/// Handles the per-thread reply form.
pub async fn submit_reply_form(data: web::Data<AppState>, payload: Multipart) -> HttpResponse {
    match reply_from_form(&data, payload).await {
        Ok(thread_id) => see_other(thread_id),
        Err(err) => submit_failed(&data, err),
    }
}

async fn thread_from_form(data: &AppState, payload: Multipart) -> Result<ThreadId, AppError> {
    let mut form = read_form(payload, data.settings.max_upload_bytes).await?;
    let image = form.image.take();
    let thread = data
        .submission
        .submit_thread(
            &form.text("subject"),
            &form.text("comment"),
            form.field("author"),
            image,
        )
        .await?;
    Ok(thread.id)
}

async fn reply_from_form(data: &AppState, payload: Multipart) -> Result<ThreadId, AppError> {
    let mut form = read_form(payload, data.settings.max_upload_bytes).await?;
    let image = form.image.take();
    let thread_id = form
        .field("thread_id")
        .and_then(|id| id.trim().parse::<ThreadId>().ok());
    let reply = data
        .submission
        .submit_reply(thread_id, &form.text("comment"), form.field("author"), image)
        .await?;
    Ok(reply.thread_id)
}

/// Text fields plus the optional uploaded image of a posting form.
#[derive(Debug, Default)]
struct PostForm {
    fields: HashMap<String, String>,
    image: Option<Image>,
}

impl PostForm {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }
}

/// Posting forms carry at most subject, author, comment, thread_id and image.
const MAX_FORM_PARTS: usize = 8;

/// Drains the multipart stream. The `image` part becomes a `data:` URL so
/// the core can treat it as an opaque reference; every part is capped at
/// `max_bytes` and the number of parts at [`MAX_FORM_PARTS`].
async fn read_form(mut payload: Multipart, max_bytes: usize) -> Result<PostForm, AppError> {
    let mut form = PostForm::default();
    let mut parts = 0;

    while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
        parts += 1;
        if parts > MAX_FORM_PARTS {
            return Err(AppError::ValidationError(format!(
                "form has more than {MAX_FORM_PARTS} fields"
            )));
        }

        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let filename = disposition.get_filename().map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(malformed)? {
            if data.len() + chunk.len() > max_bytes {
                return Err(AppError::ValidationError(format!(
                    "File size cannot exceed {}.",
                    size_label(max_bytes)
                )));
            }
            data.extend_from_slice(&chunk);
        }

        if name == "image" {
            // An untouched file input still sends an empty part
            if let Some(filename) = filename.filter(|f| !f.is_empty() && !data.is_empty()) {
                form.image = Some(Image {
                    url: data_url(&filename, &data),
                    filename,
                });
            }
        } else {
            let value = String::from_utf8(data).map_err(|_| {
                AppError::ValidationError(format!("field {name} is not valid UTF-8"))
            })?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// Whole megabytes print as `4MB`; anything else rounds up to kilobytes.
fn size_label(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else {
        format!("{}KB", bytes.div_ceil(KB))
    }
}

fn data_url(filename: &str, data: &[u8]) -> String {
    let mime = mime_guess::from_path(filename).first_or_octet_stream();
    format!(
        "data:{};base64,{}",
        mime.essence_str(),
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}

fn malformed(err: MultipartError) -> AppError {
    AppError::ValidationError(format!("malformed form data: {err}"))
}

fn see_other(thread_id: ThreadId) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, format!("/#thread-{thread_id}")))
        .finish()
}

fn submit_failed(data: &AppState, err: AppError) -> HttpResponse {
    let err = ApiError::new(err, "Failed to submit post.");
    let status = actix_web::ResponseError::status_code(&err);
    let message = if status.is_client_error() {
        format!("Failed to submit post: {}", err.public_message())
    } else {
        err.public_message()
    };
    error_page(data, status, &message)
}

fn error_page(data: &AppState, status: StatusCode, message: &str) -> HttpResponse {
    render(
        status,
        &ErrorTemplate {
            message,
            title: &data.settings.title,
        },
    )
}

fn render<T: Template>(status: StatusCode, template: &T) -> HttpResponse {
    match template.render() {
        Ok(html) => HttpResponse::build(status)
            .content_type("text/html; charset=utf-8")
            .body(html),
        Err(err) => {
            log::error!("template rendering failed: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
