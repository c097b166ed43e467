//! # tb-ui
//!
//! Server-rendered board pages. Handlers hand over `ThreadView`s; this crate
//! shapes them for display (reply cap, comment markup) and renders them with
//! Askama.

use askama::Template;
use tb_core::models::{Image, Post, PostId, ThreadId, ThreadView};

/// A post ready for display.
#[derive(Debug, Clone)]
pub struct PostDisplay {
    pub id: PostId,
    pub author: String,
    pub posted_at: String,
    /// Escaped comment with greentext and quote links applied
    pub comment_html: String,
    pub image: Option<Image>,
    /// `image.url` when it is safe to load, see [`safe_image_url`]
    pub image_src: Option<String>,
    pub is_op: bool,
}

impl PostDisplay {
    fn new(post: &Post, is_op: bool) -> Self {
        Self {
            id: post.id,
            author: post.author.clone(),
            posted_at: post.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            comment_html: render_comment(&post.comment),
            image: post.image.clone(),
            image_src: post
                .image
                .as_ref()
                .and_then(|image| safe_image_url(&image.url))
                .map(str::to_string),
            is_op,
        }
    }
}

/// A thread as shown on a page: the OP followed by the visible replies.
#[derive(Debug, Clone)]
pub struct ThreadPreview {
    pub id: ThreadId,
    pub subject: String,
    /// OP first, then the newest `reply_cap` replies in ascending order
    pub posts: Vec<PostDisplay>,
    /// Replies hidden by the cap
    pub omitted: usize,
}

impl ThreadPreview {
    /// Keeps only the newest `reply_cap` replies; `None` keeps all of them.
    pub fn new(view: &ThreadView, reply_cap: Option<usize>) -> Self {
        let shown = reply_cap.map_or(view.replies.len(), |cap| cap.min(view.replies.len()));
        let omitted = view.replies.len() - shown;

        let posts = std::iter::once(PostDisplay::new(&view.original_post, true))
            .chain(
                view.replies[omitted..]
                    .iter()
                    .map(|reply| PostDisplay::new(reply, false)),
            )
            .collect();

        Self {
            id: view.id,
            subject: view.subject.clone(),
            posts,
            omitted,
        }
    }

    pub fn omitted_label(&self) -> String {
        let noun = if self.omitted == 1 { "reply" } else { "replies" };
        format!("{} more {} omitted.", self.omitted, noun)
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub threads: &'a [ThreadPreview],
    pub title: &'a str,
}

#[derive(Template)]
#[template(path = "thread.html")]
pub struct ThreadTemplate<'a> {
    pub thread: &'a ThreadPreview,
    pub title: &'a str,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub message: &'a str,
    pub title: &'a str,
}

/// Image urls are opaque to the core, so anything may be stored. Only inline
/// images and plain web urls are ever placed in markup.
pub fn safe_image_url(url: &str) -> Option<&str> {
    const ALLOWED: [&str; 3] = ["data:image/", "https://", "http://"];

    let trimmed = url.trim();
    ALLOWED
        .iter()
        .any(|prefix| {
            trimmed
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
        .then_some(trimmed)
}

/// Basic sanitization and "Greentext" transformation.
///
/// Every line is HTML-escaped. `>>123` becomes a link to post 123, any other
/// line starting with `>` is greentext.
pub fn render_comment(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            let escaped = html_escape::encode_safe(line);
            match line.strip_prefix(">>").map(str::trim) {
                Some(target) if !target.is_empty() && target.bytes().all(|b| b.is_ascii_digit()) => {
                    format!("<a class=\"quotelink\" href=\"#post-{target}\">{escaped}</a>")
                }
                _ if line.starts_with('>') => format!("<span class=\"greentext\">{escaped}</span>"),
                _ => escaped.into_owned(),
            }
        })
        .collect::<Vec<_>>()
        .join("<br />")
}
