//! Input rules shared by the services and the store plugins.

use crate::error::{AppError, Result};
use crate::models::{Image, NewPost, ANONYMOUS};

/// Fails with a validation error when `value` is empty or only whitespace.
pub fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError(format!("{field} is required")));
    }
    Ok(())
}

/// Trims the display name and falls back to [`ANONYMOUS`].
pub fn author_or_anonymous(author: Option<&str>) -> String {
    match author.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => ANONYMOUS.to_string(),
    }
}

/// An image without a url counts as no image at all.
pub fn present_image(image: Option<Image>) -> Option<Image> {
    image.filter(|img| !img.url.trim().is_empty())
}

/// Brings a post into the shape it is stored in, rejecting it if the
/// comment is empty.
pub fn normalize_post(post: NewPost) -> Result<NewPost> {
    require_text("comment", &post.comment)?;
    Ok(NewPost {
        author: Some(author_or_anonymous(post.author.as_deref())),
        comment: post.comment,
        image: present_image(post.image),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_author_becomes_anonymous() {
        assert_eq!(author_or_anonymous(None), "Anonymous");
        assert_eq!(author_or_anonymous(Some("")), "Anonymous");
        assert_eq!(author_or_anonymous(Some("   ")), "Anonymous");
        assert_eq!(author_or_anonymous(Some(" moot ")), "moot");
    }

    #[test]
    fn whitespace_comment_is_rejected() {
        let err = normalize_post(NewPost {
            comment: " \n ".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(msg) if msg == "comment is required"));
    }

    #[test]
    fn image_without_url_is_dropped() {
        let post = normalize_post(NewPost {
            author: None,
            comment: "hi".into(),
            image: Some(Image {
                url: String::new(),
                filename: "a.png".into(),
            }),
        })
        .unwrap();
        assert_eq!(post.image, None);
        assert_eq!(post.author.as_deref(), Some("Anonymous"));
    }
}
