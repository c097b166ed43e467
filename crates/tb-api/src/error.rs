//! Maps `AppError` onto HTTP responses of the shape `{ "error": "..." }`.

use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use tb_core::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// An `AppError` plus the message shown to clients when the server is at fault.
#[derive(Debug)]
pub struct ApiError {
    source: AppError,
    context: &'static str,
}

impl ApiError {
    /// Server-side failures are logged here; their details never reach the client.
    pub fn new(source: AppError, context: &'static str) -> Self {
        if !source.is_client_error() {
            log::error!("{context}: {source}");
        }
        Self { source, context }
    }

    pub fn public_message(&self) -> String {
        match &self.source {
            AppError::ValidationError(msg) => msg.clone(),
            err @ AppError::NotFound(..) => err.to_string(),
            _ => self.context.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.source)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.source {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Retrieval(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.public_message(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::ValidationError("comment is required".into()), 400),
            (AppError::thread_not_found(9), 404),
            (AppError::Store(std::io::Error::other("disk full").into()), 500),
            (AppError::Retrieval("boom".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::new(err, "Failed").status_code().as_u16(), status);
        }
    }

    #[test]
    fn server_errors_hide_details() {
        let err = ApiError::new(
            AppError::Store(std::io::Error::other("/var/db locked").into()),
            "Failed to create reply",
        );
        assert_eq!(err.public_message(), "Failed to create reply");

        let err = ApiError::new(AppError::thread_not_found(9), "Failed to create reply");
        assert_eq!(err.public_message(), "Thread not found with ID 9");
    }
}
