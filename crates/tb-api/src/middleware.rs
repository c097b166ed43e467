//! tinyboard/crates/tb-api/src/middleware.rs Middleware
//!
//! Custom middleware for security, logging, and request limits.

use actix_cors::Cors;
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, HttpRequest, HttpResponse};

use crate::error::ErrorBody;

// Returns a standard set of middleware for the tinyboard API.
pub fn standard_middleware() -> Logger {
    // We use the 'default' logger which outputs:
    // remote-ip "request-line" status-code response-size "referrer" "user-agent"
    Logger::default()
}

// Configures CORS (Cross-Origin Resource Sharing)
// Lets a separately hosted client call the JSON API.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST"])
        .allow_any_header()
        .max_age(3600)
}

pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
}

/// JSON extractor settings: bodies carry embedded images, so the limit is
/// raised, and malformed bodies answer with `{ "error": ... }` instead of
/// actix's plain-text default.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(json_error)
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let body = ErrorBody {
        error: format!("invalid request body: {err}"),
    };
    InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}
