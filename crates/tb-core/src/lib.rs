//! tinyboard/crates/tb-core/src/lib.rs
//!
//! The central domain logic and interface definitions for tinyboard.

pub mod error;
pub mod models;
pub mod service;
pub mod traits;
pub mod validate;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use service::*;
pub use traits::*;
