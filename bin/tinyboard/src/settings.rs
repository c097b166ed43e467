//! Runtime configuration.
//!
//! Sources, later ones winning: built-in defaults, an optional `tinyboard`
//! config file (`tinyboard.toml`, `.yaml`, ...) in the working directory, and
//! `TINYBOARD_*` environment variables (e.g. `TINYBOARD_PORT=8080`).

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use tb_api::BoardSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// Largest accepted JSON body in bytes
    pub json_limit: usize,
    /// Largest accepted form upload in bytes
    pub max_upload: usize,
    pub reply_preview: usize,
    pub title: String,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        builder()?
            .add_source(File::with_name("tinyboard").required(false))
            .add_source(Environment::with_prefix("TINYBOARD").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn board(&self) -> BoardSettings {
        BoardSettings {
            title: self.title.clone(),
            reply_preview: self.reply_preview,
            max_upload_bytes: self.max_upload,
        }
    }
}

fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("host", "127.0.0.1")?
        .set_default("port", 3001_i64)?
        .set_default("database_url", "sqlite:tinyboard.db")?
        .set_default("max_connections", 5_i64)?
        .set_default("json_limit", 10 * 1024 * 1024_i64)?
        .set_default("max_upload", 4 * 1024 * 1024_i64)?
        .set_default("reply_preview", 3_i64)?
        .set_default("title", "tinyboard")
}
