//! # tinyboard Binary
//!
//! The entry point that assembles the store, the services and the web layer.

mod settings;

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tb_api::{configure_routes, middleware, AppState};
use tb_db_sqlite::SqliteStore;

use crate::settings::Settings;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::load().context("failed to load configuration")?;

    // 1. Initialize Database Implementation
    let store = Arc::new(
        SqliteStore::connect(&settings.database_url, settings.max_connections)
            .await
            .context("failed to init SQLite")?,
    );

    // 2. Wrap in AppState (one store serves as both thread and post store)
    let state = web::Data::new(AppState::new(store.clone(), store.clone(), settings.board()));
    let json_limit = settings.json_limit;

    log::info!(
        "tinyboard starting on http://{}:{}",
        settings.host,
        settings.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(middleware::json_config(json_limit))
            .wrap(middleware::cors_policy())
            .wrap(middleware::security_headers())
            .wrap(middleware::standard_middleware())
            .configure(configure_routes)
    })
    .bind((settings.host.as_str(), settings.port))
    .with_context(|| format!("failed to bind {}:{}", settings.host, settings.port))?
    .run()
    .await?;

    // 3. Workers are gone; release the database
    store.close().await;
    Ok(())
}
