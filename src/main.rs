mod api;
mod config;
mod db;
mod error;
mod portal;
mod storage;

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, http::HeaderValue};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AppState;
use config::Config;
use error::ServerError;
use storage::{LocalStorage, PUBLIC_PREFIX};

/// Largest accepted request body (photo uploads)
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[tokio::main]
async fn main() -> error::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lostfound_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db = db::init_database(&config.database_url).await?;

    let uploads = LocalStorage::init(config.upload_dir.clone()).await?;
    tracing::info!("Serving uploads from {:?}", uploads.base_path());

    if let Some((roll_number, password)) = &config.bootstrap_admin {
        portal::users::ensure_admin(&db, roll_number, password).await?;
    }

    let state = Arc::new(AppState::new(db, &config, Arc::new(uploads)));

    let origin: HeaderValue = config
        .cors_origin
        .parse()
        .map_err(|_| ServerError::Validation(format!("Invalid CORS_ORIGIN: {}", config.cors_origin)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router()
        .with_state(state)
        .nest_service(PUBLIC_PREFIX, ServeDir::new(&config.upload_dir))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Lost & Found portal starting on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
