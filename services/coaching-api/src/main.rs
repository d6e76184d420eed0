//! Gong call coaching API: strategies, AEs, prompts and coaching-email logs.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use shared::config::Settings;
use shared::error::AppError;
use shared::utils::ensure_sslmode_disable;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod coaching;
mod error;
#[cfg(test)]
mod memory_store;
mod pg_store;
mod routes;
mod schema;
mod store;
mod validation;

use coaching::CoachingGenerator;
use pg_store::PgStore;
use routes::AppState;

/// Browser access is limited to the configured frontend origin.
fn cors(frontend_url: &str) -> shared::error::Result<CorsLayer> {
    let origin = HeaderValue::from_str(frontend_url.trim_end_matches('/')).map_err(|e| {
        AppError::InvalidOrigin { origin: frontend_url.to_string(), reason: e.to_string() }
    })?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH])
        .allow_headers([header::CONTENT_TYPE]))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::new().map_err(AppError::from)?;
    let db_url = ensure_sslmode_disable(&settings.database_url);
    let pool = PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .connect(&db_url)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    schema::ensure_schema(&pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let state = AppState::new(Arc::new(PgStore::new(pool)), CoachingGenerator::placeholder());
    let app = routes::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors(&settings.frontend_url)?),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    info!(%addr, frontend = %settings.frontend_url, "coaching-api listening");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|e| AppError::Server(e.to_string()))?;
    Ok(())
}
