use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::middleware;
use axum::{Router, extract::Request, response::Response};
use chrono::Utc;
use http::{HeaderValue, header};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::routes;
use crate::api::state::{AppState, SharedState};
use crate::core::AppConfig;
use crate::llm::client_from_config;
use crate::ui;

/// Upper bound between two sweeps of idle sessions
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically drop idle sessions so a store nobody creates new
/// sessions in still shrinks.
fn spawn_session_sweeper(state: SharedState) {
    let period = state.config.session_ttl.min(MAX_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            state.sessions.evict_idle(Utc::now());
        }
    });
}

async fn set_static_cache_control(request: Request, next: middleware::Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

pub fn app(shared_state: SharedState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        // API routes
        .nest("/api", routes::router())
        // Chat page
        .merge(ui::router())
        // Static assets in ./web-ui/static
        .nest_service(
            "/static",
            ServiceBuilder::new()
                .layer(middleware::from_fn(set_static_cache_control))
                .service(ServeDir::new("./web-ui/static")),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// Run the server. The model client is built before binding so a bad
/// configuration never serves a single session.
pub async fn serve(host: String, port: String, config: AppConfig) -> Result<()> {
    let model = client_from_config(&config)?;
    let app_state = Arc::new(AppState::new(config, model));
    spawn_session_sweeper(Arc::clone(&app_state));
    let app = app(app_state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server started. Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
