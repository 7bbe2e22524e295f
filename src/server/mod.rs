//! HTTP server module for the REST API.
//!
//! Exposes CRUD endpoints for every entity plus the statistics report.

pub mod error;
pub mod routes;
pub mod state;

use crate::database::Database;
use crate::server::routes::{
    assignments, config, day_notes, days_off, health, stats, tasks, tracking,
};
use crate::server::state::AppState;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Default server port.
pub const DEFAULT_PORT: u16 = 13234;

/// Builds the application router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    // CORS layer for frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Task definitions
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/api/tasks/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        // Assignments
        .route(
            "/api/assignments",
            get(assignments::list_assignments).post(assignments::create_assignment),
        )
        .route("/api/assignments/expanded", get(assignments::list_expanded))
        .route(
            "/api/assignments/materialize",
            post(assignments::materialize_assignment),
        )
        .route(
            "/api/assignments/complete-days",
            post(assignments::complete_days),
        )
        .route(
            "/api/assignments/:id",
            get(assignments::get_assignment)
                .put(assignments::update_assignment)
                .delete(assignments::delete_assignment),
        )
        // Rest days and notes
        .route(
            "/api/days-off",
            get(days_off::list_days_off).post(days_off::mark_day_off),
        )
        .route("/api/days-off/:date", delete(days_off::unmark_day_off))
        .route(
            "/api/day-notes",
            get(day_notes::list_notes).post(day_notes::upsert_note),
        )
        .route("/api/day-notes/:date", delete(day_notes::delete_note))
        // Tracking history
        .route(
            "/api/tracking",
            get(tracking::list_tracking).post(tracking::create_tracking),
        )
        .route("/api/tracking/:id", put(tracking::update_tracking))
        .route("/api/tracking/stats/:task_id", get(tracking::tracking_stats))
        // Stats API
        .route("/api/stats", get(stats::get_stats))
        // Config API
        .route("/api/config", get(config::get_config))
        .route("/api/config/:key", put(config::update_config))
        .layer(cors)
        .with_state(state)
}

/// Serves the API on `addr` until Ctrl+C is received.
pub async fn serve(addr: SocketAddr, db: Database) -> std::io::Result<()> {
    let app = router(Arc::new(AppState::new(db)));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(?e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
