use crate::handlers::{self, AppState};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

/// API routes, without the transport layers added by the server binary.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Catalog
        .route(
            "/api/academic/catalog",
            get(handlers::list_catalog).post(handlers::create_catalog_course),
        )
        .route(
            "/api/academic/catalog/semester/:semester",
            get(handlers::list_catalog_by_semester),
        )
        // Periods
        .route(
            "/api/academic/periods",
            get(handlers::list_periods).post(handlers::create_period),
        )
        .route("/api/academic/periods/active", get(handlers::active_period))
        // Enrollments
        .route("/api/academic/enroll", post(handlers::enroll))
        .route("/api/academic/enrollments", get(handlers::list_enrollments))
        .route(
            "/api/academic/enrollments/:id",
            put(handlers::update_enrollment),
        )
        .route("/api/academic/stats", get(handlers::academic_stats))
        .route("/api/academic/import", post(handlers::import_history))
        // Driving shifts
        .route(
            "/api/shifts",
            get(handlers::list_shifts).post(handlers::create_shift),
        )
}

/// Full application router with state applied; used by the server and tests.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes())
        .with_state(state)
}
