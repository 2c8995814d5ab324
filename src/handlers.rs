use crate::config::Config;
use crate::enrollment::{EnrollmentLocks, EnrollmentService};
use crate::errors::AppError;
use crate::import;
use crate::models::*;
use crate::stats;
use crate::storage::RecordStore;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Record store (Postgres, or in-memory in local mode).
    pub store: Arc<dyn RecordStore>,
    /// Application configuration.
    pub config: Config,
    /// Serializes enroll checks per (user, period).
    pub enrollment_locks: Arc<EnrollmentLocks>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: Config) -> Self {
        Self {
            store,
            config,
            enrollment_locks: Arc::new(EnrollmentLocks::new()),
        }
    }

    /// Explicit user id, or the local-mode default when one is configured.
    pub fn resolve_user_id(&self, supplied: Option<i32>) -> Result<i32, AppError> {
        supplied
            .or(self.config.default_user_id)
            .ok_or_else(|| AppError::BadRequest("userId is required".to_string()))
    }

    fn enrollment_service(&self) -> EnrollmentService<'_> {
        EnrollmentService::new(
            self.store.as_ref(),
            &self.enrollment_locks,
            self.config.default_credit_limit,
        )
    }
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "life-dashboard-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

// ============ Catalog ============

/// GET /api/academic/catalog
pub async fn list_catalog(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CatalogCourse>>, AppError> {
    let courses = state.store.list_catalog_courses().await?;
    Ok(Json(courses))
}

/// GET /api/academic/catalog/semester/:semester
pub async fn list_catalog_by_semester(
    State(state): State<Arc<AppState>>,
    Path(semester): Path<i32>,
) -> Result<Json<Vec<CatalogCourse>>, AppError> {
    let courses = state.store.list_catalog_courses_by_semester(semester).await?;
    Ok(Json(courses))
}

/// POST /api/academic/catalog
pub async fn create_catalog_course(
    State(state): State<Arc<AppState>>,
    Json(course): Json<NewCatalogCourse>,
) -> Result<Json<CatalogCourse>, AppError> {
    tracing::info!("POST /academic/catalog - {}", course.code);
    course.validate().map_err(AppError::BadRequest)?;

    let created = state.store.create_catalog_course(course).await?;
    Ok(Json(created))
}

// ============ Periods ============

/// GET /api/academic/periods
///
/// Newest period first.
pub async fn list_periods(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AcademicPeriod>>, AppError> {
    let periods = state.store.list_periods().await?;
    Ok(Json(periods))
}

/// GET /api/academic/periods/active
///
/// Responds with `null` when no period is active.
pub async fn active_period(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Option<AcademicPeriod>>, AppError> {
    let period = state.store.active_period().await?;
    Ok(Json(period))
}

/// POST /api/academic/periods
pub async fn create_period(
    State(state): State<Arc<AppState>>,
    Json(period): Json<NewAcademicPeriod>,
) -> Result<Json<AcademicPeriod>, AppError> {
    tracing::info!(
        "POST /academic/periods - {}-{} (limit {})",
        period.year,
        period.semester,
        period.enrollment_limit
    );
    period.validate().map_err(AppError::BadRequest)?;

    let created = state.store.create_period(period).await?;
    Ok(Json(created))
}

// ============ Enrollments ============

/// POST /api/academic/enroll
///
/// Enrolls the user in a catalog course, subject to the period credit cap.
///
/// # Returns
///
/// * `Result<Json<Enrollment>, AppError>` - The new enrollment, 404 for an
///   unknown course, or 400 with the credit figures when over the cap.
pub async fn enroll(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EnrollRequest>,
) -> Result<Json<Enrollment>, AppError> {
    let user_id = state.resolve_user_id(request.user_id)?;
    tracing::info!(
        "POST /academic/enroll - user {} course {} period {}",
        user_id,
        request.course_code,
        request.academic_period
    );

    let enrollment = state
        .enrollment_service()
        .enroll(user_id, &request.course_code, &request.academic_period)
        .await?;

    Ok(Json(enrollment))
}

/// GET /api/academic/enrollments?userId=&period=
pub async fn list_enrollments(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EnrollmentQueryParams>,
) -> Result<Json<Vec<Enrollment>>, AppError> {
    let user_id = state.resolve_user_id(params.user_id)?;
    let period = params
        .period
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(normalize_period_label);

    let enrollments = state
        .store
        .list_enrollments(user_id, period.as_deref())
        .await?;
    Ok(Json(enrollments))
}

/// PUT /api/academic/enrollments/:id
///
/// Applies a partial update (e.g. closing a course with its final grade).
pub async fn update_enrollment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(mut update): Json<EnrollmentUpdate>,
) -> Result<Json<Enrollment>, AppError> {
    tracing::info!("PUT /academic/enrollments/{} - {:?}", id, update);
    update.validate().map_err(AppError::BadRequest)?;
    update.academic_period = update
        .academic_period
        .as_deref()
        .map(normalize_period_label);

    let enrollment = state
        .store
        .update_enrollment(id, update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Enrollment {} not found", id)))?;

    Ok(Json(enrollment))
}

// ============ Stats & Import ============

/// GET /api/academic/stats?userId=
pub async fn academic_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQueryParams>,
) -> Result<Json<AcademicStats>, AppError> {
    let user_id = state.resolve_user_id(params.user_id)?;
    let stats = stats::academic_stats(state.store.as_ref(), user_id).await?;
    Ok(Json(stats))
}

/// POST /api/academic/import
///
/// Imports historical enrollments in one atomic batch.
///
/// # Returns
///
/// * `Result<Json<serde_json::Value>, AppError>` - `{"imported": n}`, or 400
///   when `records` is not array-shaped or a record is malformed.
pub async fn import_history(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ImportRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = state.resolve_user_id(request.user_id)?;
    let records = import::parse_records(request.records)?;
    tracing::info!(
        "POST /academic/import - user {} with {} record(s)",
        user_id,
        records.len()
    );

    let imported = import::import_history(state.store.as_ref(), user_id, records).await?;
    Ok(Json(json!({ "imported": imported })))
}

// ============ Shifts ============

/// POST /api/shifts
pub async fn create_shift(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ShiftRequest>,
) -> Result<Json<Shift>, AppError> {
    let user_id = state.resolve_user_id(request.user_id)?;

    // Clients send the expense breakdown either pre-serialized or as JSON.
    let expenses = match request.expenses {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    };

    let shift = state
        .store
        .create_shift(NewShift {
            user_id,
            date: request.date,
            hours: request.hours,
            gross_income: request.gross_income,
            km_driven: request.km_driven,
            expenses,
        })
        .await?;

    tracing::info!("Shift {} recorded for user {}", shift.id, user_id);
    Ok(Json(shift))
}

/// GET /api/shifts?userId=
pub async fn list_shifts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQueryParams>,
) -> Result<Json<Vec<Shift>>, AppError> {
    let user_id = state.resolve_user_id(params.user_id)?;
    let shifts = state.store.list_shifts(user_id).await?;
    Ok(Json(shifts))
}
