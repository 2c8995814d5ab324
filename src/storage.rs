//! Record store abstraction shared by the Postgres and in-memory backends.

use crate::errors::AppError;
use crate::models::*;
use async_trait::async_trait;

/// An enrollment paired with the credits of its catalog course, if the code resolves.
pub type EnrollmentWithCredits = (Enrollment, Option<i32>);

/// Keyed CRUD over catalog courses, periods, enrollments and shifts.
///
/// Listing order is part of the contract:
/// - catalog: semester, then code
/// - catalog by semester: code
/// - periods: year desc, semester desc
/// - enrollments: period desc then code when unfiltered, code when filtered to one period
/// - shifts: date desc
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_catalog_course(
        &self,
        course: NewCatalogCourse,
    ) -> Result<CatalogCourse, AppError>;

    async fn list_catalog_courses(&self) -> Result<Vec<CatalogCourse>, AppError>;

    async fn list_catalog_courses_by_semester(
        &self,
        semester: i32,
    ) -> Result<Vec<CatalogCourse>, AppError>;

    async fn find_catalog_course(&self, code: &str) -> Result<Option<CatalogCourse>, AppError>;

    async fn create_period(&self, period: NewAcademicPeriod) -> Result<AcademicPeriod, AppError>;

    async fn list_periods(&self) -> Result<Vec<AcademicPeriod>, AppError>;

    /// First period flagged active, if any.
    async fn active_period(&self) -> Result<Option<AcademicPeriod>, AppError>;

    /// Period whose `"{year}-{semester}"` label equals `label`.
    async fn find_period_by_label(&self, label: &str) -> Result<Option<AcademicPeriod>, AppError>;

    async fn create_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment, AppError>;

    async fn get_enrollment(&self, id: i32) -> Result<Option<Enrollment>, AppError>;

    async fn list_enrollments(
        &self,
        user_id: i32,
        period: Option<&str>,
    ) -> Result<Vec<Enrollment>, AppError>;

    /// Returns `None` when no enrollment has this id.
    async fn update_enrollment(
        &self,
        id: i32,
        update: EnrollmentUpdate,
    ) -> Result<Option<Enrollment>, AppError>;

    /// Inserts every record or none of them; returns the inserted count.
    async fn insert_enrollments(&self, records: Vec<NewEnrollment>) -> Result<u64, AppError>;

    /// All of a user's enrollments left-joined with catalog credits.
    async fn list_enrollments_with_credits(
        &self,
        user_id: i32,
    ) -> Result<Vec<EnrollmentWithCredits>, AppError>;

    async fn create_shift(&self, shift: NewShift) -> Result<Shift, AppError>;

    async fn list_shifts(&self, user_id: i32) -> Result<Vec<Shift>, AppError>;
}
