/// Enrollment gate: validates a new enrollment against the period credit cap
///
/// The check reads the catalog and the user's enrollments in the period, then
/// writes the new row. That read-check-write sequence runs under a lock keyed
/// on (user, period) so two concurrent requests cannot both pass the check.
use crate::errors::AppError;
use crate::models::{
    normalize_period_label, CatalogCourse, Enrollment, EnrollmentStatus, NewEnrollment,
};
use crate::storage::RecordStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockKey = (i32, String);

/// Per-(user, period) async locks serializing enroll checks.
#[derive(Debug, Default)]
pub struct EnrollmentLocks {
    locks: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

impl EnrollmentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `(user_id, period)`.
    pub async fn acquire(&self, user_id: i32, period: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // Drop entries nobody holds or waits on.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry((user_id, period.to_string()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of keys currently held or awaited.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Credits a user already carries in a period.
///
/// Failed enrollments no longer occupy the cap; codes missing from the
/// catalog count as zero. Saturates at `i32::MAX`.
pub fn credits_in_period(enrollments: &[Enrollment], credits_by_code: &HashMap<&str, i32>) -> i32 {
    enrollments
        .iter()
        .filter(|e| e.status != EnrollmentStatus::Reprobado)
        .map(|e| {
            credits_by_code
                .get(e.course_code.as_str())
                .copied()
                .unwrap_or(0)
        })
        .fold(0i32, i32::saturating_add)
}

/// Rejects `attempted_credits` when it would push `current_credits` past `limit`.
pub fn check_credit_limit(
    current_credits: i32,
    attempted_credits: i32,
    limit: i32,
) -> Result<(), AppError> {
    // Widened so oversized credit values cannot wrap below the limit.
    if i64::from(current_credits) + i64::from(attempted_credits) > i64::from(limit) {
        return Err(AppError::LimitExceeded {
            current_credits,
            attempted_credits,
            limit,
        });
    }
    Ok(())
}

/// Enrolls users into catalog courses under the period credit cap.
pub struct EnrollmentService<'a> {
    store: &'a dyn RecordStore,
    locks: &'a EnrollmentLocks,
    default_limit: i32,
}

impl<'a> EnrollmentService<'a> {
    pub fn new(store: &'a dyn RecordStore, locks: &'a EnrollmentLocks, default_limit: i32) -> Self {
        Self {
            store,
            locks,
            default_limit,
        }
    }

    /// Cap for `period`: the matching period record's limit, else the default.
    pub async fn limit_for(&self, period: &str) -> Result<i32, AppError> {
        let limit = self
            .store
            .find_period_by_label(period)
            .await?
            .map(|p| p.enrollment_limit)
            .unwrap_or(self.default_limit);
        Ok(limit)
    }

    /// Enrolls `user_id` in `course_code` for `period` with status `cursando`.
    ///
    /// # Errors
    ///
    /// * `BadRequest` - empty course code or period label.
    /// * `NotFound` - the course code is not in the catalog.
    /// * `LimitExceeded` - the period would exceed its credit cap.
    pub async fn enroll(
        &self,
        user_id: i32,
        course_code: &str,
        period: &str,
    ) -> Result<Enrollment, AppError> {
        let course_code = course_code.trim();
        // "2025-02" and "2025-2" must share one lock, one credit count and one cap.
        let period = normalize_period_label(period);
        let period = period.as_str();
        if course_code.is_empty() {
            return Err(AppError::BadRequest("courseCode is required".to_string()));
        }
        if period.is_empty() {
            return Err(AppError::BadRequest(
                "academicPeriod is required".to_string(),
            ));
        }

        let course = self
            .store
            .find_catalog_course(course_code)
            .await?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

        let _guard = self.locks.acquire(user_id, period).await;

        let limit = self.limit_for(period).await?;
        let current_credits = self.current_credits(user_id, period).await?;
        check_credit_limit(current_credits, course.credits, limit)?;

        let enrollment = self
            .store
            .create_enrollment(NewEnrollment::in_progress(user_id, &course.code, period))
            .await?;

        tracing::info!(
            "User {} enrolled in {} for {} ({} + {} / {} credits)",
            user_id,
            course.code,
            period,
            current_credits,
            course.credits,
            limit
        );

        Ok(enrollment)
    }

    /// Credits already carried by `user_id` in `period`.
    pub async fn current_credits(&self, user_id: i32, period: &str) -> Result<i32, AppError> {
        let catalog: Vec<CatalogCourse> = self.store.list_catalog_courses().await?;
        let credits_by_code: HashMap<&str, i32> = catalog
            .iter()
            .map(|c| (c.code.as_str(), c.credits))
            .collect();

        let existing = self.store.list_enrollments(user_id, Some(period)).await?;
        Ok(credits_in_period(&existing, &credits_by_code))
    }
}
