//! In-memory record store for local mode and tests.

use crate::errors::AppError;
use crate::models::*;
use crate::storage::{EnrollmentWithCredits, RecordStore};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Reverse;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    courses: Vec<CatalogCourse>,
    periods: Vec<AcademicPeriod>,
    enrollments: Vec<Enrollment>,
    shifts: Vec<Shift>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn enrollment_from(&mut self, record: NewEnrollment) -> Enrollment {
        Enrollment {
            id: self.next_id(),
            user_id: record.user_id,
            course_code: record.course_code,
            academic_period: record.academic_period,
            status: record.status,
            final_grade: record.final_grade,
            evaluations: record.evaluations,
            created_at: Utc::now(),
        }
    }
}

/// Record store kept entirely in process memory. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: RwLock<Tables>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create_catalog_course(
        &self,
        course: NewCatalogCourse,
    ) -> Result<CatalogCourse, AppError> {
        let mut tables = self.tables.write().await;
        if tables.courses.iter().any(|c| c.code == course.code) {
            return Err(AppError::Conflict(format!(
                "Course {} already exists",
                course.code
            )));
        }

        let created = CatalogCourse {
            id: tables.next_id(),
            code: course.code,
            name: course.name,
            credits: course.credits,
            semester: course.semester,
        };
        tables.courses.push(created.clone());
        Ok(created)
    }

    async fn list_catalog_courses(&self) -> Result<Vec<CatalogCourse>, AppError> {
        let mut courses = self.tables.read().await.courses.clone();
        courses.sort_by(|a, b| (a.semester, &a.code).cmp(&(b.semester, &b.code)));
        Ok(courses)
    }

    async fn list_catalog_courses_by_semester(
        &self,
        semester: i32,
    ) -> Result<Vec<CatalogCourse>, AppError> {
        let mut courses: Vec<CatalogCourse> = self
            .tables
            .read()
            .await
            .courses
            .iter()
            .filter(|c| c.semester == semester)
            .cloned()
            .collect();
        courses.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(courses)
    }

    async fn find_catalog_course(&self, code: &str) -> Result<Option<CatalogCourse>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.courses.iter().find(|c| c.code == code).cloned())
    }

    async fn create_period(&self, period: NewAcademicPeriod) -> Result<AcademicPeriod, AppError> {
        let mut tables = self.tables.write().await;
        let created = AcademicPeriod {
            id: tables.next_id(),
            year: period.year,
            semester: period.semester,
            is_active: period.is_active,
            enrollment_limit: period.enrollment_limit,
        };
        tables.periods.push(created.clone());
        Ok(created)
    }

    async fn list_periods(&self) -> Result<Vec<AcademicPeriod>, AppError> {
        let mut periods = self.tables.read().await.periods.clone();
        periods.sort_by_key(|p| Reverse((p.year, p.semester)));
        Ok(periods)
    }

    async fn active_period(&self) -> Result<Option<AcademicPeriod>, AppError> {
        Ok(self
            .list_periods()
            .await?
            .into_iter()
            .find(|p| p.is_active))
    }

    async fn find_period_by_label(&self, label: &str) -> Result<Option<AcademicPeriod>, AppError> {
        let Some((year, semester)) = parse_period_label(label) else {
            return Ok(None);
        };
        let tables = self.tables.read().await;
        Ok(tables
            .periods
            .iter()
            .find(|p| p.year == year && p.semester == semester)
            .cloned())
    }

    async fn create_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment, AppError> {
        let mut tables = self.tables.write().await;
        let created = tables.enrollment_from(enrollment);
        tables.enrollments.push(created.clone());
        Ok(created)
    }

    async fn get_enrollment(&self, id: i32) -> Result<Option<Enrollment>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.enrollments.iter().find(|e| e.id == id).cloned())
    }

    async fn list_enrollments(
        &self,
        user_id: i32,
        period: Option<&str>,
    ) -> Result<Vec<Enrollment>, AppError> {
        let tables = self.tables.read().await;
        let mut enrollments: Vec<Enrollment> = tables
            .enrollments
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter(|e| period.map_or(true, |p| e.academic_period == p))
            .cloned()
            .collect();

        enrollments.sort_by(|a, b| {
            b.academic_period
                .cmp(&a.academic_period)
                .then_with(|| a.course_code.cmp(&b.course_code))
        });
        Ok(enrollments)
    }

    async fn update_enrollment(
        &self,
        id: i32,
        update: EnrollmentUpdate,
    ) -> Result<Option<Enrollment>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(enrollment) = tables.enrollments.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        update.apply_to(enrollment);
        Ok(Some(enrollment.clone()))
    }

    async fn insert_enrollments(&self, records: Vec<NewEnrollment>) -> Result<u64, AppError> {
        // Single write guard: readers see either none or all of the batch.
        let mut tables = self.tables.write().await;
        let count = records.len() as u64;
        for record in records {
            let created = tables.enrollment_from(record);
            tables.enrollments.push(created);
        }
        Ok(count)
    }

    async fn list_enrollments_with_credits(
        &self,
        user_id: i32,
    ) -> Result<Vec<EnrollmentWithCredits>, AppError> {
        let enrollments = self.list_enrollments(user_id, None).await?;
        let tables = self.tables.read().await;
        Ok(enrollments
            .into_iter()
            .map(|e| {
                let credits = tables
                    .courses
                    .iter()
                    .find(|c| c.code == e.course_code)
                    .map(|c| c.credits);
                (e, credits)
            })
            .collect())
    }

    async fn create_shift(&self, shift: NewShift) -> Result<Shift, AppError> {
        let mut tables = self.tables.write().await;
        let created = Shift {
            id: tables.next_id(),
            user_id: shift.user_id,
            date: shift.date.unwrap_or_else(Utc::now),
            hours: shift.hours,
            gross_income: shift.gross_income,
            km_driven: shift.km_driven,
            expenses: shift.expenses,
        };
        tables.shifts.push(created.clone());
        Ok(created)
    }

    async fn list_shifts(&self, user_id: i32) -> Result<Vec<Shift>, AppError> {
        let mut shifts: Vec<Shift> = self
            .tables
            .read()
            .await
            .shifts
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        shifts.sort_by_key(|s| Reverse(s.date));
        Ok(shifts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enrollment(user_id: i32, code: &str, period: &str) -> NewEnrollment {
        NewEnrollment::in_progress(user_id, code, period)
    }

    #[tokio::test]
    async fn enrollments_are_ordered_by_period_then_code() {
        let store = MemoryRecordStore::new();
        store
            .insert_enrollments(vec![
                enrollment(1, "INF112", "2023-1"),
                enrollment(1, "INF211", "2023-2"),
                enrollment(1, "INF111", "2023-1"),
                enrollment(2, "INF111", "2023-1"),
            ])
            .await
            .unwrap();

        let all = store.list_enrollments(1, None).await.unwrap();
        let keys: Vec<(&str, &str)> = all
            .iter()
            .map(|e| (e.academic_period.as_str(), e.course_code.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("2023-2", "INF211"), ("2023-1", "INF111"), ("2023-1", "INF112")]
        );

        let filtered = store.list_enrollments(1, Some("2023-1")).await.unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].course_code, "INF111");
    }

    #[tokio::test]
    async fn duplicate_catalog_code_conflicts() {
        let store = MemoryRecordStore::new();
        let course = NewCatalogCourse {
            code: "INF111".to_string(),
            name: "FUNDAMENTOS DE MATEMÁTICAS".to_string(),
            credits: 8,
            semester: 1,
        };
        store.create_catalog_course(course.clone()).await.unwrap();
        let err = store.create_catalog_course(course).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn periods_newest_first_and_active_lookup() {
        let store = MemoryRecordStore::new();
        for (year, semester, active) in [(2024, 2, false), (2025, 1, true), (2024, 1, false)] {
            store
                .create_period(NewAcademicPeriod {
                    year,
                    semester,
                    is_active: active,
                    enrollment_limit: 32,
                })
                .await
                .unwrap();
        }

        let labels: Vec<String> = store
            .list_periods()
            .await
            .unwrap()
            .iter()
            .map(|p| p.label())
            .collect();
        assert_eq!(labels, vec!["2025-1", "2024-2", "2024-1"]);

        let active = store.active_period().await.unwrap().unwrap();
        assert_eq!(active.label(), "2025-1");
        assert!(store.find_period_by_label("2024-2").await.unwrap().is_some());
        assert!(store.find_period_by_label("2030-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_enrollment_returns_none() {
        let store = MemoryRecordStore::new();
        let updated = store
            .update_enrollment(99, EnrollmentUpdate::default())
            .await
            .unwrap();
        assert!(updated.is_none());
    }
}
