use crate::errors::{AppError, ResultExt};
use crate::models::*;
use crate::storage::{EnrollmentWithCredits, RecordStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

const ENROLLMENT_COLUMNS: &str =
    "id, user_id, course_code, academic_period, status, final_grade, evaluations, created_at";

/// Enrollment as stored; `status` is a TEXT column.
#[derive(Debug, sqlx::FromRow)]
struct EnrollmentRow {
    id: i32,
    user_id: i32,
    course_code: String,
    academic_period: String,
    status: String,
    final_grade: Option<f64>,
    evaluations: Option<Value>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EnrollmentRow> for Enrollment {
    type Error = AppError;

    fn try_from(row: EnrollmentRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<EnrollmentStatus>().map_err(|e| {
            AppError::InternalError(format!("enrollment {} has {}", row.id, e))
        })?;
        Ok(Enrollment {
            id: row.id,
            user_id: row.user_id,
            course_code: row.course_code,
            academic_period: row.academic_period,
            status,
            final_grade: row.final_grade,
            evaluations: row.evaluations,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EnrollmentCreditsRow {
    #[sqlx(flatten)]
    enrollment: EnrollmentRow,
    credits: Option<i32>,
}

fn into_enrollments(rows: Vec<EnrollmentRow>) -> Result<Vec<Enrollment>, AppError> {
    rows.into_iter().map(Enrollment::try_from).collect()
}

/// Postgres-backed record store.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn create_catalog_course(
        &self,
        course: NewCatalogCourse,
    ) -> Result<CatalogCourse, AppError> {
        let created = sqlx::query_as::<_, CatalogCourse>(
            r#"
            INSERT INTO academic_courses (code, name, credits, semester)
            VALUES ($1, $2, $3, $4)
            RETURNING id, code, name, credits, semester
            "#,
        )
        .bind(&course.code)
        .bind(&course.name)
        .bind(course.credits)
        .bind(course.semester)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list_catalog_courses(&self) -> Result<Vec<CatalogCourse>, AppError> {
        let courses = sqlx::query_as::<_, CatalogCourse>(
            "SELECT id, code, name, credits, semester FROM academic_courses ORDER BY semester, code",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(courses)
    }

    async fn list_catalog_courses_by_semester(
        &self,
        semester: i32,
    ) -> Result<Vec<CatalogCourse>, AppError> {
        let courses = sqlx::query_as::<_, CatalogCourse>(
            "SELECT id, code, name, credits, semester FROM academic_courses WHERE semester = $1 ORDER BY code",
        )
        .bind(semester)
        .fetch_all(&self.pool)
        .await?;

        Ok(courses)
    }

    async fn find_catalog_course(&self, code: &str) -> Result<Option<CatalogCourse>, AppError> {
        let course = sqlx::query_as::<_, CatalogCourse>(
            "SELECT id, code, name, credits, semester FROM academic_courses WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(course)
    }

    async fn create_period(&self, period: NewAcademicPeriod) -> Result<AcademicPeriod, AppError> {
        let created = sqlx::query_as::<_, AcademicPeriod>(
            r#"
            INSERT INTO academic_periods (year, semester, is_active, enrollment_limit)
            VALUES ($1, $2, $3, $4)
            RETURNING id, year, semester, is_active, enrollment_limit
            "#,
        )
        .bind(period.year)
        .bind(period.semester)
        .bind(period.is_active)
        .bind(period.enrollment_limit)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list_periods(&self) -> Result<Vec<AcademicPeriod>, AppError> {
        let periods = sqlx::query_as::<_, AcademicPeriod>(
            r#"
            SELECT id, year, semester, is_active, enrollment_limit
            FROM academic_periods
            ORDER BY year DESC, semester DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(periods)
    }

    async fn active_period(&self) -> Result<Option<AcademicPeriod>, AppError> {
        let period = sqlx::query_as::<_, AcademicPeriod>(
            r#"
            SELECT id, year, semester, is_active, enrollment_limit
            FROM academic_periods
            WHERE is_active = true
            ORDER BY year DESC, semester DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(period)
    }

    async fn find_period_by_label(&self, label: &str) -> Result<Option<AcademicPeriod>, AppError> {
        let Some((year, semester)) = parse_period_label(label) else {
            return Ok(None);
        };

        let period = sqlx::query_as::<_, AcademicPeriod>(
            r#"
            SELECT id, year, semester, is_active, enrollment_limit
            FROM academic_periods
            WHERE year = $1 AND semester = $2
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(year)
        .bind(semester)
        .fetch_optional(&self.pool)
        .await?;

        Ok(period)
    }

    async fn create_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment, AppError> {
        let row = sqlx::query_as::<_, EnrollmentRow>(&format!(
            r#"
            INSERT INTO enrollments (user_id, course_code, academic_period, status, final_grade, evaluations)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ENROLLMENT_COLUMNS
        ))
        .bind(enrollment.user_id)
        .bind(&enrollment.course_code)
        .bind(&enrollment.academic_period)
        .bind(enrollment.status.as_str())
        .bind(enrollment.final_grade)
        .bind(&enrollment.evaluations)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get_enrollment(&self, id: i32) -> Result<Option<Enrollment>, AppError> {
        let row = sqlx::query_as::<_, EnrollmentRow>(&format!(
            "SELECT {} FROM enrollments WHERE id = $1",
            ENROLLMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Enrollment::try_from).transpose()
    }

    async fn list_enrollments(
        &self,
        user_id: i32,
        period: Option<&str>,
    ) -> Result<Vec<Enrollment>, AppError> {
        let rows = match period {
            Some(period) => {
                sqlx::query_as::<_, EnrollmentRow>(&format!(
                    r#"
                    SELECT {} FROM enrollments
                    WHERE user_id = $1 AND academic_period = $2
                    ORDER BY course_code
                    "#,
                    ENROLLMENT_COLUMNS
                ))
                .bind(user_id)
                .bind(period)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, EnrollmentRow>(&format!(
                    r#"
                    SELECT {} FROM enrollments
                    WHERE user_id = $1
                    ORDER BY academic_period DESC, course_code
                    "#,
                    ENROLLMENT_COLUMNS
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        into_enrollments(rows)
    }

    async fn update_enrollment(
        &self,
        id: i32,
        update: EnrollmentUpdate,
    ) -> Result<Option<Enrollment>, AppError> {
        if update.is_empty() {
            return self.get_enrollment(id).await;
        }

        // Nullable columns take a "present" flag so an explicit null can clear them.
        let row = sqlx::query_as::<_, EnrollmentRow>(&format!(
            r#"
            UPDATE enrollments
            SET course_code = COALESCE($2, course_code),
                academic_period = COALESCE($3, academic_period),
                status = COALESCE($4, status),
                final_grade = CASE WHEN $5 THEN $6 ELSE final_grade END,
                evaluations = CASE WHEN $7 THEN $8 ELSE evaluations END
            WHERE id = $1
            RETURNING {}
            "#,
            ENROLLMENT_COLUMNS
        ))
        .bind(id)
        .bind(update.course_code.as_deref())
        .bind(update.academic_period.as_deref())
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.final_grade.is_some())
        .bind(update.final_grade.flatten())
        .bind(update.evaluations.is_some())
        .bind(update.evaluations.clone().flatten())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("updating enrollment {}", id))?;

        row.map(Enrollment::try_from).transpose()
    }

    async fn insert_enrollments(&self, records: Vec<NewEnrollment>) -> Result<u64, AppError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for record in &records {
            let result = sqlx::query(
                r#"
                INSERT INTO enrollments (user_id, course_code, academic_period, status, final_grade, evaluations)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(record.user_id)
            .bind(&record.course_code)
            .bind(&record.academic_period)
            .bind(record.status.as_str())
            .bind(record.final_grade)
            .bind(&record.evaluations)
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!(
                    "importing {} {} (record {})",
                    record.course_code,
                    record.academic_period,
                    inserted + 1
                )
            })?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn list_enrollments_with_credits(
        &self,
        user_id: i32,
    ) -> Result<Vec<EnrollmentWithCredits>, AppError> {
        let rows = sqlx::query_as::<_, EnrollmentCreditsRow>(
            r#"
            SELECT e.id, e.user_id, e.course_code, e.academic_period, e.status,
                   e.final_grade, e.evaluations, e.created_at, c.credits
            FROM enrollments e
            LEFT JOIN academic_courses c ON c.code = e.course_code
            WHERE e.user_id = $1
            ORDER BY e.academic_period DESC, e.course_code
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Ok((Enrollment::try_from(row.enrollment)?, row.credits)))
            .collect()
    }

    async fn create_shift(&self, shift: NewShift) -> Result<Shift, AppError> {
        let created = sqlx::query_as::<_, Shift>(
            r#"
            INSERT INTO shifts (user_id, date, hours, gross_income, km_driven, expenses)
            VALUES ($1, COALESCE($2, now()), $3, $4, $5, $6)
            RETURNING id, user_id, date, hours, gross_income, km_driven, expenses
            "#,
        )
        .bind(shift.user_id)
        .bind(shift.date)
        .bind(shift.hours)
        .bind(shift.gross_income)
        .bind(shift.km_driven)
        .bind(&shift.expenses)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list_shifts(&self, user_id: i32) -> Result<Vec<Shift>, AppError> {
        let shifts = sqlx::query_as::<_, Shift>(
            r#"
            SELECT id, user_id, date, hours, gross_income, km_driven, expenses
            FROM shifts
            WHERE user_id = $1
            ORDER BY date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(shifts)
    }
}
