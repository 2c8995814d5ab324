use crate::errors::AppError;
use crate::models::{AcademicStats, EnrollmentStatus};
use crate::storage::{EnrollmentWithCredits, RecordStore};

/// Rounds to two decimals, halves away from zero.
pub fn round_gpa(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregates GPA and credit totals over enrollments joined with catalog credits.
///
/// In-progress enrollments and enrollments whose code is missing from the
/// catalog are ignored. Only approved courses feed the GPA; an approved
/// enrollment without a grade counts as grade 0.
pub fn compute_stats(rows: &[EnrollmentWithCredits]) -> AcademicStats {
    let mut grade_points = 0.0;
    let mut stats = AcademicStats::default();

    for (enrollment, credits) in rows {
        let Some(credits) = *credits else {
            continue;
        };

        match enrollment.status {
            EnrollmentStatus::Cursando => continue,
            EnrollmentStatus::Aprobado => {
                grade_points += enrollment.final_grade.unwrap_or(0.0) * f64::from(credits);
                stats.total_credits = stats.total_credits.saturating_add(credits);
                stats.approved_credits = stats.approved_credits.saturating_add(credits);
                stats.courses_approved += 1;
            }
            EnrollmentStatus::Reprobado => {
                stats.failed_credits = stats.failed_credits.saturating_add(credits);
                stats.courses_failed += 1;
            }
        }
    }

    stats.gpa = if stats.total_credits > 0 {
        round_gpa(grade_points / f64::from(stats.total_credits))
    } else {
        0.0
    };

    stats
}

/// Loads a user's enrollments and computes their academic standing.
pub async fn academic_stats(store: &dyn RecordStore, user_id: i32) -> Result<AcademicStats, AppError> {
    let rows = store.list_enrollments_with_credits(user_id).await?;
    let stats = compute_stats(&rows);

    tracing::debug!(
        "Stats for user {}: gpa {} over {} approved credits ({} rows)",
        user_id,
        stats.gpa,
        stats.approved_credits,
        rows.len()
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Enrollment;
    use chrono::Utc;

    fn row(status: EnrollmentStatus, grade: Option<f64>, credits: Option<i32>) -> EnrollmentWithCredits {
        (
            Enrollment {
                id: 0,
                user_id: 1,
                course_code: "INF000".to_string(),
                academic_period: "2024-1".to_string(),
                status,
                final_grade: grade,
                evaluations: None,
                created_at: Utc::now(),
            },
            credits,
        )
    }

    #[test]
    fn weighted_gpa_over_approved_courses() {
        let stats = compute_stats(&[
            row(EnrollmentStatus::Aprobado, Some(6.0), Some(4)),
            row(EnrollmentStatus::Aprobado, Some(4.0), Some(4)),
            row(EnrollmentStatus::Reprobado, Some(2.0), Some(4)),
        ]);

        assert_eq!(
            stats,
            AcademicStats {
                gpa: 5.0,
                total_credits: 8,
                approved_credits: 8,
                failed_credits: 4,
                courses_approved: 2,
                courses_failed: 1,
            }
        );
    }

    #[test]
    fn in_progress_and_dangling_rows_are_ignored() {
        let base = compute_stats(&[row(EnrollmentStatus::Aprobado, Some(5.5), Some(6))]);
        let with_noise = compute_stats(&[
            row(EnrollmentStatus::Aprobado, Some(5.5), Some(6)),
            row(EnrollmentStatus::Cursando, None, Some(8)),
            row(EnrollmentStatus::Aprobado, Some(7.0), None),
            row(EnrollmentStatus::Reprobado, Some(1.0), None),
        ]);
        assert_eq!(base, with_noise);
    }

    #[test]
    fn empty_history_has_zero_gpa() {
        assert_eq!(compute_stats(&[]), AcademicStats::default());
        let only_failed = compute_stats(&[row(EnrollmentStatus::Reprobado, Some(2.0), Some(4))]);
        assert_eq!(only_failed.gpa, 0.0);
        assert_eq!(only_failed.failed_credits, 4);
    }

    #[test]
    fn gpa_rounds_to_two_decimals() {
        // (6.2*8 + 4.5*8 + 6.1*2) / 18 = 5.4555...
        let stats = compute_stats(&[
            row(EnrollmentStatus::Aprobado, Some(6.2), Some(8)),
            row(EnrollmentStatus::Aprobado, Some(4.5), Some(8)),
            row(EnrollmentStatus::Aprobado, Some(6.1), Some(2)),
        ]);
        assert_eq!(stats.gpa, 5.46);
        assert_eq!(round_gpa(4.125), 4.13);
    }

    #[test]
    fn oversized_credits_saturate() {
        let rows = vec![
            row(EnrollmentStatus::Aprobado, Some(5.0), Some(i32::MAX)),
            row(EnrollmentStatus::Aprobado, Some(5.0), Some(8)),
            row(EnrollmentStatus::Reprobado, Some(2.0), Some(i32::MAX)),
            row(EnrollmentStatus::Reprobado, Some(2.0), Some(1)),
        ];
        let stats = compute_stats(&rows);
        assert_eq!(stats.approved_credits, i32::MAX);
        assert_eq!(stats.failed_credits, i32::MAX);
        assert_eq!(stats.gpa, 5.0);
    }
}
