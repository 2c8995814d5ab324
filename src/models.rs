use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Lowest grade that passes a course on the 1.0–7.0 scale.
pub const PASSING_GRADE: f64 = 4.0;
/// Bounds of the grading scale.
pub const MIN_GRADE: f64 = 1.0;
pub const MAX_GRADE: f64 = 7.0;
/// Upper bound on the credits of a single catalog course.
pub const MAX_COURSE_CREDITS: i32 = 60;

// ============ Academic Catalog ============

/// A curriculum course definition.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCourse {
    pub id: i32,
    /// Unique course code, e.g. "INF111".
    pub code: String,
    pub name: String,
    /// Credit weight, always positive.
    pub credits: i32,
    /// Nominal curriculum semester (1..N).
    pub semester: i32,
}

/// Fields accepted when creating a catalog course.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCatalogCourse {
    pub code: String,
    pub name: String,
    pub credits: i32,
    pub semester: i32,
}

impl NewCatalogCourse {
    pub fn validate(&self) -> Result<(), String> {
        if self.code.trim().is_empty() {
            return Err("code is required".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        if !(1..=MAX_COURSE_CREDITS).contains(&self.credits) {
            return Err(format!(
                "credits must be between 1 and {}",
                MAX_COURSE_CREDITS
            ));
        }
        if self.semester < 1 {
            return Err("semester must be at least 1".to_string());
        }
        Ok(())
    }
}

// ============ Academic Periods ============

/// A term with its own enrollment credit cap.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicPeriod {
    pub id: i32,
    pub year: i32,
    /// 1 or 2.
    pub semester: i32,
    pub is_active: bool,
    pub enrollment_limit: i32,
}

impl AcademicPeriod {
    /// Label used by enrollments to reference this period, e.g. "2025-2".
    pub fn label(&self) -> String {
        format!("{}-{}", self.year, self.semester)
    }
}

/// Splits a period label like "2025-2" into `(year, semester)`.
///
/// Returns `None` for labels that don't follow that shape; such labels are
/// still valid on enrollments but never match a period record.
pub fn parse_period_label(label: &str) -> Option<(i32, i32)> {
    let (year, semester) = label.trim().split_once('-')?;
    let year: i32 = year.trim().parse().ok()?;
    let semester: i32 = semester.trim().parse().ok()?;
    Some((year, semester))
}

/// Canonical form of a period label: "2025-02" becomes "2025-2".
///
/// Labels that don't parse are only trimmed.
pub fn normalize_period_label(label: &str) -> String {
    match parse_period_label(label) {
        Some((year, semester)) => format!("{}-{}", year, semester),
        None => label.trim().to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAcademicPeriod {
    pub year: i32,
    pub semester: i32,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default = "default_enrollment_limit")]
    pub enrollment_limit: i32,
}

fn default_enrollment_limit() -> i32 {
    crate::config::DEFAULT_CREDIT_LIMIT
}

impl NewAcademicPeriod {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=2).contains(&self.semester) {
            return Err("semester must be 1 or 2".to_string());
        }
        if self.enrollment_limit <= 0 {
            return Err("enrollmentLimit must be greater than zero".to_string());
        }
        Ok(())
    }
}

// ============ Enrollments ============

/// Lifecycle status of an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    /// In progress.
    Cursando,
    /// Passed.
    Aprobado,
    /// Failed.
    Reprobado,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Cursando => "cursando",
            EnrollmentStatus::Aprobado => "aprobado",
            EnrollmentStatus::Reprobado => "reprobado",
        }
    }

    /// Status of a concluded course with the given final grade.
    pub fn from_grade(grade: f64) -> Self {
        if grade >= PASSING_GRADE {
            EnrollmentStatus::Aprobado
        } else {
            EnrollmentStatus::Reprobado
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cursando" => Ok(EnrollmentStatus::Cursando),
            "aprobado" => Ok(EnrollmentStatus::Aprobado),
            "reprobado" => Ok(EnrollmentStatus::Reprobado),
            other => Err(format!("unknown enrollment status '{}'", other)),
        }
    }
}

/// A user's registration in one course for one academic period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: i32,
    pub user_id: i32,
    /// References `CatalogCourse::code`; dangling codes are tolerated.
    pub course_code: String,
    /// Free-form period label, e.g. "2025-2".
    pub academic_period: String,
    pub status: EnrollmentStatus,
    pub final_grade: Option<f64>,
    /// Opaque blob owned by the UI.
    pub evaluations: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// Row shape for inserting an enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEnrollment {
    pub user_id: i32,
    pub course_code: String,
    pub academic_period: String,
    pub status: EnrollmentStatus,
    pub final_grade: Option<f64>,
    pub evaluations: Option<Value>,
}

impl NewEnrollment {
    /// A fresh enrollment created by the enroll operation.
    pub fn in_progress(user_id: i32, course_code: &str, academic_period: &str) -> Self {
        Self {
            user_id,
            course_code: course_code.to_string(),
            academic_period: academic_period.to_string(),
            status: EnrollmentStatus::Cursando,
            final_grade: None,
            evaluations: None,
        }
    }
}

/// Partial update of an enrollment; absent fields are left untouched.
///
/// `final_grade` and `evaluations` distinguish "absent" (`None`) from an
/// explicit JSON `null` (`Some(None)`), which clears the column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentUpdate {
    #[serde(default)]
    pub course_code: Option<String>,
    #[serde(default)]
    pub academic_period: Option<String>,
    #[serde(default)]
    pub status: Option<EnrollmentStatus>,
    #[serde(default, deserialize_with = "nullable_field")]
    pub final_grade: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable_field")]
    pub evaluations: Option<Option<Value>>,
}

impl EnrollmentUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if matches!(self.course_code, Some(ref code) if code.trim().is_empty()) {
            return Err("courseCode cannot be empty".to_string());
        }
        if matches!(self.academic_period, Some(ref period) if period.trim().is_empty()) {
            return Err("academicPeriod cannot be empty".to_string());
        }
        if let Some(Some(grade)) = self.final_grade {
            if !(MIN_GRADE..=MAX_GRADE).contains(&grade) {
                return Err(format!(
                    "finalGrade {} is outside {}-{}",
                    grade, MIN_GRADE, MAX_GRADE
                ));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.course_code.is_none()
            && self.academic_period.is_none()
            && self.status.is_none()
            && self.final_grade.is_none()
            && self.evaluations.is_none()
    }

    /// Applies the present fields onto `enrollment`.
    pub fn apply_to(&self, enrollment: &mut Enrollment) {
        if let Some(ref code) = self.course_code {
            enrollment.course_code = code.clone();
        }
        if let Some(ref period) = self.academic_period {
            enrollment.academic_period = period.clone();
        }
        if let Some(status) = self.status {
            enrollment.status = status;
        }
        if let Some(grade) = self.final_grade {
            enrollment.final_grade = grade;
        }
        if let Some(ref evaluations) = self.evaluations {
            enrollment.evaluations = evaluations.clone();
        }
    }
}

/// Maps a present JSON value (including `null`) to `Some(..)`.
fn nullable_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Cumulative academic standing of a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicStats {
    pub gpa: f64,
    pub total_credits: i32,
    pub approved_credits: i32,
    pub failed_credits: i32,
    pub courses_approved: i32,
    pub courses_failed: i32,
}

// ============ Shifts ============

/// One driving shift with its income and costs.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: i32,
    pub user_id: i32,
    pub date: DateTime<Utc>,
    pub hours: f64,
    pub gross_income: i32,
    pub km_driven: f64,
    /// Serialized expense breakdown, opaque to the server.
    pub expenses: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShift {
    pub user_id: i32,
    pub date: Option<DateTime<Utc>>,
    pub hours: f64,
    pub gross_income: i32,
    pub km_driven: f64,
    pub expenses: String,
}

// ============ Request Parameters ============

/// Body of `POST /api/academic/enroll`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    pub user_id: Option<i32>,
    pub course_code: String,
    pub academic_period: String,
}

/// Query of `GET /api/academic/enrollments`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentQueryParams {
    pub user_id: Option<i32>,
    pub period: Option<String>,
}

/// Query carrying only an optional user id.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQueryParams {
    pub user_id: Option<i32>,
}

/// Body of `POST /api/academic/import`.
///
/// `records` stays untyped here so that a non-array payload can be reported
/// as invalid input instead of a generic extractor rejection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub user_id: Option<i32>,
    #[serde(default)]
    pub records: Value,
}

/// Body of `POST /api/shifts`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftRequest {
    pub user_id: Option<i32>,
    pub date: Option<DateTime<Utc>>,
    pub hours: f64,
    pub gross_income: i32,
    pub km_driven: f64,
    #[serde(default)]
    pub expenses: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_uses_spanish_wire_names() {
        assert_eq!(
            serde_json::to_value(EnrollmentStatus::Reprobado).unwrap(),
            json!("reprobado")
        );
        assert_eq!(
            "aprobado".parse::<EnrollmentStatus>().unwrap(),
            EnrollmentStatus::Aprobado
        );
        assert!("withdrawn".parse::<EnrollmentStatus>().is_err());
    }

    #[test]
    fn status_from_grade_uses_passing_threshold() {
        assert_eq!(EnrollmentStatus::from_grade(4.0), EnrollmentStatus::Aprobado);
        assert_eq!(EnrollmentStatus::from_grade(3.9), EnrollmentStatus::Reprobado);
    }

    #[test]
    fn period_label_round_trip() {
        let period = AcademicPeriod {
            id: 1,
            year: 2025,
            semester: 2,
            is_active: true,
            enrollment_limit: 30,
        };
        assert_eq!(period.label(), "2025-2");
        assert_eq!(parse_period_label("2025-2"), Some((2025, 2)));
        assert_eq!(parse_period_label("verano"), None);
        assert_eq!(parse_period_label("2025-x"), None);
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let update: EnrollmentUpdate =
            serde_json::from_value(json!({"status": "aprobado", "finalGrade": null})).unwrap();
        assert_eq!(update.status, Some(EnrollmentStatus::Aprobado));
        assert_eq!(update.final_grade, Some(None));
        assert_eq!(update.evaluations, None);

        let update: EnrollmentUpdate = serde_json::from_value(json!({"finalGrade": 5.5})).unwrap();
        assert_eq!(update.final_grade, Some(Some(5.5)));
        assert!(!update.is_empty());

        let update: EnrollmentUpdate = serde_json::from_value(json!({})).unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn new_period_defaults_limit() {
        let period: NewAcademicPeriod =
            serde_json::from_value(json!({"year": 2025, "semester": 1})).unwrap();
        assert_eq!(period.enrollment_limit, 32);
        assert!(!period.is_active);
        assert!(period.validate().is_ok());
    }

    #[test]
    fn period_labels_normalize() {
        assert_eq!(normalize_period_label("2025-02"), "2025-2");
        assert_eq!(normalize_period_label(" 2025-2 "), "2025-2");
        assert_eq!(normalize_period_label("verano"), "verano");
        assert_eq!(parse_period_label("2025-02"), Some((2025, 2)));
    }

    #[test]
    fn catalog_credits_are_bounded() {
        let mut course = NewCatalogCourse {
            code: "INF111".to_string(),
            name: "Course".to_string(),
            credits: MAX_COURSE_CREDITS,
            semester: 1,
        };
        assert!(course.validate().is_ok());
        course.credits = i32::MAX;
        assert!(course.validate().is_err());
        course.credits = 0;
        assert!(course.validate().is_err());
    }

    #[test]
    fn update_rejects_grades_off_scale() {
        let update: EnrollmentUpdate = serde_json::from_value(json!({"finalGrade": 9.5})).unwrap();
        assert!(update.validate().is_err());
        let update: EnrollmentUpdate = serde_json::from_value(json!({"finalGrade": -3})).unwrap();
        assert!(update.validate().is_err());
        let update: EnrollmentUpdate = serde_json::from_value(json!({"finalGrade": null})).unwrap();
        assert!(update.validate().is_ok());
        let update: EnrollmentUpdate =
            serde_json::from_value(json!({"status": "aprobado", "finalGrade": 7.0})).unwrap();
        assert!(update.validate().is_ok());
    }
}
