/// Bulk import of historical enrollments
///
/// A payload is an array of records or a single record object. Every record
/// is validated before anything is written; one bad record rejects the batch,
/// and the batch insert is atomic. Records are never deduplicated against
/// existing enrollments.
use crate::errors::AppError;
use crate::models::{
    normalize_period_label, EnrollmentStatus, NewEnrollment, MAX_GRADE, MIN_GRADE,
};
use crate::storage::RecordStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One historical enrollment as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    pub course_code: String,
    pub academic_period: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EnrollmentStatus>,
    #[serde(default)]
    pub final_grade: Option<f64>,
    #[serde(default)]
    pub evaluations: Option<Value>,
}

impl ImportRecord {
    /// Supplied status, or one derived from the grade; no grade means in progress.
    pub fn resolved_status(&self) -> EnrollmentStatus {
        match (self.status, self.final_grade) {
            (Some(status), _) => status,
            (None, Some(grade)) => EnrollmentStatus::from_grade(grade),
            (None, None) => EnrollmentStatus::Cursando,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.course_code.trim().is_empty() {
            return Err("courseCode is required".to_string());
        }
        if self.academic_period.trim().is_empty() {
            return Err("academicPeriod is required".to_string());
        }
        if let Some(grade) = self.final_grade {
            if !(MIN_GRADE..=MAX_GRADE).contains(&grade) {
                return Err(format!(
                    "finalGrade {} is outside {}-{}",
                    grade, MIN_GRADE, MAX_GRADE
                ));
            }
        }
        Ok(())
    }

    pub fn into_enrollment(self, user_id: i32) -> NewEnrollment {
        let status = self.resolved_status();
        NewEnrollment {
            user_id,
            course_code: self.course_code.trim().to_string(),
            academic_period: normalize_period_label(&self.academic_period),
            status,
            final_grade: self.final_grade,
            evaluations: self.evaluations,
        }
    }
}

/// Parses the raw `records` value of an import request.
///
/// # Errors
///
/// * `InvalidInput` - `records` is neither an array nor an object, or any
///   element fails to parse or validate.
pub fn parse_records(records: Value) -> Result<Vec<ImportRecord>, AppError> {
    let items = match records {
        Value::Array(items) => items,
        Value::Object(record) => vec![Value::Object(record)],
        _ => {
            return Err(AppError::InvalidInput(
                "Records must be an array".to_string(),
            ))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let record: ImportRecord = serde_json::from_value(item).map_err(|e| {
                AppError::InvalidInput(format!("Record {} is invalid: {}", index, e))
            })?;
            record.validate().map_err(|reason| {
                AppError::InvalidInput(format!("Record {} is invalid: {}", index, reason))
            })?;
            Ok(record)
        })
        .collect()
}

/// Inserts `records` as enrollments of `user_id`; returns the inserted count.
pub async fn import_history(
    store: &dyn RecordStore,
    user_id: i32,
    records: Vec<ImportRecord>,
) -> Result<u64, AppError> {
    let total = records.len();
    let rows: Vec<NewEnrollment> = records
        .into_iter()
        .map(|record| record.into_enrollment(user_id))
        .collect();

    let imported = store.insert_enrollments(rows).await?;
    tracing::info!(
        "Imported {}/{} historical enrollments for user {}",
        imported,
        total,
        user_id
    );

    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_object_is_coerced_to_batch() {
        let records = parse_records(json!({
            "courseCode": "INF111",
            "academicPeriod": "2023-1",
            "status": "aprobado",
            "finalGrade": 6.2
        }))
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].course_code, "INF111");
    }

    #[test]
    fn non_array_payloads_are_rejected() {
        for payload in [json!("INF111"), json!(42), json!(null), json!(true)] {
            let err = parse_records(payload).unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(ref m) if m == "Records must be an array"));
        }
    }

    #[test]
    fn malformed_record_rejects_batch_with_index() {
        let err = parse_records(json!([
            {"courseCode": "INF111", "academicPeriod": "2023-1", "finalGrade": 6.2},
            {"courseCode": "INF112"}
        ]))
        .unwrap_err();
        match err {
            AppError::InvalidInput(msg) => assert!(msg.starts_with("Record 1 is invalid")),
            other => panic!("expected InvalidInput, got {:?}", other),
        }

        let err = parse_records(json!([
            {"courseCode": "INF111", "academicPeriod": "2023-1", "finalGrade": 9.5}
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = parse_records(json!([
            {"courseCode": "INF111", "academicPeriod": "2023-1", "status": "retirado"}
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn supplied_status_wins_over_grade() {
        let record = ImportRecord {
            course_code: "INF223".to_string(),
            academic_period: "2023-2".to_string(),
            status: Some(EnrollmentStatus::Aprobado),
            final_grade: Some(2.2),
            evaluations: None,
        };
        assert_eq!(record.resolved_status(), EnrollmentStatus::Aprobado);
    }

    #[test]
    fn missing_status_is_derived_from_grade() {
        let records = parse_records(json!([
            {"courseCode": "INF223", "academicPeriod": "2023-2", "finalGrade": 2.2},
            {"courseCode": "INF211", "academicPeriod": "2023-2", "finalGrade": 4.0},
            {"courseCode": "INF311", "academicPeriod": "2025-2"}
        ]))
        .unwrap();
        let statuses: Vec<EnrollmentStatus> =
            records.iter().map(ImportRecord::resolved_status).collect();
        assert_eq!(
            statuses,
            vec![
                EnrollmentStatus::Reprobado,
                EnrollmentStatus::Aprobado,
                EnrollmentStatus::Cursando
            ]
        );

        let row = records[0].clone().into_enrollment(7);
        assert_eq!(row.user_id, 7);
        assert_eq!(row.final_grade, Some(2.2));
    }
}
