use crate::errors::AppError;
use crate::import::ImportRecord;
use crate::models::{CatalogCourse, EnrollmentStatus, NewCatalogCourse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// One line of a personal academic history file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub code: String,
    pub period: String,
    pub grade: f64,
    /// Informational; credits come from the catalog.
    #[serde(default)]
    pub credits: Option<i32>,
}

impl HistoryEntry {
    /// Import record for a concluded course, status derived from the grade.
    pub fn to_import_record(&self) -> ImportRecord {
        ImportRecord {
            course_code: self.code.clone(),
            academic_period: self.period.clone(),
            status: Some(EnrollmentStatus::from_grade(self.grade)),
            final_grade: Some(self.grade),
            evaluations: None,
        }
    }
}

/// History file consumed by the `import-history` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryFile {
    pub user_id: Option<i32>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub catalog: Vec<NewCatalogCourse>,
}

/// Client for a running dashboard API.
#[derive(Clone)]
pub struct DashboardClient {
    client: reqwest::Client,
    base_url: String,
}

impl DashboardClient {
    /// Creates a new `DashboardClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Server root, e.g. `http://localhost:3000`.
    pub fn new(base_url: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create API client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Posts a batch to `/api/academic/import`.
    ///
    /// # Returns
    ///
    /// * `Result<u64, AppError>` - Number of rows the server imported.
    pub async fn import_history(
        &self,
        user_id: i32,
        records: &[ImportRecord],
    ) -> Result<u64, AppError> {
        let url = format!("{}/api/academic/import", self.base_url);
        tracing::info!("Importing {} record(s) to {}", records.len(), url);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "userId": user_id,
                "records": records,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or_else(|| "Import failed".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Import returned {}: {}",
                status, error_text
            )));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse import response: {}", e))
        })?;

        body.get("imported")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| {
                AppError::ExternalApiError("Import response missing 'imported'".to_string())
            })
    }

    /// Creates one catalog course.
    pub async fn create_catalog_course(
        &self,
        course: &NewCatalogCourse,
    ) -> Result<CatalogCourse, AppError> {
        let url = format!("{}/api/academic/catalog", self.base_url);

        let response = self.client.post(&url).json(course).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Catalog returned {}: {}",
                status, error_text
            )));
        }

        let created = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse catalog response: {}", e))
        })?;

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let client = DashboardClient::new("http://localhost:3000/".to_string());
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url, "http://localhost:3000");
    }

    #[test]
    fn history_entry_derives_status() {
        let failed = HistoryEntry {
            code: "INF223".to_string(),
            period: "2023-2".to_string(),
            grade: 2.2,
            credits: Some(7),
        };
        let record = failed.to_import_record();
        assert_eq!(record.status, Some(EnrollmentStatus::Reprobado));
        assert_eq!(record.final_grade, Some(2.2));

        let passed = HistoryEntry {
            grade: 4.0,
            ..failed
        };
        assert_eq!(
            passed.to_import_record().status,
            Some(EnrollmentStatus::Aprobado)
        );
    }
}
