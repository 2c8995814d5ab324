//! Imports a personal academic history file into a running dashboard API.
//!
//! Usage: `import-history <history.json>`
//!
//! The file holds `{"userId": 1, "history": [{code, period, grade, credits}], "catalog": [...]}`.
//! Enrollments are posted as one batch, then each catalog course is created;
//! catalog rejections (usually an existing code) are reported and skipped.

use anyhow::Context;
use life_dashboard_api::api_client::{DashboardClient, HistoryFile};
use life_dashboard_api::import::ImportRecord;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: import-history <history.json>"))?;
    let base_url = std::env::var("DASHBOARD_API_URL")
        .unwrap_or_else(|_| "http://localhost:3000".to_string());

    let content =
        std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path))?;
    let file: HistoryFile =
        serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path))?;
    let user_id = file.user_id.unwrap_or(1);

    println!("=== Academic History Import ===\n");

    let client = DashboardClient::new(base_url)?;

    let records: Vec<ImportRecord> = file.history.iter().map(|e| e.to_import_record()).collect();
    println!("Importing {} course records...", records.len());
    let imported = client.import_history(user_id, &records).await?;
    println!("✓ Imported {} records\n", imported);

    println!("Importing {} catalog courses...", file.catalog.len());
    let mut created = 0;
    for course in &file.catalog {
        match client.create_catalog_course(course).await {
            Ok(_) => created += 1,
            Err(e) => println!("  ⚠ Course {} skipped: {}", course.code, e),
        }
    }
    println!("✓ Catalog import complete ({} created)", created);

    Ok(())
}
