/// Tests for the history import client against a mocked dashboard API
use life_dashboard_api::api_client::{DashboardClient, HistoryEntry, HistoryFile};
use life_dashboard_api::errors::AppError;
use life_dashboard_api::models::NewCatalogCourse;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn history() -> Vec<HistoryEntry> {
    vec![
        HistoryEntry {
            code: "INF111".to_string(),
            period: "2023-1".to_string(),
            grade: 6.2,
            credits: Some(8),
        },
        HistoryEntry {
            code: "INF223".to_string(),
            period: "2023-2".to_string(),
            grade: 2.2,
            credits: Some(7),
        },
    ]
}

#[tokio::test]
async fn import_posts_batch_with_derived_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/academic/import"))
        .and(body_partial_json(json!({
            "userId": 1,
            "records": [
                {"courseCode": "INF111", "academicPeriod": "2023-1", "status": "aprobado", "finalGrade": 6.2},
                {"courseCode": "INF223", "academicPeriod": "2023-2", "status": "reprobado", "finalGrade": 2.2}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"imported": 2})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = DashboardClient::new(mock_server.uri()).unwrap();
    let records: Vec<_> = history().iter().map(HistoryEntry::to_import_record).collect();
    let imported = client.import_history(1, &records).await.unwrap();

    assert_eq!(imported, 2);
}

#[tokio::test]
async fn import_surfaces_server_error_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/academic/import"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Records must be an array"})),
        )
        .mount(&mock_server)
        .await;

    let client = DashboardClient::new(mock_server.uri()).unwrap();
    let err = client.import_history(1, &[]).await.unwrap_err();

    match err {
        AppError::ExternalApiError(msg) => {
            assert!(msg.contains("400"));
            assert!(msg.contains("Records must be an array"));
        }
        other => panic!("expected ExternalApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn catalog_conflict_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/academic/catalog"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({"error": "exists"})))
        .mount(&mock_server)
        .await;

    let client = DashboardClient::new(mock_server.uri()).unwrap();
    let course = NewCatalogCourse {
        code: "INF111".to_string(),
        name: "FUNDAMENTOS DE MATEMÁTICAS".to_string(),
        credits: 8,
        semester: 1,
    };
    assert!(client.create_catalog_course(&course).await.is_err());
}

#[tokio::test]
async fn catalog_create_parses_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/academic/catalog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7, "code": "INF112", "name": "ÁLGEBRA", "credits": 8, "semester": 1
        })))
        .mount(&mock_server)
        .await;

    let client = DashboardClient::new(mock_server.uri()).unwrap();
    let course = NewCatalogCourse {
        code: "INF112".to_string(),
        name: "ÁLGEBRA".to_string(),
        credits: 8,
        semester: 1,
    };
    let created = client.create_catalog_course(&course).await.unwrap();
    assert_eq!(created.id, 7);
    assert_eq!(created.credits, 8);
}

#[test]
fn sample_history_file_parses() {
    let content = include_str!("../demos/academic_history.json");
    let file: HistoryFile = serde_json::from_str(content).unwrap();
    assert_eq!(file.user_id, Some(1));
    assert!(!file.history.is_empty());
    assert!(file.catalog.iter().all(|c| c.validate().is_ok()));
}
