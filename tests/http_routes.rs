use appgen_sdk::error::HistoryError;
use appgen_sdk::history::{HistoryRecord, HistoryRecordSummary, DEFAULT_HISTORY_TIMEOUT};
use appgen_sdk::{app, AppState, HistoryStore, MemoryHistoryStore};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const SAFETY: &str = r#"{
    "project_name": "Patient Safety",
    "prefix": "SAFETY",
    "tables": [{ "name": "INCIDENTS", "columns": [
        { "name": "description", "type": "long_text", "required": true },
        { "name": "severity", "type": "integer", "required": true }
    ]}]
}"#;

struct DownStore;

#[async_trait]
impl HistoryStore for DownStore {
    async fn append(&self, _record: &HistoryRecord) -> Result<(), HistoryError> {
        Err(HistoryError::StorageUnavailable("connection refused".into()))
    }
    async fn list(&self) -> Result<Vec<HistoryRecordSummary>, HistoryError> {
        Err(HistoryError::StorageUnavailable("connection refused".into()))
    }
    async fn fetch(&self, _id: Uuid) -> Result<Option<HistoryRecord>, HistoryError> {
        Err(HistoryError::StorageUnavailable("connection refused".into()))
    }
    async fn ping(&self) -> Result<(), HistoryError> {
        Err(HistoryError::StorageUnavailable("connection refused".into()))
    }
}

fn memory_app() -> Router {
    app(AppState::new(Arc::new(MemoryHistoryStore::default()), DEFAULT_HISTORY_TIMEOUT))
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Requester", "qa.lead")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, String, Vec<u8>) {
    let res = router.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let content_type = res
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, content_type, bytes.to_vec())
}

fn json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn generate_records_and_history_serves_it_back() {
    let router = memory_app();
    let (status, _, body) = send(&router, post("/api/v1/generate", SAFETY)).await;
    assert_eq!(status, StatusCode::OK);
    let outcome = json(&body);
    assert_eq!(outcome["artifacts"]["database"], "SAFETY_DB");
    assert_eq!(outcome["warnings"].as_array().unwrap().len(), 0);
    let id = outcome["record_id"].as_str().unwrap().to_string();

    let (status, _, body) = send(&router, get("/api/v1/history")).await;
    assert_eq!(status, StatusCode::OK);
    let list = json(&body);
    assert_eq!(list["meta"]["count"], 1);
    assert_eq!(list["data"][0]["id"], id.as_str());
    assert_eq!(list["data"][0]["requester"], "qa.lead");
    assert_eq!(list["data"][0]["table_count"], 1);
    assert_eq!(list["meta"]["project_count"], 1);
    assert_eq!(list["meta"]["column_count"], 2);
    assert_eq!(list["meta"]["requester_count"], 1);

    let (status, _, body) = send(&router, get(&format!("/api/v1/history/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["data"]["artifacts"]["names"]["app_source"], "safety_app.py");

    let (status, content_type, body) =
        send(&router, get(&format!("/api/v1/history/{}/artifacts/sql", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("application/sql"));
    let sql = String::from_utf8(body).unwrap();
    assert!(sql.contains("CREATE ROLE IF NOT EXISTS SAFETY_READONLY;"));
}

#[tokio::test]
async fn validation_failure_is_a_structured_422() {
    let router = memory_app();
    let body = r#"{ "project_name": "Empty", "prefix": "EMPTY", "tables": [] }"#;
    let (status, _, body) = send(&router, post("/api/v1/generate", body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let err = json(&body);
    assert_eq!(err["error"]["code"], "validation_error");
    assert_eq!(err["error"]["details"]["kind"], "no_tables");
    assert_eq!(err["error"]["details"]["field"], "tables");

    let (_, _, body) = send(&router, get("/api/v1/history")).await;
    assert_eq!(json(&body)["meta"]["count"], 0);
}

#[tokio::test]
async fn unknown_record_and_artifact_kind_are_rejected() {
    let router = memory_app();
    let missing = Uuid::new_v4();
    let (status, _, body) = send(&router, get(&format!("/api/v1/history/{}", missing))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"]["code"], "not_found");

    let (status, _, body) =
        send(&router, get(&format!("/api/v1/history/{}/artifacts/pdf", missing))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"]["code"], "bad_request");
}

#[tokio::test]
async fn bundle_is_a_zip_of_all_artifacts() {
    let router = memory_app();
    let (status, content_type, body) = send(&router, post("/api/v1/generate/bundle", SAFETY)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "application/zip");
    let archive = zip::ZipArchive::new(Cursor::new(body)).unwrap();
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort();
    assert_eq!(
        names,
        ["README.md", "SAFETY_complete_setup.sql", "project.json", "safety_app.py"]
    );
}

#[tokio::test]
async fn store_outage_keeps_artifacts_and_warns() {
    let router = app(AppState::new(Arc::new(DownStore), DEFAULT_HISTORY_TIMEOUT));
    let (status, _, body) = send(&router, post("/api/v1/generate", SAFETY)).await;
    assert_eq!(status, StatusCode::OK);
    let outcome = json(&body);
    assert!(outcome["record_id"].is_null());
    assert_eq!(outcome["warnings"][0]["kind"], "storage_unavailable");
    assert!(outcome["artifacts"]["sql_script"]
        .as_str()
        .unwrap()
        .contains("CREATE DATABASE IF NOT EXISTS SAFETY_DB"));

    let (status, _, body) = send(&router, get("/api/v1/history")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json(&body)["error"]["code"], "storage_unavailable");

    let (status, _, body) = send(&router, get("/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json(&body)["status"], "degraded");
}

#[tokio::test]
async fn health_ready_and_version() {
    let router = memory_app();
    let (status, _, body) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "ok");

    let (status, _, body) = send(&router, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["history"], "ok");

    let (_, _, body) = send(&router, get("/version")).await;
    assert_eq!(json(&body)["name"], "appgen-sdk");
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let router = memory_app();
    let big = format!(r#"{{ "project_name": "{}" }}"#, "x".repeat(2 * 1024 * 1024));
    let mut req = post("/api/v1/generate", &big);
    req.headers_mut().insert(header::CONTENT_LENGTH, big.len().into());
    let (status, _, _) = send(&router, req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn history_listing_reports_totals() {
    let router = memory_app();
    let other = SAFETY.replace("Patient Safety", "Lab Intake");
    send(&router, post("/api/v1/generate", SAFETY)).await;
    send(&router, post("/api/v1/generate", SAFETY)).await;
    let mut req = post("/api/v1/generate", &other);
    req.headers_mut().insert("x-requester", "lab.tech".parse().unwrap());
    send(&router, req).await;

    let (status, _, body) = send(&router, get("/api/v1/history")).await;
    assert_eq!(status, StatusCode::OK);
    let meta = &json(&body)["meta"];
    assert_eq!(meta["count"], 3);
    assert_eq!(meta["project_count"], 2);
    assert_eq!(meta["table_count"], 3);
    assert_eq!(meta["column_count"], 6);
    assert_eq!(meta["requester_count"], 2);
}
