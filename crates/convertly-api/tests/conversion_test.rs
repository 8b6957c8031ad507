//! Conversion, status polling and batch integration tests.
//!
//! Run with: `cargo test -p convertly-api --test conversion_test`

mod helpers;

use convertly_provider::testing::ScriptedProvider;
use convertly_provider::RemoteStatus;
use helpers::fixtures::{minimal_png, text_bytes};
use helpers::{
    poll_until_terminal, setup_test_app, setup_test_app_with, test_config, upload_ok,
    PUBLIC_BASE_URL,
};
use serde_json::json;

#[tokio::test]
async fn test_text_to_pdf_end_to_end() {
    let app = setup_test_app().await;
    let file_id = upload_ok(
        app.client(),
        "quarterly-report.txt",
        "text/plain",
        text_bytes(2048),
    )
    .await;

    let response = app
        .client()
        .post("/convert")
        .json(&json!({ "fileId": file_id, "targetFormat": "pdf" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let created: serde_json::Value = response.json();
    let job_id = created["jobId"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["jobId"], job_id.as_str());
    assert_eq!(created["data"]["status"], "queued");
    assert_eq!(created["data"]["sourceFile"], file_id.as_str());

    let status = poll_until_terminal(app.client(), &job_id, 10).await;
    assert_eq!(status["status"], "finished");
    assert_eq!(status["filename"], "quarterly-report.pdf");
    assert!(status["resultUrl"]
        .as_str()
        .unwrap()
        .ends_with("/quarterly-report.pdf"));
    assert!(status.get("error").is_none());

    let uploads = app.provider.uploads().await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].1.len(), 2048);
}

#[tokio::test]
async fn test_terminal_status_is_stable() {
    let app = setup_test_app().await;
    let file_id = upload_ok(app.client(), "a.txt", "text/plain", text_bytes(64)).await;
    let created: serde_json::Value = app
        .client()
        .post("/convert")
        .json(&json!({ "fileId": file_id, "targetFormat": "pdf" }))
        .await
        .json();
    let job_id = created["jobId"].as_str().unwrap().to_string();

    let first = poll_until_terminal(app.client(), &job_id, 10).await;
    let calls = app.provider.get_calls();
    let second = poll_until_terminal(app.client(), &job_id, 1).await;

    assert_eq!(first, second);
    assert_eq!(app.provider.get_calls(), calls);
}

#[tokio::test]
async fn test_convert_unknown_file_is_404() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post("/convert")
        .json(&json!({
            "fileId": "0b7d1f6e-3c55-4f0e-a3f2-6a0b4d1c9e21",
            "targetFormat": "pdf"
        }))
        .await;

    assert_eq!(response.status_code(), 404);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "FILE_NOT_FOUND");
    assert_eq!(app.provider.create_calls(), 0);
}

#[tokio::test]
async fn test_convert_malformed_body_is_400() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post("/convert")
        .json(&json!({ "fileId": 42, "targetFormat": "pdf" }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_convert_invalid_target_is_400() {
    let app = setup_test_app().await;
    let file_id = upload_ok(app.client(), "a.txt", "text/plain", text_bytes(64)).await;
    let response = app
        .client()
        .post("/convert")
        .json(&json!({ "fileId": file_id, "targetFormat": "pdf/../x" }))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_status_query_validation() {
    let app = setup_test_app().await;

    let missing = app.client().get("/convert").await;
    assert_eq!(missing.status_code(), 400);

    let malformed = app
        .client()
        .get("/convert")
        .add_query_param("jobId", "not-a-uuid")
        .await;
    assert_eq!(malformed.status_code(), 400);

    let unknown = app
        .client()
        .get("/convert")
        .add_query_param("jobId", "5a2f0c1e-8d3b-4e6a-9f71-0c2d3e4f5a6b")
        .await;
    assert_eq!(unknown.status_code(), 404);
    let body: serde_json::Value = unknown.json();
    assert_eq!(body["code"], "JOB_NOT_FOUND");
}

#[tokio::test]
async fn test_provider_upload_failure_is_a_job_state() {
    let app = setup_test_app_with(
        ScriptedProvider::default().fail_upload_for("broken.txt"),
        test_config(),
    )
    .await;
    let file_id = upload_ok(app.client(), "broken.txt", "text/plain", text_bytes(64)).await;

    let response = app
        .client()
        .post("/convert")
        .json(&json!({ "fileId": file_id, "targetFormat": "pdf" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let created: serde_json::Value = response.json();
    assert_eq!(created["data"]["status"], "error");

    let job_id = created["jobId"].as_str().unwrap();
    let status = poll_until_terminal(app.client(), job_id, 1).await;
    assert_eq!(status["status"], "error");
    assert!(status["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to upload file"));
    assert!(status.get("resultUrl").is_none());
}

#[tokio::test]
async fn test_remote_error_message_is_reported() {
    let app = setup_test_app_with(
        ScriptedProvider::new(vec![RemoteStatus::Waiting, RemoteStatus::Error])
            .with_failure_message("Input file is password protected"),
        test_config(),
    )
    .await;
    let file_id = upload_ok(app.client(), "a.txt", "text/plain", text_bytes(64)).await;
    let created: serde_json::Value = app
        .client()
        .post("/convert")
        .json(&json!({ "fileId": file_id, "targetFormat": "docx" }))
        .await
        .json();

    let status = poll_until_terminal(app.client(), created["jobId"].as_str().unwrap(), 5).await;
    assert_eq!(status["status"], "error");
    assert_eq!(status["error"], "Input file is password protected");
}

#[tokio::test]
async fn test_ocr_result_is_served_as_text() {
    let app = setup_test_app_with(
        ScriptedProvider::default().with_download_body("INVOICE 2024-001"),
        test_config(),
    )
    .await;
    let file_id = upload_ok(app.client(), "invoice.png", "image/png", minimal_png()).await;
    let created: serde_json::Value = app
        .client()
        .post("/convert")
        .json(&json!({ "fileId": file_id, "targetFormat": "image-to-text" }))
        .await
        .json();

    let status = poll_until_terminal(app.client(), created["jobId"].as_str().unwrap(), 10).await;
    assert_eq!(status["status"], "finished");
    assert_eq!(status["filename"], "invoice.txt");

    let result_url = status["resultUrl"].as_str().unwrap();
    let path = result_url.strip_prefix(PUBLIC_BASE_URL).unwrap();
    let artifact = app.client().get(path).await;
    assert_eq!(artifact.status_code(), 200);
    assert_eq!(artifact.header("content-type"), "text/plain");
    assert_eq!(artifact.text(), "INVOICE 2024-001");
}

#[tokio::test]
async fn test_batch_reports_every_file() {
    let app = setup_test_app_with(
        ScriptedProvider::default().fail_upload_for("b.txt"),
        test_config(),
    )
    .await;
    let ids = vec![
        upload_ok(app.client(), "a.txt", "text/plain", text_bytes(64)).await,
        upload_ok(app.client(), "b.txt", "text/plain", text_bytes(64)).await,
        upload_ok(app.client(), "c.txt", "text/plain", text_bytes(64)).await,
    ];

    let response = app
        .client()
        .post("/convert/batch")
        .json(&json!({ "fileIds": ids, "targetFormat": "pdf" }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(body["succeeded"], 2);
    assert_eq!(body["failed"], 1);

    assert_eq!(results[0]["outcome"], "ok");
    assert_eq!(results[0]["filename"], "a.pdf");
    assert_eq!(results[1]["outcome"], "failed");
    assert_eq!(results[1]["fileId"], ids[1].as_str());
    assert_eq!(results[2]["outcome"], "ok");
}

#[tokio::test]
async fn test_batch_rejects_empty_and_oversized_requests() {
    let app = setup_test_app().await;

    let empty = app
        .client()
        .post("/convert/batch")
        .json(&json!({ "fileIds": [], "targetFormat": "pdf" }))
        .await;
    assert_eq!(empty.status_code(), 400);

    let ids: Vec<String> = (0..21)
        .map(|i| format!("00000000-0000-4000-8000-{:012}", i))
        .collect();
    let too_many = app
        .client()
        .post("/convert/batch")
        .json(&json!({ "fileIds": ids, "targetFormat": "pdf" }))
        .await;
    assert_eq!(too_many.status_code(), 400);
    assert_eq!(app.provider.create_calls(), 0);
}
