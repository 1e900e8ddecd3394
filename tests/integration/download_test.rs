//! Integration tests for public share and download endpoints.

mod helpers;

use axum::http::{StatusCode, header};
use chrono::{Duration, Utc};
use serde_json::json;

use bigdrop_core::types::id::TransferId;
use helpers::{TestApp, zip_of};

async fn expire(app: &TestApp, id: &str) {
    let id: TransferId = id.parse().unwrap();
    let mut transfer = app.repo.find_by_id(id).await.unwrap().unwrap();
    transfer.expires_at = Utc::now() - Duration::minutes(1);
    app.repo.insert(&transfer).await.unwrap();
}

#[tokio::test]
async fn test_share_info_lists_files() {
    let app = TestApp::new().await;
    let id = app
        .publish(&zip_of(&[
            ("design.dwg", [7u8; 300].as_slice()),
            ("notes.txt", b"v2".as_slice()),
        ]))
        .await;

    let response = app
        .request("GET", &format!("/transfer/share/{id}"), None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["id"], id.as_str());
    assert_eq!(data["state"], "ready");
    assert_eq!(data["download_count"], 0);
    let files = data["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["id"], format!("{id}.0"));
    assert_eq!(files[0]["name"], "design.dwg");
    assert_eq!(files[0]["size"], 300);
    assert_eq!(files[1]["id"], format!("{id}.1"));
}

#[tokio::test]
async fn test_archive_download_streams_bytes_and_counts() {
    let app = TestApp::with_chunk_size(128).await;
    let archive = zip_of(&[("big.bin", vec![3u8; 1000].as_slice())]);
    let id = app.publish(&archive).await;

    let response = app
        .request("GET", &format!("/transfer/download/transfer/{id}"), None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.bytes.as_ref(), archive.as_slice());
    assert_eq!(response.headers[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        response.headers[header::CONTENT_LENGTH],
        archive.len().to_string().as_str()
    );
    assert!(
        response.headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment;")
    );

    app.request("GET", &format!("/transfer/download/transfer/{id}"), None, None)
        .await;
    let share = app
        .request("GET", &format!("/transfer/share/{id}"), None, None)
        .await;
    assert_eq!(share.body["data"]["download_count"], 2);
}

#[tokio::test]
async fn test_single_file_download() {
    let app = TestApp::new().await;
    let id = app
        .publish(&zip_of(&[
            ("first.txt", b"first file".as_slice()),
            ("second.txt", b"second file body".as_slice()),
        ]))
        .await;

    let response = app
        .request("GET", &format!("/transfer/download/file/{id}.1"), None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.bytes.as_ref(), b"second file body");
    assert_eq!(
        response.headers[header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert_eq!(
        response.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"second.txt\""
    );

    let response = app
        .request("GET", &format!("/transfer/download/file/{id}.9"), None, None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request("GET", &format!("/transfer/download/file/{id}"), None, None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unfinished_transfer_is_not_ready() {
    let app = TestApp::new().await;
    let id = app.create_transfer(10).await;

    for path in [
        format!("/transfer/share/{id}"),
        format!("/transfer/download/transfer/{id}"),
        format!("/transfer/download/file/{id}.0"),
    ] {
        let response = app.request("GET", &path, None, None).await;
        assert_eq!(response.status, StatusCode::CONFLICT, "{path}");
        assert_eq!(response.body["error"]["kind"], "NOT_READY", "{path}");
    }
}

#[tokio::test]
async fn test_unknown_and_cancelled_are_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "GET",
            &format!("/transfer/share/{}", TransferId::new()),
            None,
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.request("GET", "/transfer/share/nope", None, None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let id = app.create_transfer(10).await;
    app.request(
        "POST",
        "/transfer/cancel",
        Some(json!({ "transfer_id": id })),
        Some(&app.token),
    )
    .await;
    let response = app
        .request("GET", &format!("/transfer/download/transfer/{id}"), None, None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_expired_transfer_is_gone() {
    let app = TestApp::new().await;
    let ready = app.publish(&zip_of(&[("a.txt", b"abc".as_slice())])).await;
    let unfinished = app.create_transfer(10).await;
    expire(&app, &ready).await;
    expire(&app, &unfinished).await;

    for id in [&ready, &unfinished] {
        let response = app
            .request("GET", &format!("/transfer/download/transfer/{id}"), None, None)
            .await;
        assert_eq!(response.status, StatusCode::GONE);
        assert_eq!(response.body["error"]["kind"], "EXPIRED");
    }

    let response = app
        .request("GET", &format!("/transfer/download/file/{ready}.0"), None, None)
        .await;
    assert_eq!(response.status, StatusCode::GONE);

    let listed = app.request("GET", "/transfer/all", None, Some(&app.token)).await;
    let states: Vec<&str> = listed.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["state"].as_str().unwrap())
        .collect();
    assert_eq!(states, vec!["expired", "expired"]);
}
