//! Integration tests for the owner-side transfer lifecycle.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use helpers::{TestApp, zip_of};

#[tokio::test]
async fn test_create_returns_chunk_plan() {
    let app = TestApp::with_chunk_size(1000).await;

    let response = app
        .request(
            "POST",
            "/transfer/new",
            Some(json!({ "size": 2500, "message": "quarterly numbers", "expiry": "7d" })),
            Some(&app.token),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let data = &response.body["data"];
    assert_eq!(data["max_chunk_size"], 1000);
    assert_eq!(data["expected_chunk_count"], 3);
    assert!(data["transfer_id"].is_string());
    assert!(data["expires_at"].is_string());
}

#[tokio::test]
async fn test_create_rejects_bad_sizes_and_expiry() {
    let app = TestApp::new().await;

    for (body, kind) in [
        (json!({ "size": 0 }), "INVALID_SIZE"),
        (json!({ "size": -5 }), "INVALID_SIZE"),
        (json!({ "size": 1u64 << 40 }), "INVALID_SIZE"),
        (json!({ "size": 10, "expiry": "5m" }), "VALIDATION"),
        (json!({ "size": 10, "expiry": "2001-01-01T00:00:00Z" }), "VALIDATION"),
    ] {
        let response = app
            .request("POST", "/transfer/new", Some(body.clone()), Some(&app.token))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response.body["error"]["kind"], kind, "{body}");
    }
}

#[tokio::test]
async fn test_requires_bearer_token() {
    let app = TestApp::new().await;

    let response = app
        .request("POST", "/transfer/new", Some(json!({ "size": 10 })), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .request("GET", "/transfer/all", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"]["kind"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_full_upload_out_of_order_then_assemble() {
    let app = TestApp::with_chunk_size(64).await;
    let archive = zip_of(&[
        ("report.pdf", [1u8; 150].as_slice()),
        ("notes/readme.txt", b"hello there".as_slice()),
    ]);
    let id = app.create_transfer(archive.len()).await;
    let pieces: Vec<&[u8]> = archive.chunks(64).collect();

    let status = app
        .request("GET", &format!("/transfer/status/{id}"), None, Some(&app.token))
        .await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(
        status.body["data"]["missing_indices"].as_array().unwrap().len(),
        pieces.len()
    );
    assert_eq!(status.body["data"]["complete"], false);

    for (index, piece) in pieces.iter().enumerate().rev() {
        let response = app.upload_chunk(&id, index as u32, piece).await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        assert_eq!(response.body["data"]["index"], index);
        assert_eq!(response.body["data"]["size"], piece.len());
    }

    let status = app
        .request("GET", &format!("/transfer/status/{id}"), None, Some(&app.token))
        .await;
    assert_eq!(status.body["data"]["complete"], true);
    assert!(status.body["data"]["missing_indices"].as_array().unwrap().is_empty());

    let response = app
        .request(
            "POST",
            "/transfer/assemble",
            Some(json!({ "id": id })),
            Some(&app.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["data"]["transfer"]["state"], "ready");
    let files = response.body["data"]["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["name"], "report.pdf");
    assert_eq!(files[0]["size"], 150);
    assert_eq!(files[1]["name"], "notes/readme.txt");
}

#[tokio::test]
async fn test_chunk_validation() {
    let app = TestApp::with_chunk_size(100).await;
    let id = app.create_transfer(250).await;

    let response = app.upload_chunk(&id, 3, &[0u8; 50]).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"]["kind"], "OUT_OF_RANGE");

    let response = app.upload_chunk(&id, 0, &[0u8; 99]).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"]["kind"], "SIZE_MISMATCH");

    let response = app.upload_chunk(&id, 2, &[0u8; 51]).await;
    assert_eq!(response.body["error"]["kind"], "SIZE_MISMATCH");

    let response = app.upload_chunk(&id, 2, &[0u8; 50]).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.upload_chunk("not-a-uuid", 0, &[0u8; 100]).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reupload_replaces_chunk() {
    let app = TestApp::with_chunk_size(100).await;
    let id = app.create_transfer(100).await;

    assert_eq!(app.upload_chunk(&id, 0, &[1u8; 100]).await.status, StatusCode::OK);
    assert_eq!(app.upload_chunk(&id, 0, &[2u8; 100]).await.status, StatusCode::OK);

    let status = app
        .request("GET", &format!("/transfer/status/{id}"), None, Some(&app.token))
        .await;
    assert_eq!(status.body["data"]["stored_indices"], json!([0]));
}

#[tokio::test]
async fn test_assemble_incomplete_reports_missing_indices() {
    let app = TestApp::with_chunk_size(10).await;
    let id = app.create_transfer(50).await;
    app.upload_chunk(&id, 1, &[0u8; 10]).await;
    app.upload_chunk(&id, 2, &[0u8; 10]).await;

    let response = app
        .request(
            "POST",
            "/transfer/assemble",
            Some(json!({ "transfer_id": id })),
            Some(&app.token),
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"]["kind"], "INCOMPLETE_UPLOAD");
    assert_eq!(response.body["error"]["details"]["missing"], json!([0, 3, 4]));
}

#[tokio::test]
async fn test_assemble_rejects_non_zip_payload() {
    let app = TestApp::with_chunk_size(10).await;
    let id = app.create_transfer(20).await;
    app.upload_chunk(&id, 0, b"0123456789").await;
    app.upload_chunk(&id, 1, b"abcdefghij").await;

    let response = app
        .request(
            "POST",
            "/transfer/assemble",
            Some(json!({ "id": id })),
            Some(&app.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"]["kind"], "INVALID_ARCHIVE");

    let status = app
        .request("GET", &format!("/transfer/status/{id}"), None, Some(&app.token))
        .await;
    assert_eq!(status.body["data"]["transfer"]["state"], "uploading");
}

#[tokio::test]
async fn test_second_assemble_is_rejected() {
    let app = TestApp::new().await;
    let id = app.publish(&zip_of(&[("a.txt", b"abc".as_slice())])).await;

    let response = app
        .request(
            "POST",
            "/transfer/assemble",
            Some(json!({ "id": id })),
            Some(&app.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"]["kind"], "ALREADY_ASSEMBLING");
}

#[tokio::test]
async fn test_owner_checks() {
    let app = TestApp::with_chunk_size(10).await;
    let id = app.create_transfer(20).await;
    let stranger = app.stranger_token();

    let response = app
        .request("GET", &format!("/transfer/status/{id}"), None, Some(&stranger))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request(
            "POST",
            "/transfer/cancel",
            Some(json!({ "transfer_id": id })),
            Some(&stranger),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request("DELETE", &format!("/transfer/delete/{id}"), None, Some(&stranger))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app.request("GET", "/transfer/all", None, Some(&stranger)).await;
    assert_eq!(response.body["data"], json!([]));
}

#[tokio::test]
async fn test_cancel_stops_uploads() {
    let app = TestApp::with_chunk_size(10).await;
    let id = app.create_transfer(20).await;
    app.upload_chunk(&id, 0, &[0u8; 10]).await;

    let response = app
        .request(
            "POST",
            "/transfer/cancel",
            Some(json!({ "transfer_id": id })),
            Some(&app.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["state"], "cancelled");

    let response = app.upload_chunk(&id, 1, &[0u8; 10]).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"]["kind"], "INVALID_STATE");

    let response = app
        .request(
            "POST",
            "/transfer/cancel",
            Some(json!({ "transfer_id": id })),
            Some(&app.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_update_message_and_expiry() {
    let app = TestApp::new().await;
    let id = app.create_transfer(10).await;

    let response = app
        .request(
            "PUT",
            "/transfer/update",
            Some(json!({ "transfer_id": id, "message": "for the board", "expiry": "30d" })),
            Some(&app.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["data"]["message"], "for the board");
    let created = chrono::DateTime::parse_from_rfc3339(
        response.body["data"]["created_at"].as_str().unwrap(),
    )
    .unwrap();
    let expires = chrono::DateTime::parse_from_rfc3339(
        response.body["data"]["expires_at"].as_str().unwrap(),
    )
    .unwrap();
    assert_eq!(expires - created, chrono::Duration::days(30));

    let response = app
        .request(
            "PUT",
            "/transfer/update",
            Some(json!({ "transfer_id": id })),
            Some(&app.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            "PUT",
            "/transfer/update",
            Some(json!({ "transfer_id": id, "message": "" })),
            Some(&app.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["data"]["message"].is_null());
}

#[tokio::test]
async fn test_update_after_ready_is_rejected() {
    let app = TestApp::new().await;
    let id = app.publish(&zip_of(&[("a.txt", b"abc".as_slice())])).await;

    let response = app
        .request(
            "PUT",
            "/transfer/update",
            Some(json!({ "transfer_id": id, "message": "too late" })),
            Some(&app.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let app = TestApp::new().await;
    let first = app.create_transfer(10).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = app.create_transfer(20).await;

    let response = app.request("GET", "/transfer/all", None, Some(&app.token)).await;
    assert_eq!(response.status, StatusCode::OK);
    let ids: Vec<&str> = response.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let app = TestApp::new().await;
    let id = app.publish(&zip_of(&[("a.txt", b"abc".as_slice())])).await;

    let response = app
        .request("DELETE", &format!("/transfer/delete/{id}"), None, Some(&app.token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["deleted"], true);

    let response = app
        .request("GET", &format!("/transfer/status/{id}"), None, Some(&app.token))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request("DELETE", &format!("/transfer/delete/{id}"), None, Some(&app.token))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request("DELETE", "/transfer/delete/garbage", None, Some(&app.token))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let response = app.request("GET", "/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
}
