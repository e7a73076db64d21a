// Integration tests for the upload receiver
//
// These tests drive the router directly and verify what lands on disk.

mod common;

use std::path::Path;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use common::{list_files, multipart_body, multipart_content_type};
use tempfile::TempDir;
use tower::ServiceExt;
use voice_recorder::http::ErrorResponse;
use voice_recorder::{create_router, AppState, UploadStore};

fn upload_request(fields: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, multipart_content_type())
        .body(Body::from(multipart_body(fields)))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Vec<u8>)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, body.to_vec()))
}

/// Split `<millis>-<name>` and return the timestamp
fn timestamp_prefix(file_name: &str) -> i64 {
    let (millis, _) = file_name.split_once('-').expect("timestamp prefix");
    millis.parse().expect("numeric timestamp")
}

fn router_for(dir: &Path) -> Router {
    create_router(AppState::new(dir))
}

#[tokio::test]
async fn test_upload_writes_exact_bytes() -> Result<()> {
    let storage = TempDir::new()?;
    let app = router_for(storage.path());
    let payload = [0x52u8, 0x49, 0x46];

    let before = Utc::now().timestamp_millis();
    let (status, body) = send(&app, upload_request(&[("audio", Some("a.wav"), &payload)])).await?;
    let after = Utc::now().timestamp_millis();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, br#"{"message":"Audio uploaded successfully!"}"#);

    let files = list_files(storage.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("-a.wav"), "got {}", files[0]);

    let millis = timestamp_prefix(&files[0]);
    assert!(millis >= before && millis <= after);

    assert_eq!(std::fs::read(storage.path().join(&files[0]))?, payload);

    Ok(())
}

#[tokio::test]
async fn test_missing_storage_directory_is_created() -> Result<()> {
    let root = TempDir::new()?;
    let storage_dir = root.path().join("nested").join("uploads");
    assert!(!storage_dir.exists());

    let app = router_for(&storage_dir);
    let (status, _) = send(&app, upload_request(&[("audio", Some("take.wav"), b"abc")])).await?;

    assert_eq!(status, StatusCode::OK);
    assert!(storage_dir.is_dir());
    let files = list_files(&storage_dir);
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("-take.wav"));

    Ok(())
}

#[tokio::test]
async fn test_two_uploads_produce_two_files() -> Result<()> {
    let storage = TempDir::new()?;
    let app = router_for(storage.path());

    let (first, _) = send(&app, upload_request(&[("audio", Some("one.wav"), b"first")])).await?;
    let (second, _) = send(&app, upload_request(&[("audio", Some("two.wav"), b"second")])).await?;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);

    let files = list_files(storage.path());
    assert_eq!(files.len(), 2);

    let one = files.iter().find(|f| f.ends_with("-one.wav")).expect("one.wav stored");
    let two = files.iter().find(|f| f.ends_with("-two.wav")).expect("two.wav stored");
    timestamp_prefix(one);
    timestamp_prefix(two);

    assert_eq!(std::fs::read(storage.path().join(one))?, b"first");
    assert_eq!(std::fs::read(storage.path().join(two))?, b"second");

    Ok(())
}

#[tokio::test]
async fn test_same_name_in_same_millisecond_never_overwrites() -> Result<()> {
    let storage = TempDir::new()?;
    let store = UploadStore::new(storage.path());

    let mut stored = Vec::new();
    for i in 0..5u8 {
        stored.push(store.save("a.wav", &[i]).await?);
    }

    let files = list_files(storage.path());
    assert_eq!(files.len(), 5);
    for (i, upload) in stored.iter().enumerate() {
        assert_eq!(std::fs::read(&upload.path)?, vec![i as u8]);
        assert!(upload.file_name.ends_with("-a.wav"));
    }

    Ok(())
}

#[tokio::test]
async fn test_path_traversal_stays_in_storage_dir() -> Result<()> {
    let root = TempDir::new()?;
    let storage_dir = root.path().join("uploads");
    let app = router_for(&storage_dir);

    let (status, _) = send(
        &app,
        upload_request(&[("audio", Some("../../evil name.wav"), b"x")]),
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(list_files(root.path()), vec!["uploads".to_string()]);

    let files = list_files(&storage_dir);
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("-evil_name.wav"), "got {}", files[0]);

    Ok(())
}

#[tokio::test]
async fn test_missing_audio_field_is_rejected() -> Result<()> {
    let storage = TempDir::new()?;
    let app = router_for(storage.path());

    let (status, body) = send(&app, upload_request(&[("file", Some("a.wav"), b"abc")])).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_slice(&body)?;
    assert!(error.error.contains("file"));

    let (status, _) = send(&app, upload_request(&[])).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(list_files(storage.path()).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_second_audio_field_is_rejected() -> Result<()> {
    let storage = TempDir::new()?;
    let app = router_for(storage.path());

    let (status, _) = send(
        &app,
        upload_request(&[("audio", Some("a.wav"), b"a"), ("audio", Some("b.wav"), b"b")]),
    )
    .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(list_files(storage.path()).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_text_fields_alongside_audio_are_ignored() -> Result<()> {
    let storage = TempDir::new()?;
    let app = router_for(storage.path());

    let (status, _) = send(
        &app,
        upload_request(&[
            ("title", None, b"morning take"),
            ("audio", Some("a.wav"), b"abc"),
            ("note", None, b"second"),
        ]),
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    let files = list_files(storage.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("-a.wav"));
    assert_eq!(std::fs::read(storage.path().join(&files[0]))?, b"abc");

    // A text field alone is still a missing file
    let (status, _) = send(&app, upload_request(&[("title", None, b"x")])).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_missing_filename_defaults_to_blob() -> Result<()> {
    let storage = TempDir::new()?;
    let app = router_for(storage.path());

    let (status, _) = send(&app, upload_request(&[("audio", None, b"abc")])).await?;

    assert_eq!(status, StatusCode::OK);
    let files = list_files(storage.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("-blob"));

    Ok(())
}

#[tokio::test]
async fn test_storage_failure_returns_500() -> Result<()> {
    let root = TempDir::new()?;
    let blocked = root.path().join("blocked");
    std::fs::write(&blocked, b"not a directory")?;

    let app = router_for(&blocked);
    let (status, body) = send(&app, upload_request(&[("audio", Some("a.wav"), b"abc")])).await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error: ErrorResponse = serde_json::from_slice(&body)?;
    assert!(error.error.contains("Failed to store upload"));

    // The router keeps serving
    let (status, _) = send(&app, Request::get("/health").body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_oversized_body_is_rejected() -> Result<()> {
    let storage = TempDir::new()?;
    let app = create_router(AppState::new(storage.path()).with_max_upload_bytes(64));

    let payload = vec![0u8; 4096];
    let (status, _) = send(&app, upload_request(&[("audio", Some("big.wav"), &payload)])).await?;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(list_files(storage.path()).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_any_origin_is_allowed() -> Result<()> {
    let storage = TempDir::new()?;
    let app = router_for(storage.path());

    let mut request = upload_request(&[("audio", Some("a.wav"), b"abc")]);
    request
        .headers_mut()
        .insert(header::ORIGIN, "http://example.com".parse()?);
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );

    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/upload")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())?;
    let response = app.oneshot(preflight).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );

    Ok(())
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let storage = TempDir::new()?;
    let app = router_for(storage.path());

    let (status, body) = send(&app, Request::get("/health").body(Body::empty())?).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");

    Ok(())
}
