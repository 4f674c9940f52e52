//! Download, ZIP and delete integration tests.
//!
//! Run with: `cargo test -p pixshrink-api --test download_test`

mod helpers;

use std::io::Cursor;

use axum_test::multipart::MultipartForm;
use helpers::auth::bearer;
use helpers::fixtures::{image_part, jpeg, png};
use helpers::{setup_http_test_app, setup_test_app, TestApp};
use pixshrink_core::naming::parse_optimized_filename;
use serde_json::{json, Value};

/// Upload the given files and return the derived filenames
async fn process(app: &TestApp, files: Vec<(&str, &str, Vec<u8>)>) -> Vec<String> {
    let mut form = MultipartForm::new().add_text("format", "png");
    for (name, mime, data) in files {
        form = form.add_part("images", image_part(name, mime, data));
    }

    let response = app
        .client()
        .post("/api/images/process")
        .add_header("Authorization", bearer("1"))
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["optimizedFilename"].as_str().unwrap().to_string())
        .collect()
}

/// Stored upload that a derived file was produced from
async fn original_of(app: &TestApp, optimized: &str) -> String {
    let base = parse_optimized_filename(optimized).unwrap();
    app.files()
        .await
        .into_iter()
        .find(|f| f.starts_with(base) && !f.contains("-optimized"))
        .expect("original should exist")
}

#[tokio::test]
async fn test_single_download_is_one_shot() {
    let app = setup_http_test_app().await;
    let names = process(&app, vec![("a.jpg", "image/jpeg", jpeg(24, 24))]).await;
    let optimized = &names[0];
    let original = original_of(&app, optimized).await;

    let response = app
        .client()
        .get(&format!("/api/images/download/{}", optimized))
        .add_header("Authorization", bearer("1"))
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert_eq!(
        response.headers()["content-disposition"],
        format!("attachment; filename=\"{}\"", optimized).as_str()
    );
    let decoded = image::load_from_memory(response.as_bytes()).unwrap();
    assert_eq!(decoded.width(), 24);

    assert!(app.wait_until_gone(optimized).await);
    assert!(app.wait_until_gone(&original).await);

    let again = app
        .client()
        .get(&format!("/api/images/download/{}", optimized))
        .add_header("Authorization", bearer("1"))
        .await;
    assert_eq!(again.status_code(), 404);
    let body: Value = again.json();
    assert_eq!(body["message"], "File not found");
}

#[tokio::test]
async fn test_download_missing_file() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .get("/api/images/download/123-456-optimized.webp")
        .add_header("Authorization", bearer("1"))
        .await;

    assert_eq!(response.status_code(), 404);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "File not found");
}

#[tokio::test]
async fn test_download_requires_token() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .get("/api/images/download/123-456-optimized.webp")
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_zip_skips_missing_and_cleans_up() {
    let app = setup_http_test_app().await;
    let names = process(
        &app,
        vec![
            ("a.jpg", "image/jpeg", jpeg(16, 16)),
            ("b.png", "image/png", png(16, 16)),
        ],
    )
    .await;
    let zipped = names[0].clone();
    let untouched = names[1].clone();
    let zipped_original = original_of(&app, &zipped).await;
    let untouched_original = original_of(&app, &untouched).await;

    let response = app
        .client()
        .post("/api/images/download-zip")
        .add_header("Authorization", bearer("1"))
        .json(&json!({ "filenames": [zipped, "missing-optimized.webp"] }))
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.headers()["content-type"], "application/zip");
    let disposition = response.headers()["content-disposition"].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=optimized-images-"));
    assert!(disposition.ends_with(".zip"));

    let bytes = response.as_bytes().to_vec();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 1);
    assert_eq!(archive.by_index(0).unwrap().name(), zipped);

    assert!(app.wait_until_gone(&zipped).await);
    assert!(app.wait_until_gone(&zipped_original).await);
    assert!(app.exists(&untouched).await);
    assert!(app.exists(&untouched_original).await);
}

#[tokio::test]
async fn test_zip_requires_filenames() {
    let app = setup_test_app().await;

    for body in [json!({}), json!({ "filenames": [] })] {
        let response = app
            .client()
            .post("/api/images/download-zip")
            .add_header("Authorization", bearer("1"))
            .json(&body)
            .await;

        assert_eq!(response.status_code(), 400);
        let body: Value = response.json();
        assert_eq!(body["message"], "No filenames provided");
    }
}

#[tokio::test]
async fn test_zip_rejects_paths() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post("/api/images/download-zip")
        .add_header("Authorization", bearer("1"))
        .json(&json!({ "filenames": ["../secret-optimized.webp"] }))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let app = setup_test_app().await;
    let names = process(&app, vec![("a.jpg", "image/jpeg", jpeg(16, 16))]).await;
    let original = original_of(&app, &names[0]).await;

    for _ in 0..2 {
        let response = app
            .client()
            .delete("/api/images/delete")
            .add_header("Authorization", bearer("1"))
            .json(&json!({ "filenames": [names[0]] }))
            .await;

        assert_eq!(response.status_code(), 200);
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Files deleted successfully");
    }

    assert!(!app.exists(&names[0]).await);
    // Explicit delete removes only what was listed.
    assert!(app.exists(&original).await);
}

#[tokio::test]
async fn test_delete_requires_filenames() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .delete("/api/images/delete")
        .add_header("Authorization", bearer("1"))
        .json(&json!({ "filenames": [] }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["message"], "No filenames provided");
}
