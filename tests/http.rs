//! HTTP-level tests: the axum router driven through `axum-test`.

#![cfg(feature = "server")]

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use bytes::Bytes;
use edgequake_imgconv::server::{build_router, AppState, ErrorResponse};
use edgequake_imgconv::{
    ConversionConfig, ConversionResponse, ConversionService, GENERIC_FAILURE_MESSAGE,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

struct TestApp {
    server: TestServer,
    tmp: TempDir,
}

impl TestApp {
    fn intake_entries(&self) -> usize {
        count(&self.tmp.path().join("uploads"))
    }

    fn output_entries(&self) -> usize {
        count(&self.tmp.path().join("converted"))
    }
}

/// Visible entries only; the publisher's `.staging` directory is skipped.
fn count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|d| {
            d.filter_map(Result::ok)
                .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
                .count()
        })
        .unwrap_or(0)
}

async fn setup(max_upload_bytes: Option<u64>) -> TestApp {
    // RUST_LOG=debug cargo test --test http -- --nocapture
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let tmp = TempDir::new().unwrap();
    let mut builder = ConversionConfig::builder()
        .intake_dir(tmp.path().join("uploads"))
        .output_dir(tmp.path().join("converted"));
    if let Some(n) = max_upload_bytes {
        builder = builder.max_upload_bytes(n);
    }
    let service = ConversionService::new(builder.build().unwrap())
        .await
        .unwrap();
    let server = TestServer::new(build_router(AppState::new(service))).unwrap();
    TestApp { server, tmp }
}

fn png(w: u32, h: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([90, 180, 45])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn webp(w: u32, h: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 200])
    }));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::WebP)
        .unwrap();
    buf
}

fn image_part(bytes: Vec<u8>, file_name: &str, mime: &str) -> Part {
    Part::bytes(Bytes::from(bytes))
        .file_name(file_name)
        .mime_type(mime)
}

fn form(image: Option<Part>, format: Option<&str>) -> MultipartForm {
    let mut form = MultipartForm::new();
    if let Some(part) = image {
        form = form.add_part("image", part);
    }
    if let Some(f) = format {
        form = form.add_text("format", f);
    }
    form
}

// ── Success ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn png_to_jpeg_returns_retrievable_url() {
    let app = setup(None).await;

    let resp = app
        .server
        .post("/api/convert")
        .multipart(form(Some(image_part(png(100, 100), "a.png", "image/png")), Some("jpeg")))
        .await;

    assert_eq!(resp.status_code(), 200);
    let body: ConversionResponse = resp.json();
    assert!(body.url.starts_with("/converted/"), "{}", body.url);
    assert!(body.url.ends_with(".jpeg"), "{}", body.url);

    let fetched = app.server.get(&body.url).await;
    assert_eq!(fetched.status_code(), 200);
    let img = image::load_from_memory_with_format(fetched.as_bytes(), ImageFormat::Jpeg).unwrap();
    assert_eq!((img.width(), img.height()), (100, 100));

    assert_eq!(app.intake_entries(), 0);
}

#[tokio::test]
async fn webp_upload_converts_to_both_targets() {
    let app = setup(None).await;

    for (target, format) in [("jpeg", ImageFormat::Jpeg), ("png", ImageFormat::Png)] {
        let resp = app
            .server
            .post("/api/convert")
            .multipart(form(Some(image_part(webp(100, 100), "a.webp", "image/webp")), Some(target)))
            .await;

        assert_eq!(resp.status_code(), 200, "webp → {target}");
        let body: ConversionResponse = resp.json();
        assert!(body.url.ends_with(&format!(".{target}")), "{}", body.url);

        let fetched = app.server.get(&body.url).await;
        assert_eq!(fetched.status_code(), 200);
        let img = image::load_from_memory_with_format(fetched.as_bytes(), format).unwrap();
        assert_eq!((img.width(), img.height()), (100, 100), "webp → {target}");
    }

    assert_eq!(app.output_entries(), 2);
    assert_eq!(app.intake_entries(), 0);
}

#[tokio::test]
async fn legacy_path_behaves_the_same() {
    let app = setup(None).await;

    let resp = app
        .server
        .post("/convert")
        .multipart(form(Some(image_part(png(8, 8), "a.png", "image/png")), Some("png")))
        .await;

    assert_eq!(resp.status_code(), 200);
    let body: ConversionResponse = resp.json();
    assert!(body.url.ends_with(".png"));
    assert_eq!(app.output_entries(), 1);
}

#[tokio::test]
async fn health_is_ok() {
    let app = setup(None).await;
    let resp = app.server.get("/api/health").await;
    assert_eq!(resp.status_code(), 200);
    assert_eq!(resp.text(), "ok");
}

#[tokio::test]
async fn staging_files_are_not_served() {
    let app = setup(None).await;
    let output = app.tmp.path().join("converted");
    std::fs::write(output.join(".staging/publish-leftover.tmp"), b"partial").unwrap();
    std::fs::write(output.join(".hidden.png"), b"partial").unwrap();
    std::fs::write(output.join("visible.png"), b"done").unwrap();

    assert_eq!(app.server.get("/converted/visible.png").await.status_code(), 200);
    for path in [
        "/converted/.staging/publish-leftover.tmp",
        "/converted/%2Estaging/publish-leftover.tmp",
        "/converted/.hidden.png",
    ] {
        let resp = app.server.get(path).await;
        assert_eq!(resp.status_code(), 404, "{path}");
    }
}

// ── Client errors ────────────────────────────────────────────────────────────

#[tokio::test]
async fn six_mib_upload_is_payload_too_large() {
    let app = setup(None).await;
    let mut big = png(4, 4);
    big.resize(6 * 1024 * 1024, 0);

    let resp = app
        .server
        .post("/api/convert")
        .multipart(form(Some(image_part(big, "big.png", "image/png")), Some("png")))
        .await;

    assert_eq!(resp.status_code(), 400);
    let body: ErrorResponse = resp.json();
    assert_eq!(body.code, "payload_too_large");
    assert_eq!(app.output_entries(), 0);
    assert_eq!(app.intake_entries(), 0);
}

#[tokio::test]
async fn body_over_request_limit_is_payload_too_large() {
    // 1 KiB per file; the whole body may be at most 4 KiB.
    let app = setup(Some(1024)).await;

    let resp = app
        .server
        .post("/api/convert")
        .multipart(form(Some(image_part(vec![0u8; 64 * 1024], "x.png", "image/png")), Some("png")))
        .await;

    assert_eq!(resp.status_code(), 400);
    let body: ErrorResponse = resp.json();
    assert_eq!(body.code, "payload_too_large");
    assert_eq!(app.output_entries(), 0);
}

#[tokio::test]
async fn no_file_part_is_missing_file() {
    let app = setup(None).await;

    let resp = app
        .server
        .post("/api/convert")
        .multipart(form(None, Some("jpeg")))
        .await;

    assert_eq!(resp.status_code(), 400);
    let body: ErrorResponse = resp.json();
    assert_eq!(body.code, "missing_file");
    assert_eq!(body.error, "No file uploaded.");
}

#[tokio::test]
async fn empty_file_part_is_missing_file() {
    let app = setup(None).await;

    let resp = app
        .server
        .post("/api/convert")
        .multipart(form(Some(image_part(Vec::new(), "", "application/octet-stream")), Some("png")))
        .await;

    assert_eq!(resp.status_code(), 400);
    let body: ErrorResponse = resp.json();
    assert_eq!(body.code, "missing_file");
}

#[tokio::test]
async fn gif_target_is_unsupported() {
    let app = setup(None).await;

    let resp = app
        .server
        .post("/api/convert")
        .multipart(form(Some(image_part(png(8, 8), "a.png", "image/png")), Some("gif")))
        .await;

    assert_eq!(resp.status_code(), 400);
    let body: ErrorResponse = resp.json();
    assert_eq!(body.code, "unsupported_target_format");
    assert!(body.error.contains("gif"), "{}", body.error);
    assert_eq!(app.intake_entries(), 0);
    assert_eq!(app.output_entries(), 0);
}

#[tokio::test]
async fn unsupported_source_type_is_rejected() {
    let app = setup(None).await;

    let resp = app
        .server
        .post("/api/convert")
        .multipart(form(Some(image_part(b"GIF89a....".to_vec(), "a.gif", "image/gif")), Some("png")))
        .await;

    assert_eq!(resp.status_code(), 400);
    let body: ErrorResponse = resp.json();
    assert_eq!(body.code, "unsupported_source_type");
}

#[tokio::test]
async fn non_multipart_body_is_malformed() {
    let app = setup(None).await;

    let resp = app
        .server
        .post("/api/convert")
        .json(&serde_json::json!({ "format": "png" }))
        .await;

    assert_eq!(resp.status_code(), 400);
    let body: ErrorResponse = resp.json();
    assert_eq!(body.code, "malformed_upload");
}

// ── Server errors ────────────────────────────────────────────────────────────

#[tokio::test]
async fn mislabelled_upload_is_500_and_cleaned_up() {
    let app = setup(None).await;

    let resp = app
        .server
        .post("/api/convert")
        .multipart(form(Some(image_part(png(10, 10), "a.jpg", "image/jpeg")), Some("png")))
        .await;

    assert_eq!(resp.status_code(), 500);
    let body: ErrorResponse = resp.json();
    assert_eq!(body.code, "decode_error");
    assert_eq!(body.error, GENERIC_FAILURE_MESSAGE);
    assert_eq!(app.intake_entries(), 0);
    assert_eq!(app.output_entries(), 0);
}
