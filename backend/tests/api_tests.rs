use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::{ArrayView4, Axis};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use dfdetect::config::ResizeMethod;
use dfdetect::inference::model::{InputSize, ModelError, ScoringModel};
use dfdetect::inference::registry::LoadedModel;
use dfdetect::inference::service::InferenceService;
use dfdetect::routes::{configure_routes, RouteConfig};
use shared::{ErrorResponse, HealthResponse, Label, PredictionResponse, StatusResponse};

const BOUNDARY: &str = "dfdetect-test-boundary";

struct FixedScore(f32);

impl ScoringModel for FixedScore {
    fn input_size(&self) -> InputSize {
        InputSize::new(8, 8)
    }

    fn score_batch(&self, batch: ArrayView4<'_, f32>) -> Result<Vec<f32>, ModelError> {
        Ok(vec![self.0; batch.len_of(Axis(0))])
    }
}

fn ready_service(score: f32) -> InferenceService {
    InferenceService::with_model(
        LoadedModel {
            path: PathBuf::from("models/fixed.pt"),
            model: Arc::new(FixedScore(score)),
        },
        ResizeMethod::Bicubic,
    )
}

fn routes(max_upload_bytes: usize) -> RouteConfig {
    RouteConfig {
        frontend_dir: None,
        max_upload_bytes,
    }
}

fn png_bytes() -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 12, Rgb([120, 30, 200])));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn multipart_body(field: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload(field: &str, content_type: &str, data: &[u8]) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/predict")
        .insert_header((
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_body(field, content_type, data))
}

#[actix_web::test]
async fn root_and_health_report_unloaded_model() {
    let service = web::Data::new(InferenceService::new(ResizeMethod::Bicubic));
    let app = test::init_service(
        App::new()
            .app_data(service)
            .configure(|cfg| configure_routes(cfg, routes(1024 * 1024))),
    )
    .await;

    let req = test::TestRequest::get().uri("/").to_request();
    let status: StatusResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(status.status, "running");
    assert_eq!(status.message, "Deepfake Detection API");
    assert!(!status.model_loaded);

    let req = test::TestRequest::get().uri("/health").to_request();
    let health: HealthResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(health.status, "healthy");
    assert!(!health.model_loaded);
}

#[actix_web::test]
async fn health_reports_loaded_model() {
    let service = web::Data::new(ready_service(0.7));
    let app = test::init_service(
        App::new()
            .app_data(service)
            .configure(|cfg| configure_routes(cfg, routes(1024 * 1024))),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let health: HealthResponse = test::call_and_read_body_json(&app, req).await;
    assert!(health.model_loaded);
}

#[actix_web::test]
async fn predict_without_model_is_unavailable() {
    let service = web::Data::new(InferenceService::new(ResizeMethod::Bicubic));
    let app = test::init_service(
        App::new()
            .app_data(service)
            .configure(|cfg| configure_routes(cfg, routes(1024 * 1024))),
    )
    .await;

    let resp = test::call_service(&app, upload("file", "image/png", &png_bytes()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert!(!body.success);
    assert_eq!(body.error, "service_unavailable");
    assert_eq!(body.detail, "Model not loaded");
}

#[actix_web::test]
async fn predict_returns_verdict() {
    let service = web::Data::new(ready_service(0.95));
    let app = test::init_service(
        App::new()
            .app_data(service)
            .configure(|cfg| configure_routes(cfg, routes(1024 * 1024))),
    )
    .await;

    let resp = test::call_service(&app, upload("file", "image/png", &png_bytes()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: PredictionResponse = test::read_body_json(resp).await;
    assert!(body.success);
    assert_eq!(body.prediction, Label::Real);
    assert_eq!(body.confidence, 95.0);
    assert_eq!(body.raw_score, 0.95);
    assert!(!body.details.is_fake);
    assert_eq!(body.details.real_probability, 95.0);
    assert_eq!(body.details.fake_probability, 5.0);
}

#[actix_web::test]
async fn predict_boundary_score_is_fake() {
    let service = web::Data::new(ready_service(0.5));
    let app = test::init_service(
        App::new()
            .app_data(service)
            .configure(|cfg| configure_routes(cfg, routes(1024 * 1024))),
    )
    .await;

    let req = upload("file", "image/png", &png_bytes()).to_request();
    let body: PredictionResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.prediction, Label::Fake);
    assert_eq!(body.confidence, 50.0);
    assert!(body.details.is_fake);
}

#[actix_web::test]
async fn non_image_upload_is_rejected() {
    let service = web::Data::new(ready_service(0.95));
    let app = test::init_service(
        App::new()
            .app_data(service)
            .configure(|cfg| configure_routes(cfg, routes(1024 * 1024))),
    )
    .await;

    let resp = test::call_service(&app, upload("file", "text/plain", b"hello").to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.error, "invalid_input");
}

#[actix_web::test]
async fn missing_file_field_is_rejected() {
    let service = web::Data::new(ready_service(0.95));
    let app = test::init_service(
        App::new()
            .app_data(service)
            .configure(|cfg| configure_routes(cfg, routes(1024 * 1024))),
    )
    .await;

    let resp = test::call_service(&app, upload("photo", "image/png", &png_bytes()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn oversized_upload_is_rejected() {
    let service = web::Data::new(ready_service(0.95));
    let app = test::init_service(
        App::new()
            .app_data(service)
            .configure(|cfg| configure_routes(cfg, routes(16))),
    )
    .await;

    let resp = test::call_service(&app, upload("file", "image/png", &png_bytes()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert!(body.detail.contains("too large"));
}

#[actix_web::test]
async fn undecodable_image_fails_without_breaking_the_service() {
    let service = web::Data::new(ready_service(0.05));
    let app = test::init_service(
        App::new()
            .app_data(service)
            .configure(|cfg| configure_routes(cfg, routes(1024 * 1024))),
    )
    .await;

    let resp = test::call_service(&app, upload("file", "image/png", b"not really a png").to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.error, "processing_error");
    assert!(body.detail.starts_with("Error processing image"));

    let req = upload("file", "image/png", &png_bytes()).to_request();
    let body: PredictionResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.prediction, Label::Fake);
    assert_eq!(body.confidence, 95.0);
}

#[actix_web::test]
async fn serves_frontend_when_directory_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>dfdetect</html>").unwrap();

    let service = web::Data::new(InferenceService::new(ResizeMethod::Bicubic));
    let config = RouteConfig {
        frontend_dir: Some(dir.path().to_path_buf()),
        max_upload_bytes: 1024,
    };
    let app = test::init_service(
        App::new()
            .app_data(service)
            .configure(|cfg| configure_routes(cfg, config.clone())),
    )
    .await;

    let req = test::TestRequest::get().uri("/static/index.html").to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert_eq!(body, "<html>dfdetect</html>".as_bytes());
}
