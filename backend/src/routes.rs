use actix_files::Files;
use actix_multipart::{Multipart, MultipartError};
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use futures::TryStreamExt;
use log::{error, info, warn};
use std::path::PathBuf;

use crate::inference::normalizer::RawImage;
use crate::inference::service::{InferenceService, ServiceError};
use shared::{ErrorResponse, HealthResponse, PredictionResponse, StatusResponse};

/// Multipart field the client puts the image in.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Clone)]
pub struct RouteConfig {
    pub frontend_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Copy)]
struct UploadLimits {
    max_bytes: usize,
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(ErrorResponse::new(self.kind(), self.to_string()))
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, config: RouteConfig) {
    cfg.app_data(web::Data::new(UploadLimits {
        max_bytes: config.max_upload_bytes,
    }))
    .service(web::resource("/").route(web::get().to(root)))
    .service(web::resource("/health").route(web::get().to(health)))
    .service(web::resource("/predict").route(web::post().to(predict)));

    match config.frontend_dir {
        Some(dir) if dir.is_dir() => {
            info!("Serving frontend from {}", dir.display());
            cfg.service(Files::new("/static", dir).index_file("index.html"));
        }
        Some(dir) => warn!("Frontend directory {} not found, not serving it", dir.display()),
        None => {}
    }
}

async fn root(service: web::Data<InferenceService>) -> HttpResponse {
    HttpResponse::Ok().json(StatusResponse {
        message: "Deepfake Detection API".to_string(),
        status: "running".to_string(),
        model_loaded: service.is_ready(),
    })
}

async fn health(service: web::Data<InferenceService>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: service.health().ready,
    })
}

async fn predict(
    service: web::Data<InferenceService>,
    limits: web::Data<UploadLimits>,
    payload: Multipart,
) -> Result<HttpResponse, ServiceError> {
    service.ensure_ready()?;

    let image = read_upload(payload, limits.max_bytes).await.map_err(|e| {
        warn!("Rejected upload: {}", e);
        e
    })?;

    let result = web::block(move || service.predict(&image))
        .await
        .map_err(|e| ServiceError::Processing(e.to_string()))
        .and_then(|outcome| outcome)
        .map_err(|e| {
            error!("Prediction failed: {}", e);
            e
        })?;

    info!(
        "Predicted {} with confidence {:.2}%",
        result.label, result.confidence
    );
    Ok(HttpResponse::Ok().json(PredictionResponse::from(result)))
}

/// Reads the `file` field of the form, enforcing the upload size limit.
async fn read_upload(mut payload: Multipart, max_bytes: usize) -> Result<RawImage, ServiceError> {
    while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(|mime| mime.to_string());
        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(malformed)? {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(ServiceError::InvalidInput(format!(
                    "File too large. Maximum size is {} bytes.",
                    max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(ServiceError::InvalidInput("Uploaded file is empty.".to_string()));
        }
        return Ok(RawImage::new(bytes, content_type));
    }

    Err(ServiceError::InvalidInput(format!(
        "No file uploaded. Send the image in the '{}' form field.",
        UPLOAD_FIELD
    )))
}

fn malformed(e: MultipartError) -> ServiceError {
    ServiceError::InvalidInput(format!("Malformed upload: {}", e))
}
