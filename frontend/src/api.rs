use gloo_file::File as GlooFile;
use gloo_net::http::{Request, Response};
use shared::{ErrorResponse, HealthResponse, PredictionResponse};

pub const PREDICT_URL: &str = "/predict";
pub const HEALTH_URL: &str = "/health";

/// Posts `file` as the multipart `file` field and decodes the verdict.
pub async fn predict(file: &GlooFile) -> Result<PredictionResponse, String> {
    let form_data =
        web_sys::FormData::new().map_err(|e| format!("Failed to build form: {:?}", e))?;
    form_data
        .append_with_blob_and_filename("file", file.as_ref(), &file.name())
        .map_err(|e| format!("Failed to attach file: {:?}", e))?;

    let response = Request::post(PREDICT_URL)
        .body(form_data)
        .map_err(|e| format!("Failed to build request: {}", e))?
        .send()
        .await
        .map_err(|e| {
            format!(
                "Network error: {}. Please make sure the backend is running.",
                e
            )
        })?;

    if !response.ok() {
        return Err(error_detail(response).await);
    }
    response
        .json::<PredictionResponse>()
        .await
        .map_err(|e| format!("Failed to parse response: {}", e))
}

pub async fn fetch_health() -> Result<HealthResponse, String> {
    let response = Request::get(HEALTH_URL)
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;
    if !response.ok() {
        return Err(format!("Health check returned {}", response.status()));
    }
    response
        .json::<HealthResponse>()
        .await
        .map_err(|e| format!("Failed to parse health response: {}", e))
}

async fn error_detail(response: Response) -> String {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => body.detail,
        Err(_) => format!("Failed to analyze image (server returned {})", status),
    }
}
