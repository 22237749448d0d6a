use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use tracing::error;

use buddy_types::api::{AnalyzeImageRequest, Claims, ThumbnailRequest, ThumbnailResponse, ToolAnalysis};

use crate::auth::AppState;

/// 10 MB cap on the decoded image payload forwarded upstream.
const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Client for the hosted multimodal-model endpoints. Both calls are plain
/// proxies: the heavy lifting happens upstream.
pub struct AnalysisClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl AnalysisClient {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> anyhow::Result<Resp>
    where
        Req: serde::Serialize,
        Resp: serde::de::DeserializeOwned,
    {
        let mut req = self
            .http
            .post(format!("{}/{}", self.base_url.trim_end_matches('/'), path))
            .json(body);

        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn analyze_tool_image(&self, image_base64: &str) -> anyhow::Result<ToolAnalysis> {
        self.post_json(
            "analyze-tool-image",
            &serde_json::json!({ "image_base64": image_base64 }),
        )
        .await
    }

    pub async fn generate_thumbnails(
        &self,
        image_path: &str,
        bucket: &str,
    ) -> anyhow::Result<ThumbnailResponse> {
        self.post_json(
            "generate-thumbnails",
            &serde_json::json!({ "imagePath": image_path, "bucket": bucket }),
        )
        .await
    }
}

/// POST /analysis/tool-image — base64 photo in, structured tool metadata out.
pub async fn analyze_tool_image(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<AnalyzeImageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let client = state
        .analysis
        .as_ref()
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    // Validate the payload before burning an upstream call
    let decoded = B64
        .decode(&req.image_base64)
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    if decoded.is_empty() || decoded.len() > MAX_IMAGE_SIZE {
        return Err(StatusCode::BAD_REQUEST);
    }

    let analysis = client
        .analyze_tool_image(&req.image_base64)
        .await
        .map_err(|e| {
            error!("Image analysis upstream error: {}", e);
            StatusCode::BAD_GATEWAY
        })?;

    Ok(Json(analysis))
}

/// POST /analysis/thumbnails — returns size-keyed URLs for a stored image.
pub async fn generate_thumbnails(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<ThumbnailRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let client = state
        .analysis
        .as_ref()
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    if req.image_path.is_empty() || req.bucket.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let thumbs = client
        .generate_thumbnails(&req.image_path, &req.bucket)
        .await
        .map_err(|e| {
            error!("Thumbnail upstream error: {}", e);
            StatusCode::BAD_GATEWAY
        })?;

    Ok(Json(thumbs))
}
