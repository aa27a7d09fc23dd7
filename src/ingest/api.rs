use crate::channel::{Delivery, DeliveryChannel};
use crate::spool::SpoolStatus;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

/// Shared state for the ingest API
pub struct IngestState {
    pub channel: Arc<DeliveryChannel>,
    pub version: String,
    pub start_time: std::time::Instant,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub outcome: &'static str,
    pub bytes: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub uptime_seconds: u64,
    pub spool: SpoolStatus,
}

/// POST /v1/batches
pub async fn post_batch(
    State(state): State<Arc<IngestState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("batch body is empty".to_string()));
    }

    let bytes = body.len();
    match state.channel.send(body.to_vec()).await {
        Delivery::Sent => Ok((
            StatusCode::ACCEPTED,
            Json(IngestResponse {
                outcome: "sent",
                bytes,
            }),
        )),
        Delivery::Spooled => Ok((
            StatusCode::ACCEPTED,
            Json(IngestResponse {
                outcome: "spooled",
                bytes,
            }),
        )),
        Delivery::Dropped => Err(ApiError::Unavailable(
            "collector unreachable and spool cannot accept the batch".to_string(),
        )),
    }
}

/// GET /spool/status
pub async fn get_status(State(state): State<Arc<IngestState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        spool: state.channel.spool().status(),
    })
}

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
