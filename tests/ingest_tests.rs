use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use telemetry_spool::channel::{BatchSender, DeliveryChannel, SendError};
use telemetry_spool::config::{DrainConfig, SpoolConfig};
use telemetry_spool::ingest::{router, IngestState};
use telemetry_spool::spool::Spool;
use tempfile::TempDir;
use tower::ServiceExt;

#[derive(Default)]
struct SwitchableSender {
    down: AtomicBool,
}

#[async_trait]
impl BatchSender for SwitchableSender {
    async fn send(&self, _payload: &[u8]) -> Result<(), SendError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(SendError::CollectorError {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }
        Ok(())
    }
}

fn state(dir: &TempDir, capacity: usize) -> (Arc<IngestState>, Arc<SwitchableSender>) {
    let spool = Arc::new(Spool::open(&SpoolConfig::new(dir.path(), capacity)).unwrap());
    let sender = Arc::new(SwitchableSender::default());
    let channel = DeliveryChannel::new(sender.clone(), spool, DrainConfig::default());
    let state = Arc::new(IngestState {
        channel: Arc::new(channel),
        version: "test".to_string(),
        start_time: Instant::now(),
    });
    (state, sender)
}

fn post(body: &'static [u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/batches")
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_post_batch_sent_live() {
    let dir = TempDir::new().unwrap();
    let (state, _sender) = state(&dir, 10);

    let response = router(state.clone()).oneshot(post(b"payload")).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let body = json_body(response).await;
    assert_eq!(body["outcome"], "sent");
    assert_eq!(body["bytes"], 7);
    assert!(state.channel.spool().is_empty());
}

#[tokio::test]
async fn test_post_batch_spooled_during_outage() {
    let dir = TempDir::new().unwrap();
    let (state, sender) = state(&dir, 10);
    sender.down.store(true, Ordering::SeqCst);

    let response = router(state.clone()).oneshot(post(b"payload")).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(response).await["outcome"], "spooled");
    assert_eq!(state.channel.spool().len(), 1);
}

#[tokio::test]
async fn test_post_batch_unavailable_when_spool_full() {
    let dir = TempDir::new().unwrap();
    let (state, sender) = state(&dir, 1);
    sender.down.store(true, Ordering::SeqCst);

    let first = router(state.clone()).oneshot(post(b"one")).await.unwrap();
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let second = router(state.clone()).oneshot(post(b"two")).await.unwrap();
    assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(json_body(second).await["error"].is_string());
}

#[tokio::test]
async fn test_post_empty_batch_rejected() {
    let dir = TempDir::new().unwrap();
    let (state, _sender) = state(&dir, 10);

    let response = router(state).oneshot(post(b"")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_spool_status_reports_backlog() {
    let dir = TempDir::new().unwrap();
    let (state, sender) = state(&dir, 10);
    sender.down.store(true, Ordering::SeqCst);

    for _ in 0..3 {
        router(state.clone()).oneshot(post(b"payload")).await.unwrap();
    }

    let request = Request::builder()
        .uri("/spool/status")
        .body(Body::empty())
        .unwrap();
    let response = router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["version"], "test");
    assert_eq!(body["spool"]["queued"], 3);
    assert_eq!(body["spool"]["capacity"], 10);
    assert_eq!(body["spool"]["stats"]["written"], 3);
    assert!(body["spool"]["oldest_batch"].is_string());
}

#[tokio::test]
async fn test_health_check() {
    let dir = TempDir::new().unwrap();
    let (state, _sender) = state(&dir, 10);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
