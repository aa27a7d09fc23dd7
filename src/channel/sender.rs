use crate::config::types::CollectorConfig;
use async_trait::async_trait;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Collector returned error status {status}: {message}")]
    CollectorError { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, SendError>;

/// Something that can ship one opaque batch to the collector.
#[async_trait]
pub trait BatchSender: Send + Sync {
    async fn send(&self, payload: &[u8]) -> Result<()>;
}

/// POSTs batches to the configured collector URL.
#[derive(Debug)]
pub struct HttpSender {
    url: String,
    client: reqwest::Client,
    content_encoding: Option<String>,
}

impl HttpSender {
    pub fn new(config: &CollectorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            url: config.url.clone(),
            client,
            content_encoding: config.content_encoding.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl BatchSender for HttpSender {
    async fn send(&self, payload: &[u8]) -> Result<()> {
        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(payload.to_vec());
        if let Some(encoding) = &self.content_encoding {
            request = request.header(CONTENT_ENCODING, encoding.as_str());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SendError::CollectorError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}
