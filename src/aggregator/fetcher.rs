use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("bad response: {0}")]
    BadResponse(String),
}

/// Where listing pages come from. The production impl is [`HttpFetcher`];
/// aggregation tests drive the orchestrator with a stub instead.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Self {
        let client = Client::builder()
            .user_agent("MotoCatalog-Aggregator/1.0")
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build http client");

        Self { client }
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let parsed: reqwest::Url = url
            .parse()
            .map_err(|_| FetchError::InvalidUrl(url.to_string()))?;

        let res = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::BadResponse(format!("{} for {}", status, url)));
        }

        res.text()
            .await
            .map_err(|e| FetchError::BadResponse(e.to_string()))
    }
}
