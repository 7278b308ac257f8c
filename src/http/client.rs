use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Client, Url};
use std::time::{Duration, Instant};

use crate::config::HttpConfig;
use crate::error::{CadError, Result};

use super::request::CadQuery;
use super::response::ApiResponse;

/// GET-only client bound to one close-approach endpoint.
#[derive(Debug, Clone)]
pub struct CadClient {
    client: Client,
    base_url: Url,
}

impl CadClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|err| CadError::Config(format!("Invalid base URL: {err}")))?;

        let mut builder = Client::builder().redirect(reqwest::redirect::Policy::limited(10));
        if config.timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(config.timeout_ms));
        }

        let client = builder
            .build()
            .map_err(|err| CadError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn url_for(&self, query: &CadQuery) -> Url {
        let mut url = self.base_url.clone();
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.params() {
                pairs.append_pair(key, value);
            }
        }
        url
    }

    pub async fn get(&self, query: &CadQuery) -> Result<ApiResponse> {
        query.validate()?;
        let url = self.url_for(query);

        let started = Instant::now();
        let response = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let elapsed = started.elapsed().as_millis() as u64;

        tracing::debug!(status, elapsed_ms = elapsed, size = bytes.len(), "close-approach response");

        Ok(ApiResponse {
            status,
            duration_ms: elapsed,
            size_bytes: bytes.len(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    /// Status-only call used by load workers.
    pub async fn get_status(&self, query: &CadQuery) -> Result<u16> {
        Ok(self.get(query).await?.status)
    }
}
