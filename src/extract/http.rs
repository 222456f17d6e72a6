// src/extract/http.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::Value;

use crate::config::PipelineConfig;
use crate::extract::types::ProductSource;

/// Live Fake Store listing over HTTP, with a browser-like header set and a bounded timeout.
pub struct HttpProductSource {
    url: String,
    client: reqwest::Client,
}

impl HttpProductSource {
    pub fn from_config(cfg: &PipelineConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&cfg.user_agent).context("invalid user_agent header")?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(&cfg.accept).context("invalid accept header")?,
        );

        let client = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .default_headers(headers)
            .build()
            .context("building http client")?;

        Ok(Self {
            url: cfg.products_url.clone(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ProductSource for HttpProductSource {
    async fn fetch_products(&self) -> Result<Value> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {}", self.url))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("GET {} returned {}", self.url, status);
        }

        let body = resp.text().await.context("products http .text()")?;
        serde_json::from_str(&body).context("products body is not valid JSON")
    }

    fn name(&self) -> &'static str {
        "fakestore-http"
    }
}
