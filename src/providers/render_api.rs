use std::time::{Duration, Instant};

use async_trait::async_trait;
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::debug;
use url::Url;

use super::{with_timeout, RetrievalProvider};
use crate::content::{RetrievedContent, Strategy};
use crate::error::{ConfigError, RetrievalError};

/// Remote rendering through spider.cloud. The service runs the browser and
/// returns the rendered markup together with the upstream status.
pub struct RenderApiProvider {
    spider: Spider,
}

impl RenderApiProvider {
    pub fn new(api_key: &str) -> Result<Self, ConfigError> {
        let spider = Spider::new(Some(api_key.to_string())).map_err(|e| ConfigError::Invalid {
            key: "SPIDER_API_KEY",
            message: e.to_string(),
        })?;
        Ok(Self { spider })
    }
}

/// Rendered markup and upstream status pulled out of a spider.cloud payload.
#[derive(Debug, PartialEq, Eq)]
pub struct RenderedPage {
    pub html: String,
    pub status: Option<u16>,
}

/// The API answers with a JSON array, sometimes double-encoded as a string.
pub fn parse_render_payload(value: serde_json::Value) -> Result<RenderedPage, String> {
    let parsed: serde_json::Value = match value.as_str() {
        Some(s) => serde_json::from_str(s).unwrap_or(value.clone()),
        None => value,
    };

    let first = parsed
        .as_array()
        .and_then(|arr| arr.first())
        .ok_or_else(|| "empty response from rendering API".to_string())?;

    if let Some(error) = first.get("error").and_then(|e| e.as_str()) {
        if !error.is_empty() {
            return Err(error.to_string());
        }
    }

    let status = first
        .get("status")
        .and_then(|s| s.as_u64())
        .and_then(|s| u16::try_from(s).ok());

    let html = first
        .get("content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| "no content in rendering API response".to_string())?
        .to_string();

    Ok(RenderedPage { html, status })
}

#[async_trait]
impl RetrievalProvider for RenderApiProvider {
    fn strategy(&self) -> Strategy {
        Strategy::ProxyRendered
    }

    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<RetrievedContent, RetrievalError> {
        with_timeout(url, timeout, async {
            let params = RequestParams {
                return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Raw)),
                ..Default::default()
            };

            let start = Instant::now();
            let response = self
                .spider
                .scrape_url(url.as_str(), Some(params), "application/json")
                .await
                .map_err(|e| RetrievalError::transport(url.as_str(), e))?;
            let page = parse_render_payload(response)
                .map_err(|message| RetrievalError::protocol(url.as_str(), message))?;
            debug!(
                %url,
                status = ?page.status,
                latency_ms = start.elapsed().as_millis() as u64,
                "rendering API returned"
            );

            let mut content = RetrievedContent::html(url.as_str(), Strategy::ProxyRendered, page.html);
            content.http_status = page.status;
            Ok(content)
        })
        .await
    }
}
