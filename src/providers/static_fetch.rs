use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Proxy};
use tracing::debug;
use url::Url;

use super::{http_error, with_timeout, RetrievalProvider};
use crate::content::{RetrievedContent, Strategy};
use crate::error::{ConfigError, RetrievalError};

/// Plain HTTP GET, no script execution.
pub struct StaticFetchProvider {
    clients: Vec<Client>,
    next: AtomicUsize,
}

impl StaticFetchProvider {
    /// One client per proxy endpoint, used round-robin. No proxies means a
    /// single direct client.
    pub fn new(user_agent: &str, proxies: &[String]) -> Result<Self, ConfigError> {
        let clients = if proxies.is_empty() {
            vec![build_client(user_agent, None)?]
        } else {
            proxies
                .iter()
                .map(|proxy| build_client(user_agent, Some(proxy)))
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(Self {
            clients,
            next: AtomicUsize::new(0),
        })
    }

    fn pick_client(&self) -> &Client {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        &self.clients[index]
    }
}

fn build_client(user_agent: &str, proxy: Option<&String>) -> Result<Client, ConfigError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    let mut builder = Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .cookie_store(true);
    if let Some(proxy) = proxy {
        let proxy = Proxy::all(proxy.as_str()).map_err(|e| ConfigError::Invalid {
            key: "JOBDESC_PROXIES",
            message: format!("{}: {}", proxy, e),
        })?;
        builder = builder.proxy(proxy);
    }
    builder.build().map_err(|e| ConfigError::Invalid {
        key: "JOBDESC_USER_AGENT",
        message: e.to_string(),
    })
}

/// Cloudflare marks interstitials with `cf-mitigated: challenge`.
fn is_challenge(headers: &HeaderMap) -> bool {
    headers
        .get("cf-mitigated")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("challenge"))
        .unwrap_or(false)
}

#[async_trait]
impl RetrievalProvider for StaticFetchProvider {
    fn strategy(&self) -> Strategy {
        Strategy::Static
    }

    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<RetrievedContent, RetrievalError> {
        let client = self.pick_client();
        with_timeout(url, timeout, async {
            let response = client
                .get(url.clone())
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| http_error(url, timeout, e))?;

            let status = response.status().as_u16();
            let challenge = is_challenge(response.headers());
            let body = response.text().await.map_err(|e| http_error(url, timeout, e))?;
            debug!(%url, status, challenge, bytes = body.len(), "static fetch complete");

            Ok(RetrievedContent::html(url.as_str(), Strategy::Static, body)
                .with_status(status)
                .with_challenge(challenge))
        })
        .await
    }
}
