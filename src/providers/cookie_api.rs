use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{AUTHORIZATION, COOKIE};
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{http_error, with_timeout, RetrievalProvider};
use crate::config::CookieApiConfig;
use crate::content::{RetrievedContent, Strategy};
use crate::error::{ConfigError, RetrievalError};

static JOB_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"~([0-9A-Za-z]+)").expect("JOB_KEY_RE should compile"));
static BLANK_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("BLANK_LINE_RE should compile"));

/// Authenticated JSON API that serves the posting description directly.
pub struct CookieApiProvider {
    client: Client,
    config: CookieApiConfig,
}

impl CookieApiProvider {
    pub fn new(config: CookieApiConfig) -> Result<Self, ConfigError> {
        let client = Client::builder().build().map_err(|e| ConfigError::Invalid {
            key: "JOBDESC_API_URL",
            message: e.to_string(),
        })?;
        Ok(Self { client, config })
    }

    fn endpoint_for(&self, url: &Url) -> Result<String, RetrievalError> {
        let key = job_key(url).ok_or_else(|| {
            RetrievalError::protocol(url.as_str(), "no job key (~cipher) in posting URL")
        })?;
        Ok(self.config.endpoint.replace("{job_key}", &key))
    }
}

/// Job postings carry their key as a `~`-prefixed path segment.
pub fn job_key(url: &Url) -> Option<String> {
    JOB_KEY_RE
        .captures(url.path())
        .and_then(|caps| caps.get(1))
        .map(|m| format!("~{}", m.as_str()))
}

/// Description text at `pointer`, split on blank lines into raw fragments.
/// A missing field yields no fragments.
pub fn description_fragments(payload: &serde_json::Value, pointer: &str) -> Vec<String> {
    payload
        .pointer(pointer)
        .and_then(|v| v.as_str())
        .map(|text| {
            let text = text.replace("\r\n", "\n");
            BLANK_LINE_RE.split(&text).map(str::to_string).collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl RetrievalProvider for CookieApiProvider {
    fn strategy(&self) -> Strategy {
        Strategy::CookieApi
    }

    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<RetrievedContent, RetrievalError> {
        let endpoint = self.endpoint_for(url)?;
        with_timeout(url, timeout, async {
            let mut request = self
                .client
                .get(&endpoint)
                .timeout(timeout)
                .header(AUTHORIZATION, format!("Bearer {}", self.config.token));
            if let Some(cookie) = &self.config.cookie {
                request = request.header(COOKIE, cookie);
            }

            let response = request.send().await.map_err(|e| http_error(url, timeout, e))?;
            let status = response.status().as_u16();
            debug!(%url, %endpoint, status, "job API responded");

            if !response.status().is_success() {
                // Body is usually an HTML block page; the status alone classifies it.
                return Ok(RetrievedContent::fragments(url.as_str(), Strategy::CookieApi, Vec::new())
                    .with_status(status));
            }

            let payload: serde_json::Value = response.json().await.map_err(|e| {
                RetrievalError::protocol(url.as_str(), format!("job API returned invalid JSON: {}", e))
            })?;
            let fragments = description_fragments(&payload, &self.config.description_pointer);
            Ok(RetrievedContent::fragments(url.as_str(), Strategy::CookieApi, fragments).with_status(status))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::PageBody;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    #[test]
    fn finds_job_key_in_posting_urls() {
        let url = Url::parse("https://www.upwork.com/jobs/Rust-developer_~01a2b3c4d5/?referrer=x").unwrap();
        assert_eq!(job_key(&url), Some("~01a2b3c4d5".to_string()));
        let bare = Url::parse("https://www.upwork.com/freelance-jobs/apply/Rust_~0199/").unwrap();
        assert_eq!(job_key(&bare), Some("~0199".to_string()));
        assert_eq!(job_key(&Url::parse("https://example.com/jobs/42").unwrap()), None);
    }

    #[test]
    fn splits_description_on_blank_lines() {
        let payload = json!({ "job": { "description": "Intro line\r\n\r\nWe use <b>Rust</b>.\n  \nApply &amp; win" } });
        assert_eq!(
            description_fragments(&payload, "/job/description"),
            vec!["Intro line", "We use <b>Rust</b>.", "Apply &amp; win"]
        );
        assert!(description_fragments(&payload, "/missing").is_empty());
    }

    fn api_config(base: &str) -> CookieApiConfig {
        CookieApiConfig {
            endpoint: format!("{}/api/jobs/{{job_key}}", base),
            token: "secret-token".into(),
            cookie: Some("session=abc".into()),
            description_pointer: "/description".into(),
        }
    }

    async fn spawn_api() -> String {
        let app = Router::new().route(
            "/api/jobs/:key",
            get(|axum::extract::Path(key): axum::extract::Path<String>, headers: HeaderMap| async move {
                let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
                let authorized = header("authorization").as_deref() == Some("Bearer secret-token")
                    && header("cookie").as_deref() == Some("session=abc");
                if !authorized {
                    return Err(StatusCode::UNAUTHORIZED);
                }
                Ok(Json(json!({ "key": key, "description": "First\n\nSecond" })))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn fetches_description_with_credentials() {
        let base = spawn_api().await;
        let provider = CookieApiProvider::new(api_config(&base)).unwrap();
        let url = Url::parse("https://www.upwork.com/jobs/~0123abc").unwrap();

        let content = provider.fetch(&url, Duration::from_secs(5)).await.unwrap();
        assert_eq!(content.http_status, Some(200));
        assert_eq!(content.body, PageBody::Fragments(vec!["First".into(), "Second".into()]));
    }

    #[tokio::test]
    async fn rejected_credentials_surface_as_status() {
        let base = spawn_api().await;
        let mut config = api_config(&base);
        config.token = "wrong".into();
        let provider = CookieApiProvider::new(config).unwrap();
        let url = Url::parse("https://www.upwork.com/jobs/~0123abc").unwrap();

        let content = provider.fetch(&url, Duration::from_secs(5)).await.unwrap();
        assert_eq!(content.http_status, Some(401));
    }

    #[tokio::test]
    async fn urls_without_job_key_are_protocol_errors() {
        let provider = CookieApiProvider::new(api_config("http://127.0.0.1:9")).unwrap();
        let url = Url::parse("https://example.com/careers/42").unwrap();
        assert!(matches!(
            provider.fetch(&url, Duration::from_secs(1)).await,
            Err(RetrievalError::Protocol { .. })
        ));
    }
}
