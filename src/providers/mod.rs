//! Retrieval providers: every strategy that can turn a URL into page content.
//!
//! Providers differ only in how they decide content is final. They all hand
//! back a `RetrievedContent` and leave extraction to the pipeline.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::Config;
use crate::content::{RetrievedContent, Strategy};
use crate::error::{ConfigError, RetrievalError};

#[cfg(feature = "browser")]
pub mod browser;
pub mod cookie_api;
pub mod render_api;
pub mod static_fetch;

#[cfg(feature = "browser")]
pub use browser::BrowserProvider;
pub use cookie_api::CookieApiProvider;
pub use render_api::RenderApiProvider;
pub use static_fetch::StaticFetchProvider;

/// Region the rendering providers wait for before calling a page final.
pub const HYDRATION_SELECTOR: &str = "section[data-test='job-description-section']";

#[async_trait]
pub trait RetrievalProvider: Send + Sync {
    fn strategy(&self) -> Strategy;

    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<RetrievedContent, RetrievalError>;
}

/// Bound a provider future by `timeout`. Dropping the future on expiry
/// releases whatever it holds.
pub(crate) async fn with_timeout<F>(
    url: &Url,
    timeout: Duration,
    fut: F,
) -> Result<RetrievedContent, RetrievalError>
where
    F: Future<Output = Result<RetrievedContent, RetrievalError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| RetrievalError::Timeout {
            url: url.to_string(),
            after: timeout,
        })?
}

/// Map a reqwest failure, keeping client-side timeouts distinguishable.
pub(crate) fn http_error(url: &Url, timeout: Duration, err: reqwest::Error) -> RetrievalError {
    if err.is_timeout() {
        RetrievalError::Timeout {
            url: url.to_string(),
            after: timeout,
        }
    } else {
        RetrievalError::transport(url.as_str(), err)
    }
}

/// Build the provider chain in the configured order.
pub fn build_providers(config: &Config) -> Result<Vec<Arc<dyn RetrievalProvider>>, ConfigError> {
    config
        .strategies
        .iter()
        .map(|strategy| build_provider(*strategy, config))
        .collect()
}

fn build_provider(strategy: Strategy, config: &Config) -> Result<Arc<dyn RetrievalProvider>, ConfigError> {
    match strategy {
        Strategy::Static => Ok(Arc::new(StaticFetchProvider::new(
            &config.user_agent,
            &config.proxies,
        )?)),
        Strategy::ProxyRendered => {
            let key = config.spider_api_key.as_deref().ok_or(ConfigError::MissingKey {
                key: "SPIDER_API_KEY",
                strategy,
            })?;
            Ok(Arc::new(RenderApiProvider::new(key)?))
        }
        Strategy::CookieApi => {
            let api = config.api.as_ref().ok_or(ConfigError::MissingKey {
                key: "JOBDESC_API_URL",
                strategy,
            })?;
            Ok(Arc::new(CookieApiProvider::new(api.clone())?))
        }
        Strategy::RenderedJs | Strategy::RenderedNoJs => browser_provider(strategy, config),
    }
}

#[cfg(feature = "browser")]
fn browser_provider(strategy: Strategy, config: &Config) -> Result<Arc<dyn RetrievalProvider>, ConfigError> {
    Ok(Arc::new(BrowserProvider::new(
        strategy == Strategy::RenderedJs,
        &config.user_agent,
        config.settle,
    )))
}

#[cfg(not(feature = "browser"))]
fn browser_provider(strategy: Strategy, _config: &Config) -> Result<Arc<dyn RetrievalProvider>, ConfigError> {
    Err(ConfigError::Invalid {
        key: "JOBDESC_STRATEGIES",
        message: format!("{} needs a build with the `browser` feature", strategy),
    })
}
