use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetScriptExecutionDisabledParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use super::{with_timeout, RetrievalProvider, HYDRATION_SELECTOR};
use crate::content::{RetrievedContent, Strategy};
use crate::error::RetrievalError;

const LAUNCH_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-blink-features=AutomationControlled",
    "--lang=en-US",
    "--window-size=1280,900",
];

const STEALTH_JS: &str = r#"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
    window.chrome = { runtime: {} };
    Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
    Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
"#;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Aborts the CDP handler task however the fetch ends.
struct HandlerTask(JoinHandle<()>);

impl Drop for HandlerTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Headless Chromium, one browser per request.
pub struct BrowserProvider {
    javascript: bool,
    user_agent: String,
    settle: Duration,
}

impl BrowserProvider {
    pub fn new(javascript: bool, user_agent: &str, settle: Duration) -> Self {
        Self {
            javascript,
            user_agent: user_agent.to_string(),
            settle,
        }
    }

    fn strategy_tag(&self) -> Strategy {
        if self.javascript {
            Strategy::RenderedJs
        } else {
            Strategy::RenderedNoJs
        }
    }

    async fn render(&self, url: &Url, timeout: Duration) -> Result<RetrievedContent, RetrievalError> {
        let config = BrowserConfig::builder()
            .args(LAUNCH_ARGS.iter().copied())
            .arg(format!("--user-agent={}", self.user_agent))
            .build()
            .map_err(|e| RetrievalError::protocol(url.as_str(), format!("browser config: {}", e)))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RetrievalError::transport(url.as_str(), e))?;
        let _handler = HandlerTask(tokio::spawn(async move {
            while handler.next().await.is_some() {}
        }));

        // On timeout this future is dropped mid-load; dropping `Browser` kills
        // the child process and `HandlerTask` stops the event loop.
        let outcome = self.load(&browser, url, timeout).await;

        if let Err(e) = browser.close().await {
            warn!(%url, "closing browser failed: {}", e);
        }
        outcome
    }

    async fn load(&self, browser: &Browser, url: &Url, timeout: Duration) -> Result<RetrievedContent, RetrievalError> {
        let cdp = |e: chromiumoxide::error::CdpError| RetrievalError::transport(url.as_str(), e);

        let page = browser.new_page("about:blank").await.map_err(cdp)?;
        if self.javascript {
            page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_JS))
                .await
                .map_err(cdp)?;
        } else {
            page.execute(SetScriptExecutionDisabledParams::new(true))
                .await
                .map_err(cdp)?;
        }

        page.goto(url.as_str()).await.map_err(cdp)?;
        tokio::time::sleep(self.settle).await;
        if self.javascript {
            wait_for_hydration(&page, timeout / 2).await;
        }

        let title = page.get_title().await.map_err(cdp)?.unwrap_or_default();
        let html = page.content().await.map_err(cdp)?;
        debug!(%url, %title, bytes = html.len(), "browser render complete");

        Ok(RetrievedContent::html(url.as_str(), self.strategy_tag(), html)
            .with_challenge(title.starts_with("Just a moment")))
    }
}

/// Poll until the description section exists. Giving up is not an error:
/// the pipeline decides what an unhydrated page means.
async fn wait_for_hydration(page: &Page, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if page.find_element(HYDRATION_SELECTOR).await.is_ok() {
            return;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    debug!("description section never hydrated");
}

#[async_trait]
impl RetrievalProvider for BrowserProvider {
    fn strategy(&self) -> Strategy {
        self.strategy_tag()
    }

    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<RetrievedContent, RetrievalError> {
        with_timeout(url, timeout, self.render(url, timeout)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;

    #[tokio::test]
    async fn dropping_handler_task_aborts_event_loop() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = HandlerTask(tokio::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        }));
        drop(task);
        assert!(rx.await.is_err());
    }

    async fn spawn_slow_upstream() -> Url {
        let app = Router::new().route(
            "/jobs/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "late"
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{}/jobs/slow", addr)).unwrap()
    }

    #[tokio::test]
    #[ignore = "needs a local Chromium"]
    async fn timed_out_render_releases_browser() {
        let url = spawn_slow_upstream().await;
        let provider = BrowserProvider::new(true, "jobdesc-test", Duration::from_millis(0));

        let err = provider.fetch(&url, Duration::from_secs(3)).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Timeout { .. }));

        // Second attempt launches a fresh browser on the same profile directory.
        let again = provider.fetch(&url, Duration::from_secs(3)).await.unwrap_err();
        assert!(matches!(again, RetrievalError::Timeout { .. }));
    }
}
