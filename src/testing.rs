//! Test doubles for the provider chain.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::content::{RetrievedContent, Strategy};
use crate::error::RetrievalError;
use crate::providers::RetrievalProvider;

/// What a `MockProvider` answers with.
#[derive(Clone)]
pub enum CannedFetch {
    Html { html: String, status: u16 },
    Fragments(Vec<String>),
    Challenge { html: String, status: u16 },
    Timeout,
    Transport(String),
}

/// Provider that returns a canned answer and records the URLs it was asked for.
pub struct MockProvider {
    strategy: Strategy,
    answer: CannedFetch,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockProvider {
    pub fn new(strategy: Strategy, answer: CannedFetch) -> Self {
        Self {
            strategy,
            answer,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn html(strategy: Strategy, html: &str) -> Self {
        Self::new(
            strategy,
            CannedFetch::Html {
                html: html.to_string(),
                status: 200,
            },
        )
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl RetrievalProvider for MockProvider {
    fn strategy(&self) -> Strategy {
        self.strategy
    }

    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<RetrievedContent, RetrievalError> {
        self.calls.write().unwrap().push(url.to_string());
        match &self.answer {
            CannedFetch::Html { html, status } => {
                Ok(RetrievedContent::html(url.as_str(), self.strategy, html.clone()).with_status(*status))
            }
            CannedFetch::Fragments(fragments) => Ok(RetrievedContent::fragments(
                url.as_str(),
                self.strategy,
                fragments.clone(),
            )
            .with_status(200)),
            CannedFetch::Challenge { html, status } => Ok(RetrievedContent::html(
                url.as_str(),
                self.strategy,
                html.clone(),
            )
            .with_status(*status)
            .with_challenge(true)),
            CannedFetch::Timeout => Err(RetrievalError::Timeout {
                url: url.to_string(),
                after: timeout,
            }),
            CannedFetch::Transport(message) => {
                Err(RetrievalError::transport(url.as_str(), message.clone()))
            }
        }
    }
}

/// A posting page with the description in its usual section.
pub fn posting_html(paragraphs: &[&str]) -> String {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<p class=\"text-body-sm\">{}</p>", p))
        .collect();
    format!(
        "<html><head><title>Job</title></head><body>\
         <section data-test=\"job-description-section\">{}</section></body></html>",
        body
    )
}

/// A Cloudflare interstitial.
pub const CHALLENGE_HTML: &str = "<html><head><title>Just a moment...</title></head>\
    <body><div id=\"cf-browser-verification\"><p>Checking if the site connection is secure</p>\
    <p>Your IP: 203.0.113.9</p></div></body></html>";
