use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Retrieval mode that produced a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    RenderedJs,
    #[serde(rename = "rendered-nojs")]
    RenderedNoJs,
    Static,
    ProxyRendered,
    CookieApi,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::RenderedJs => "rendered-js",
            Strategy::RenderedNoJs => "rendered-nojs",
            Strategy::Static => "static",
            Strategy::ProxyRendered => "proxy-rendered",
            Strategy::CookieApi => "cookie-api",
        }
    }

    /// Strategies that hand over markup before client-side scripts have run.
    pub fn skips_hydration(&self) -> bool {
        matches!(self, Strategy::Static | Strategy::RenderedNoJs)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown retrieval strategy '{0}'")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rendered-js" | "js" | "browser" => Ok(Strategy::RenderedJs),
            "rendered-nojs" | "nojs" => Ok(Strategy::RenderedNoJs),
            "static" => Ok(Strategy::Static),
            "proxy-rendered" | "proxy" => Ok(Strategy::ProxyRendered),
            "cookie-api" | "api" => Ok(Strategy::CookieApi),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

/// Page payload as handed over by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageBody {
    /// Serialized HTML document. Parsed into a DOM during extraction.
    Html(String),
    /// Raw HTML fragments the provider already cut out of the description region.
    Fragments(Vec<String>),
}

impl PageBody {
    /// Raw text used for challenge-marker sniffing.
    pub fn raw_text(&self) -> Cow<'_, str> {
        match self {
            PageBody::Html(html) => Cow::Borrowed(html),
            PageBody::Fragments(fragments) => Cow::Owned(fragments.join("\n")),
        }
    }
}

/// Output of a retrieval provider. The extraction pipeline only ever borrows it.
#[derive(Debug, Clone)]
pub struct RetrievedContent {
    pub url: String,
    pub body: PageBody,
    pub http_status: Option<u16>,
    pub strategy: Strategy,
    pub challenge_detected: bool,
    pub fetched_at: DateTime<Utc>,
}

impl RetrievedContent {
    pub fn html(url: impl Into<String>, strategy: Strategy, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: PageBody::Html(html.into()),
            http_status: None,
            strategy,
            challenge_detected: false,
            fetched_at: Utc::now(),
        }
    }

    pub fn fragments(url: impl Into<String>, strategy: Strategy, fragments: Vec<String>) -> Self {
        Self {
            url: url.into(),
            body: PageBody::Fragments(fragments),
            http_status: None,
            strategy,
            challenge_detected: false,
            fetched_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_challenge(mut self, detected: bool) -> Self {
        self.challenge_detected = detected;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strategy_aliases() {
        assert_eq!("static".parse::<Strategy>(), Ok(Strategy::Static));
        assert_eq!(" Proxy-Rendered ".parse::<Strategy>(), Ok(Strategy::ProxyRendered));
        assert_eq!("nojs".parse::<Strategy>(), Ok(Strategy::RenderedNoJs));
        assert!("carrier-pigeon".parse::<Strategy>().is_err());
    }

    #[test]
    fn serialized_names_match_display() {
        for strategy in [Strategy::RenderedNoJs, Strategy::CookieApi] {
            let value = serde_json::to_value(strategy).unwrap();
            assert_eq!(value, strategy.as_str());
        }
    }

    #[test]
    fn only_unrendered_strategies_skip_hydration() {
        assert!(Strategy::Static.skips_hydration());
        assert!(Strategy::RenderedNoJs.skips_hydration());
        assert!(!Strategy::RenderedJs.skips_hydration());
        assert!(!Strategy::CookieApi.skips_hydration());
    }

    #[test]
    fn fragments_join_for_marker_sniffing() {
        let body = PageBody::Fragments(vec!["one".into(), "two".into()]);
        assert_eq!(body.raw_text(), "one\ntwo");
        let html = PageBody::Html("<p>x</p>".into());
        assert!(matches!(html.raw_text(), Cow::Borrowed("<p>x</p>")));
    }
}
