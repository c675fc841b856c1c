//! Typed errors for retrieval and extraction.
//!
//! `RetrievalError` means the page was never obtained. `ExtractionFailure` means
//! it was obtained but the description is unusable. The two only meet in
//! `ScrapeError`, at the caller level.

use std::time::Duration;

use thiserror::Error;

use crate::content::Strategy;

/// Why a page was classified as a protection/challenge page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// Upstream answered with a non-2xx status.
    HttpStatus(u16),
    /// The provider itself flagged a challenge page.
    ProviderFlag,
    /// A known bot-protection signature appeared in the body.
    ChallengeMarker(String),
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockReason::HttpStatus(status) => write!(f, "HTTP status {}", status),
            BlockReason::ProviderFlag => f.write_str("challenge flagged by provider"),
            BlockReason::ChallengeMarker(marker) => write!(f, "challenge marker '{}'", marker),
        }
    }
}

/// Content-level failure: the page arrived but yielded no description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    #[error("blocked by protection layer via {strategy}: {reason}")]
    Blocked { strategy: Strategy, reason: BlockReason },

    #[error("description section not found via {strategy} (tried {})", .tried.join(" | "))]
    SectionNotFound { strategy: Strategy, tried: Vec<String> },

    #[error("description section empty via {strategy} (tried {})", .tried.join(" | "))]
    EmptyRegion { strategy: Strategy, tried: Vec<String> },
}

impl ExtractionFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionFailure::Blocked { .. } => "blocked",
            ExtractionFailure::SectionNotFound { .. } => "section_not_found",
            ExtractionFailure::EmptyRegion { .. } => "empty_region",
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            ExtractionFailure::Blocked { strategy, .. }
            | ExtractionFailure::SectionNotFound { strategy, .. }
            | ExtractionFailure::EmptyRegion { strategy, .. } => *strategy,
        }
    }
}

/// Transport-level failure: the page could not be obtained at all.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("timed out after {}s fetching {url}", .after.as_secs_f64())]
    Timeout { url: String, after: Duration },

    #[error("transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("unexpected response for {url}: {message}")]
    Protocol { url: String, message: String },
}

impl RetrievalError {
    pub fn transport(
        url: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        RetrievalError::Transport {
            url: url.into(),
            source: source.into(),
        }
    }

    pub fn protocol(url: impl Into<String>, message: impl Into<String>) -> Self {
        RetrievalError::Protocol {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RetrievalError::Timeout { .. } => "timeout",
            _ => "transport",
        }
    }
}

/// Outcome of one caller-level scrape attempt.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Extraction(#[from] ExtractionFailure),

    #[error("no retrieval strategies configured")]
    NoProviders,
}

impl ScrapeError {
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Retrieval(e) => e.kind(),
            ScrapeError::Extraction(e) => e.kind(),
            ScrapeError::NoProviders => "transport",
        }
    }
}

/// Invalid CSS in a selector plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid selector '{selector}': {message}")]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}

/// Startup configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be set for the {strategy} strategy")]
    MissingKey { key: &'static str, strategy: Strategy },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error(transparent)]
    Strategy(#[from] crate::content::UnknownStrategy),

    #[error(transparent)]
    Selector(#[from] SelectorError),
}
