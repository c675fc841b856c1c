//! Caller-level fallback across the provider chain.
//!
//! The pipeline judges one page. This layer decides whether a failure is
//! worth another strategy.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::content::Strategy;
use crate::error::{ConfigError, ExtractionFailure, ScrapeError};
use crate::pipeline::{extract_with, ExtractionResult};
use crate::providers::{build_providers, RetrievalProvider};
use crate::selectors::SelectorPlan;

/// A successful extraction, the strategy that produced it and when the page
/// was fetched.
#[derive(Debug, Clone)]
pub struct Summary {
    pub result: ExtractionResult,
    pub strategy: Strategy,
    pub fetched_at: DateTime<Utc>,
}

pub struct SummaryService {
    providers: Vec<Arc<dyn RetrievalProvider>>,
    plan: Option<SelectorPlan>,
    timeout: Duration,
}

impl SummaryService {
    pub fn new(providers: Vec<Arc<dyn RetrievalProvider>>, timeout: Duration) -> Self {
        Self {
            providers,
            plan: None,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(build_providers(config)?, config.timeout))
    }

    /// Use a custom selector plan instead of the job description ladder.
    pub fn with_plan(mut self, plan: SelectorPlan) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn plan(&self) -> &SelectorPlan {
        self.plan.as_ref().unwrap_or_else(|| SelectorPlan::job_description())
    }

    pub fn strategies(&self) -> Vec<Strategy> {
        self.providers.iter().map(|p| p.strategy()).collect()
    }

    /// Try each provider in order until one yields a description or a
    /// failure no later provider could fix.
    pub async fn summarize(&self, url: &Url) -> Result<Summary, ScrapeError> {
        let mut last_error = ScrapeError::NoProviders;

        for (attempt, provider) in self.providers.iter().enumerate() {
            let strategy = provider.strategy();
            let start = Instant::now();
            debug!(%url, %strategy, attempt, "fetching");

            let outcome = match provider.fetch(url, self.timeout).await {
                Ok(content) => extract_with(&content, self.plan())
                    .map(|result| (result, content.fetched_at))
                    .map_err(ScrapeError::from),
                Err(e) => Err(ScrapeError::from(e)),
            };
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match outcome {
                Ok((result, fetched_at)) => {
                    info!(
                        %url,
                        %strategy,
                        paragraphs = result.paragraphs().len(),
                        elapsed_ms,
                        "description extracted"
                    );
                    return Ok(Summary {
                        result,
                        strategy,
                        fetched_at,
                    });
                }
                Err(err) => {
                    let retry = should_fall_back(&err);
                    warn!(%url, %strategy, kind = err.kind(), elapsed_ms, retry, "attempt failed: {}", err);
                    last_error = err;
                    if !retry {
                        break;
                    }
                }
            }
        }

        Err(last_error)
    }
}

/// Transport failures and blocks may clear with another strategy. A missing
/// or empty section is only worth retrying when the page was never hydrated.
pub fn should_fall_back(err: &ScrapeError) -> bool {
    match err {
        ScrapeError::Retrieval(_) => true,
        ScrapeError::Extraction(ExtractionFailure::Blocked { .. }) => true,
        ScrapeError::Extraction(failure) => failure.strategy().skips_hydration(),
        ScrapeError::NoProviders => false,
    }
}
