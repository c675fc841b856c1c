//! Wire types for the summary endpoint and the `fetch` command.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::content::Strategy;
use crate::error::ScrapeError;
use crate::service::Summary;

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryRequest {
    pub apply_url: Url,
    #[serde(default)]
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub job_id: Option<String>,
    pub apply_url: String,
    pub summary: String,
    pub paragraphs: Vec<String>,
    pub strategy: Strategy,
    pub fetched_at: DateTime<Utc>,
}

impl SummaryResponse {
    pub fn new(request: &SummaryRequest, summary: Summary) -> Self {
        Self {
            job_id: request.job_id.clone(),
            apply_url: request.apply_url.to_string(),
            summary: summary.result.summary(),
            paragraphs: summary.result.into_paragraphs(),
            strategy: summary.strategy,
            fetched_at: summary.fetched_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: String,
}

impl From<&ScrapeError> for ErrorResponse {
    fn from(err: &ScrapeError) -> Self {
        Self {
            error: err.kind().to_string(),
            detail: err.to_string(),
        }
    }
}
