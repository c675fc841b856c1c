//! Job posting description extraction.
//!
//! Providers fetch a posting page by some strategy; the pipeline classifies
//! the result, walks the selector fallback ladder and cleans the paragraphs.
//! `SummaryService` chains providers and decides when a failure is worth
//! another strategy.

pub mod api;
pub mod batch;
pub mod classify;
pub mod cleaning;
pub mod config;
pub mod content;
pub mod error;
pub mod pipeline;
pub mod providers;
pub mod selectors;
pub mod server;
pub mod service;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use content::{PageBody, RetrievedContent, Strategy};
pub use error::{BlockReason, ConfigError, ExtractionFailure, RetrievalError, ScrapeError};
pub use pipeline::{extract, extract_with, ExtractionResult};
pub use selectors::SelectorPlan;
pub use service::{Summary, SummaryService};
