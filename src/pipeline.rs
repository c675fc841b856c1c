//! Extraction pipeline: classification, selector fallback, cleaning.
//!
//! Synchronous and stateless. The DOM is parsed and dropped inside a single
//! call, so the pipeline can run on any thread.

use scraper::Html;

use crate::classify::{check_blocked, find_challenge_marker};
use crate::cleaning::{clean_fragments, clean_paragraphs, node_text};
use crate::content::{PageBody, RetrievedContent, Strategy};
use crate::error::{BlockReason, ExtractionFailure};
use crate::selectors::{locate, Located, SelectorPlan};

/// Ordered, non-empty description paragraphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    paragraphs: Vec<String>,
}

impl ExtractionResult {
    /// `None` for an empty list: empty extractions are failures.
    pub fn new(paragraphs: Vec<String>) -> Option<Self> {
        if paragraphs.is_empty() {
            None
        } else {
            Some(Self { paragraphs })
        }
    }

    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    pub fn into_paragraphs(self) -> Vec<String> {
        self.paragraphs
    }

    pub fn summary(&self) -> String {
        self.paragraphs.join("\n\n")
    }
}

/// Extract with the built-in job description plan.
pub fn extract(content: &RetrievedContent) -> Result<ExtractionResult, ExtractionFailure> {
    extract_with(content, SelectorPlan::job_description())
}

pub fn extract_with(
    content: &RetrievedContent,
    plan: &SelectorPlan,
) -> Result<ExtractionResult, ExtractionFailure> {
    check_blocked(content)?;

    match &content.body {
        PageBody::Html(html) => {
            let document = Html::parse_document(html);
            select_and_clean(&document, plan, content.strategy)
        }
        PageBody::Fragments(fragments) => {
            let tried = vec!["provider fragments".to_string()];
            if fragments.is_empty() {
                return Err(ExtractionFailure::SectionNotFound {
                    strategy: content.strategy,
                    tried,
                });
            }
            ExtractionResult::new(clean_fragments(fragments)).ok_or(
                ExtractionFailure::EmptyRegion {
                    strategy: content.strategy,
                    tried,
                },
            )
        }
    }
}

/// Extract from an already parsed document. A bare DOM carries no status or
/// provider flag, so only challenge markers are checked here.
pub fn extract_dom(
    document: &Html,
    plan: &SelectorPlan,
    strategy: Strategy,
) -> Result<ExtractionResult, ExtractionFailure> {
    if let Some(marker) = find_challenge_marker(&document.root_element().html()) {
        return Err(ExtractionFailure::Blocked {
            strategy,
            reason: BlockReason::ChallengeMarker(marker.to_string()),
        });
    }
    select_and_clean(document, plan, strategy)
}

fn select_and_clean(
    document: &Html,
    plan: &SelectorPlan,
    strategy: Strategy,
) -> Result<ExtractionResult, ExtractionFailure> {
    match locate(document, plan) {
        Located::Nodes { pair_index, nodes } => {
            let paragraphs = clean_paragraphs(nodes.iter().map(node_text));
            ExtractionResult::new(paragraphs).ok_or_else(|| ExtractionFailure::EmptyRegion {
                strategy,
                tried: plan.describe()[..=pair_index].to_vec(),
            })
        }
        Located::RegionMissing => Err(ExtractionFailure::SectionNotFound {
            strategy,
            tried: plan.describe(),
        }),
        Located::RegionEmpty => Err(ExtractionFailure::EmptyRegion {
            strategy,
            tried: plan.describe(),
        }),
    }
}
