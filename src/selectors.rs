use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::error::SelectorError;

/// Fallback ladder for job-description paragraphs, most specific first.
/// `None` as region means the whole document.
pub const JOB_DESCRIPTION_PAIRS: &[(Option<&str>, &str)] = &[
    (Some("section[data-test='job-description-section']"), "p.text-body-sm"),
    (Some("section[data-test='job-description-section']"), "p"),
    (Some(".job-description, #job-description, .job-details, #job-details"), "p"),
    (None, "p"),
];

static JOB_DESCRIPTION_PLAN: LazyLock<SelectorPlan> = LazyLock::new(|| {
    SelectorPlan::from_pairs(JOB_DESCRIPTION_PAIRS.iter().copied())
        .expect("built-in job description selectors should parse")
});

fn parse_selector(css: &str) -> Result<Selector, SelectorError> {
    Selector::parse(css).map_err(|e| SelectorError {
        selector: css.to_string(),
        message: e.to_string(),
    })
}

#[derive(Debug)]
pub enum Region {
    Document,
    Named { css: String, selector: Selector },
}

/// One rung of the ladder: where to look and what counts as a paragraph there.
#[derive(Debug)]
pub struct SelectorPair {
    region: Region,
    paragraph_css: String,
    paragraph: Selector,
}

impl SelectorPair {
    pub fn new(region: Option<&str>, paragraph: &str) -> Result<Self, SelectorError> {
        let region = match region {
            Some(css) => Region::Named {
                css: css.to_string(),
                selector: parse_selector(css)?,
            },
            None => Region::Document,
        };
        Ok(Self {
            region,
            paragraph_css: paragraph.to_string(),
            paragraph: parse_selector(paragraph)?,
        })
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn describe(&self) -> String {
        match &self.region {
            Region::Document => format!("document >> {}", self.paragraph_css),
            Region::Named { css, .. } => format!("{} >> {}", css, self.paragraph_css),
        }
    }
}

#[derive(Debug)]
pub struct SelectorPlan {
    pairs: Vec<SelectorPair>,
}

impl SelectorPlan {
    pub fn new(pairs: Vec<SelectorPair>) -> Self {
        Self { pairs }
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, SelectorError>
    where
        I: IntoIterator<Item = (Option<&'a str>, &'a str)>,
    {
        let pairs = pairs
            .into_iter()
            .map(|(region, paragraph)| SelectorPair::new(region, paragraph))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(pairs))
    }

    /// The built-in plan for job posting pages.
    pub fn job_description() -> &'static SelectorPlan {
        &JOB_DESCRIPTION_PLAN
    }

    pub fn pairs(&self) -> &[SelectorPair] {
        &self.pairs
    }

    pub fn describe(&self) -> Vec<String> {
        self.pairs.iter().map(SelectorPair::describe).collect()
    }
}

/// Result of walking a plan over one document.
#[derive(Debug)]
pub enum Located<'a> {
    /// First pair that produced nodes, and those nodes in document order.
    Nodes {
        pair_index: usize,
        nodes: Vec<ElementRef<'a>>,
    },
    /// No named region matched anywhere.
    RegionMissing,
    /// Some named region matched, but every pair came back empty.
    RegionEmpty,
}

/// Walk the plan in order and stop at the first pair that yields paragraphs.
pub fn locate<'a>(document: &'a Html, plan: &SelectorPlan) -> Located<'a> {
    let mut region_seen = false;

    for (pair_index, pair) in plan.pairs.iter().enumerate() {
        let nodes: Vec<ElementRef<'a>> = match &pair.region {
            Region::Document => document.select(&pair.paragraph).collect(),
            Region::Named { selector, .. } => {
                let regions: HashSet<_> = document.select(selector).map(|r| r.id()).collect();
                if regions.is_empty() {
                    continue;
                }
                region_seen = true;
                // Select from the document root so nested regions cannot
                // yield the same node twice and order stays document order.
                document
                    .select(&pair.paragraph)
                    .filter(|node| node.ancestors().any(|a| regions.contains(&a.id())))
                    .collect()
            }
        };

        if !nodes.is_empty() {
            return Located::Nodes { pair_index, nodes };
        }
    }

    if region_seen {
        Located::RegionEmpty
    } else {
        Located::RegionMissing
    }
}
