//! CSV batch mode: one summary attempt per input row.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use csv::{ReaderBuilder, WriterBuilder};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::service::SummaryService;

/// Concurrent scrapes in flight. Each may hold a browser.
const CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Deserialize)]
pub struct BatchJob {
    pub job_id: String,
    pub apply_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchRecord {
    pub job_id: String,
    pub apply_url: String,
    /// `ok`, `invalid_url` or a failure kind.
    pub status: String,
    pub paragraphs: usize,
    pub summary: String,
}

pub fn read_jobs<R: Read>(reader: R) -> anyhow::Result<Vec<BatchJob>> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut jobs = Vec::new();
    for (line, row) in rdr.deserialize().enumerate() {
        let job: BatchJob = row.with_context(|| format!("malformed row {}", line + 2))?;
        jobs.push(job);
    }
    Ok(jobs)
}

pub fn write_records<W: Write>(writer: W, records: &[BatchRecord]) -> anyhow::Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

async fn run_job(service: &SummaryService, job: BatchJob) -> BatchRecord {
    let url = match Url::parse(&job.apply_url) {
        Ok(url) => url,
        Err(e) => {
            warn!(job_id = %job.job_id, "skipping invalid URL {}: {}", job.apply_url, e);
            return BatchRecord {
                job_id: job.job_id,
                apply_url: job.apply_url,
                status: "invalid_url".into(),
                paragraphs: 0,
                summary: String::new(),
            };
        }
    };

    match service.summarize(&url).await {
        Ok(summary) => BatchRecord {
            job_id: job.job_id,
            apply_url: job.apply_url,
            status: "ok".into(),
            paragraphs: summary.result.paragraphs().len(),
            summary: summary.result.summary(),
        },
        Err(err) => BatchRecord {
            job_id: job.job_id,
            apply_url: job.apply_url,
            status: err.kind().into(),
            paragraphs: 0,
            summary: String::new(),
        },
    }
}

/// Output keeps input order.
pub async fn run(service: &SummaryService, jobs: Vec<BatchJob>) -> Vec<BatchRecord> {
    stream::iter(jobs)
        .map(|job| run_job(service, job))
        .buffered(CONCURRENCY)
        .collect::<Vec<_>>()
        .await
}

pub async fn run_files(service: &SummaryService, input: &Path, output: &Path) -> anyhow::Result<()> {
    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let jobs = read_jobs(file)?;
    info!(jobs = jobs.len(), input = %input.display(), "batch started");

    let records = run(service, jobs).await;
    let ok = records.iter().filter(|r| r.status == "ok").count();

    let out = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    write_records(out, &records)?;
    info!(ok, failed = records.len() - ok, output = %output.display(), "batch finished");
    Ok(())
}
