use futures::{StreamExt, stream};
use log::{error, info, warn};
use serde_json::Value;

use crate::{
    aggregator::IntervalAggregator,
    error::{ClipdexError, Result},
    interval::IndexBatch,
    source::{ReportEntry, ReportSource},
    status::StatusLog,
    types::{PROCESSED_STATE, VideoIndexReport},
};

/// Destination of built document batches.
#[allow(async_fn_in_trait)]
pub trait DocumentSink {
    async fn upload(&self, batch: &IndexBatch) -> Result<()>;
}

/// A report after the state gate.
#[derive(Debug)]
pub enum PreparedReport {
    Ready(IndexBatch),
    /// Indexing has not finished; the report is left for a later run.
    NotProcessed { state: String },
}

/// Decode a report and build its upload batch.
pub fn prepare_report(text: &str, aggregator: &IntervalAggregator) -> Result<PreparedReport> {
    let value: Value = serde_json::from_str(text)?;
    let state = value
        .get("state")
        .and_then(Value::as_str)
        .ok_or(ClipdexError::MissingState)?;
    if state != PROCESSED_STATE {
        return Ok(PreparedReport::NotProcessed {
            state: state.to_string(),
        });
    }

    let report: VideoIndexReport = serde_json::from_value(value)?;
    let intervals = aggregator.parse_report(&report)?;
    Ok(PreparedReport::Ready(IndexBatch::upload(intervals)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Ingested { documents: usize },
    Skipped { state: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub ingested: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub documents: usize,
}

impl IngestSummary {
    pub fn total(&self) -> usize {
        self.ingested.len() + self.skipped.len() + self.failed.len()
    }

    fn add(&mut self, name: &str, outcome: &ReportOutcome) {
        match outcome {
            ReportOutcome::Ingested { documents } => {
                self.ingested.push(name.to_string());
                self.documents += documents;
            }
            ReportOutcome::Skipped { .. } => self.skipped.push(name.to_string()),
            ReportOutcome::Failed { reason } => {
                self.failed.push((name.to_string(), reason.clone()))
            }
        }
    }
}

/// Everything an ingestion run needs.
pub struct Ingestor<'a, S> {
    pub source: &'a ReportSource,
    pub aggregator: &'a IntervalAggregator,
    pub sink: &'a S,
    pub status: &'a StatusLog,
    /// Reports processed at once; 0 is treated as 1.
    pub concurrency: usize,
}

impl<S: DocumentSink> Ingestor<'_, S> {
    async fn ingest_one(&self, entry: &ReportEntry) -> ReportOutcome {
        match self.try_ingest(entry).await {
            Ok(outcome) => outcome,
            Err(e) => ReportOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    async fn try_ingest(&self, entry: &ReportEntry) -> Result<ReportOutcome> {
        let text = self.source.read(entry).await?;
        match prepare_report(&text, self.aggregator)? {
            PreparedReport::NotProcessed { state } => Ok(ReportOutcome::Skipped { state }),
            PreparedReport::Ready(batch) => {
                if !batch.is_empty() {
                    self.sink.upload(&batch).await?;
                }
                Ok(ReportOutcome::Ingested {
                    documents: batch.len(),
                })
            }
        }
    }

    /// Ingest every listed report, calling `on_outcome` as each one finishes.
    /// A report failing never stops the run; failing to write the status
    /// log does.
    pub async fn run(
        &self,
        mut on_outcome: impl FnMut(&ReportEntry, &ReportOutcome),
    ) -> Result<IngestSummary> {
        let entries = self.source.list().await?;
        info!("ingesting {} reports", entries.len());

        let mut outcomes = stream::iter(entries.iter())
            .map(|entry| async move { (entry, self.ingest_one(entry).await) })
            .buffer_unordered(self.concurrency.max(1));

        let mut summary = IngestSummary::default();
        while let Some((entry, outcome)) = outcomes.next().await {
            match &outcome {
                ReportOutcome::Ingested { documents } => {
                    info!("{}: uploaded {documents} documents", entry.name);
                    self.status.record_ingested(&entry.name).await?;
                }
                ReportOutcome::Skipped { state } => {
                    warn!("{}: state is {state:?}, skipping", entry.name);
                }
                ReportOutcome::Failed { reason } => {
                    error!("{}: {reason}", entry.name);
                    self.status.record_failed(&entry.name).await?;
                }
            }
            on_outcome(entry, &outcome);
            summary.add(&entry.name, &outcome);
        }

        info!(
            "ingested {}, skipped {}, failed {}",
            summary.ingested.len(),
            summary.skipped.len(),
            summary.failed.len()
        );
        Ok(summary)
    }
}
