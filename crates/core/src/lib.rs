//! Clipdex Core Library
//!
//! Cuts video-indexer insight reports into fixed-width time buckets and
//! turns each bucket into a search document.

pub mod aggregator;
pub mod assets;
pub mod category;
pub mod config;
pub mod error;
pub mod interval;
pub mod pipeline;
pub mod search;
pub mod source;
pub mod status;
pub mod timecode;
pub mod types;

// Re-export commonly used items at crate root
pub use aggregator::IntervalAggregator;
pub use config::{IntervalConfig, SearchConfig, StatusConfig, StorageConfig, default_status_dir};
pub use error::{ClipdexError, Result};
pub use interval::{CategoryRecord, IndexBatch, Interval, IntervalMap};
pub use pipeline::{
    DocumentSink, IngestSummary, Ingestor, PreparedReport, ReportOutcome, prepare_report,
};
pub use search::SearchClient;
pub use source::{ReportEntry, ReportSource};
pub use status::StatusLog;
pub use timecode::{Tokenizer, format_millis, format_seconds, parse_millis, parse_timestamp};
pub use types::{CustomTagSpec, Video, VideoIndexReport};
