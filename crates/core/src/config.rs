use std::path::PathBuf;

use crate::error::{ClipdexError, Result};

pub const DEFAULT_INTERVAL_MS: u64 = 10_000;

/// Width of the time buckets a video is cut into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalConfig {
    width_ms: u64,
}

impl IntervalConfig {
    pub fn new(width_ms: u64) -> Result<Self> {
        if width_ms == 0 {
            return Err(ClipdexError::InvalidConfig {
                reason: "interval width must be a positive number of milliseconds".to_string(),
            });
        }
        Ok(Self { width_ms })
    }

    pub fn width_ms(&self) -> u64 {
        self.width_ms
    }
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            width_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub service_name: String,
    pub api_version: String,
    pub api_key: String,
    pub index_name: String,
}

impl SearchConfig {
    pub fn new(
        service_name: impl Into<String>,
        api_version: impl Into<String>,
        api_key: impl Into<String>,
        index_name: impl Into<String>,
    ) -> Result<Self> {
        let config = Self {
            service_name: service_name.into(),
            api_version: api_version.into(),
            api_key: api_key.into(),
            index_name: index_name.into(),
        };
        for (value, what) in [
            (&config.service_name, "search service name"),
            (&config.api_version, "search api version"),
            (&config.api_key, "search api key"),
            (&config.index_name, "search index name"),
        ] {
            if value.trim().is_empty() {
                return Err(ClipdexError::InvalidConfig {
                    reason: format!("{what} is empty"),
                });
            }
        }
        Ok(config)
    }

    pub fn endpoint(&self) -> String {
        format!("https://{}.search.windows.net/", self.service_name)
    }
}

/// Azure blob container holding the raw insight reports.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub account: String,
    pub access_key: String,
    pub endpoint_suffix: Option<String>,
    pub container: String,
}

impl StorageConfig {
    /// Build from an Azure storage connection string such as
    /// `DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=...;EndpointSuffix=core.windows.net`.
    pub fn from_connection_string(connection_string: &str, container: &str) -> Result<Self> {
        let mut account = None;
        let mut access_key = None;
        let mut endpoint_suffix = None;

        for pair in connection_string.split(';').filter(|p| !p.trim().is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(ClipdexError::InvalidConfig {
                    reason: format!("connection string segment {pair:?} is not key=value"),
                });
            };
            match key.trim() {
                "AccountName" => account = Some(value.to_string()),
                "AccountKey" => access_key = Some(value.to_string()),
                "EndpointSuffix" => endpoint_suffix = Some(value.to_string()),
                _ => {}
            }
        }

        let account = account.ok_or_else(|| ClipdexError::InvalidConfig {
            reason: "connection string has no AccountName".to_string(),
        })?;
        let access_key = access_key.ok_or_else(|| ClipdexError::InvalidConfig {
            reason: "connection string has no AccountKey".to_string(),
        })?;
        if container.trim().is_empty() {
            return Err(ClipdexError::InvalidConfig {
                reason: "insights container name is empty".to_string(),
            });
        }

        Ok(Self {
            account,
            access_key,
            endpoint_suffix,
            container: container.to_string(),
        })
    }
}

/// Where the ingested / failed report lists are written.
#[derive(Debug, Clone)]
pub struct StatusConfig {
    pub directory: PathBuf,
    pub ingested_file: String,
    pub failed_file: String,
}

impl StatusConfig {
    pub const DEFAULT_INGESTED_FILE: &'static str = "ingested.txt";
    pub const DEFAULT_FAILED_FILE: &'static str = "failed-to-ingest.txt";

    pub fn new(
        directory: Option<PathBuf>,
        ingested_file: Option<String>,
        failed_file: Option<String>,
    ) -> Self {
        Self {
            directory: directory.unwrap_or_else(default_status_dir),
            ingested_file: ingested_file
                .unwrap_or_else(|| Self::DEFAULT_INGESTED_FILE.to_string()),
            failed_file: failed_file.unwrap_or_else(|| Self::DEFAULT_FAILED_FILE.to_string()),
        }
    }
}

pub fn default_status_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("clipdex")
}
