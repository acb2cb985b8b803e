use std::{path::Path as FsPath, sync::Arc};

use futures::TryStreamExt;
use log::debug;
use object_store::{
    ObjectStore, azure::MicrosoftAzureBuilder, local::LocalFileSystem, path::Path,
};

use crate::{
    config::StorageConfig,
    error::{ClipdexError, Result},
};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// One report waiting in a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub name: String,
    pub location: Path,
}

/// Where raw insight reports are read from.
#[derive(Debug, Clone)]
pub struct ReportSource {
    store: Arc<dyn ObjectStore>,
    recursive: bool,
}

impl ReportSource {
    /// Every object of `store` is treated as a report.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            recursive: true,
        }
    }

    /// Files directly inside `dir`; subdirectories are ignored.
    pub fn local(dir: &FsPath) -> Result<Self> {
        let store = LocalFileSystem::new_with_prefix(dir)?;
        Ok(Self {
            store: Arc::new(store),
            recursive: false,
        })
    }

    /// Every blob of an Azure storage container.
    pub fn azure(config: &StorageConfig) -> Result<Self> {
        let mut builder = MicrosoftAzureBuilder::new()
            .with_account(&config.account)
            .with_access_key(&config.access_key)
            .with_container_name(&config.container);

        if let Some(suffix) = config
            .endpoint_suffix
            .as_deref()
            .filter(|suffix| *suffix != DEFAULT_ENDPOINT_SUFFIX)
        {
            builder = builder.with_endpoint(format!("https://{}.blob.{}", config.account, suffix));
        }

        Ok(Self::new(Arc::new(builder.build()?)))
    }

    /// Reports in name order.
    pub async fn list(&self) -> Result<Vec<ReportEntry>> {
        let objects = if self.recursive {
            self.store.list(None).try_collect::<Vec<_>>().await?
        } else {
            self.store.list_with_delimiter(None).await?.objects
        };

        let mut entries: Vec<ReportEntry> = objects
            .into_iter()
            .map(|meta| ReportEntry {
                name: meta.location.to_string(),
                location: meta.location,
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        debug!("listed {} reports", entries.len());
        Ok(entries)
    }

    pub async fn read(&self, entry: &ReportEntry) -> Result<String> {
        let bytes = self.store.get(&entry.location).await?.bytes().await?;
        decode_report_text(&bytes)
    }
}

/// UTF-8 text of a report with any leading byte-order mark removed.
pub fn decode_report_text(bytes: &[u8]) -> Result<String> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|e| ClipdexError::InvalidEncoding {
        reason: e.utf8_error().to_string(),
    })
}
