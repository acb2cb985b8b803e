use std::path::{Path, PathBuf};

use tokio::{fs, io::AsyncWriteExt};

use crate::{config::StatusConfig, error::Result};

/// Append-only lists of ingested and failed report names.
#[derive(Debug, Clone)]
pub struct StatusLog {
    ingested: PathBuf,
    failed: PathBuf,
}

impl StatusLog {
    pub fn new(config: &StatusConfig) -> Self {
        Self {
            ingested: config.directory.join(&config.ingested_file),
            failed: config.directory.join(&config.failed_file),
        }
    }

    pub fn ingested_path(&self) -> &Path {
        &self.ingested
    }

    pub fn failed_path(&self) -> &Path {
        &self.failed
    }

    pub async fn record_ingested(&self, name: &str) -> Result<()> {
        append_line(&self.ingested, name).await
    }

    pub async fn record_failed(&self, name: &str) -> Result<()> {
        append_line(&self.failed, name).await
    }
}

async fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{line}\n").as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
