use std::path::Path;

use log::{debug, info};
use reqwest::{Client, Response};
use serde_json::Value;
use tokio::fs;

use crate::{
    config::SearchConfig,
    error::{ClipdexError, Result},
    interval::IndexBatch,
    pipeline::DocumentSink,
};

/// Client for the search service REST API.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: Client,
    config: SearchConfig,
}

impl SearchClient {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}{}?api-version={}",
            self.config.endpoint(),
            path,
            self.config.api_version
        )
    }

    /// URL the document batches are posted to.
    pub fn documents_url(&self) -> String {
        self.url(&format!("indexes/{}/docs/index", self.config.index_name))
    }

    /// Create the index described by the schema file, named after the
    /// configured index.
    pub async fn create_index(&self, schema_path: &Path) -> Result<()> {
        let text = fs::read_to_string(schema_path)
            .await
            .map_err(|e| ClipdexError::SchemaFileFailed {
                path: schema_path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let schema = index_schema(&text, &self.config.index_name).map_err(|e| {
            ClipdexError::SchemaFileFailed {
                path: schema_path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        let url = self.url("indexes");
        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("api-key", &self.config.api_key)
            .json(&schema)
            .send()
            .await?;
        check_status(url, response).await?;

        info!("created search index {}", self.config.index_name);
        Ok(())
    }

    /// Upload one batch of documents.
    pub async fn upload(&self, batch: &IndexBatch) -> Result<()> {
        let url = self.documents_url();
        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("api-key", &self.config.api_key)
            .json(batch)
            .send()
            .await?;
        check_status(url, response).await?;

        debug!("uploaded {} documents", batch.len());
        Ok(())
    }
}

impl DocumentSink for SearchClient {
    async fn upload(&self, batch: &IndexBatch) -> Result<()> {
        SearchClient::upload(self, batch).await
    }
}

/// Parse an index schema and set its `name`.
pub fn index_schema(text: &str, index_name: &str) -> Result<Value> {
    let mut schema: Value = serde_json::from_str(text)?;
    let Some(fields) = schema.as_object_mut() else {
        return Err(ClipdexError::InvalidConfig {
            reason: "index schema must be a JSON object".to_string(),
        });
    };
    fields.insert("name".to_string(), Value::String(index_name.to_string()));
    Ok(schema)
}

async fn check_status(url: String, response: Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClipdexError::SearchRequestFailed {
        url,
        status: status.as_u16(),
        body,
    })
}
