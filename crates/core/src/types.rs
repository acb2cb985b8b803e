use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PROCESSED_STATE: &str = "Processed";

/// An insight report as produced by the video indexing service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoIndexReport {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub videos: Vec<Video>,
}

impl VideoIndexReport {
    pub fn is_processed(&self) -> bool {
        self.state.as_deref() == Some(PROCESSED_STATE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default = "empty_metadata")]
    pub metadata: Value,
    pub insights: Insights,
}

/// Video insights. Only `duration` is required; every annotation category
/// stays as raw JSON until its descriptor reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insights {
    pub duration: String,
    #[serde(flatten)]
    pub annotations: Map<String, Value>,
}

impl Insights {
    pub fn annotation(&self, key: &str) -> Option<&Value> {
        self.annotations.get(key)
    }
}

fn empty_metadata() -> Value {
    Value::String(String::new())
}

/// Caller-supplied naming for custom vision model predictions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomTagSpec {
    /// Primary field of each record, e.g. `"logo"`.
    pub tag_field: String,
    /// Slot the records are grouped under, e.g. `"logos"`.
    pub tag_group: String,
}
