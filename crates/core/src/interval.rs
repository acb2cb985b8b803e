use std::collections::{BTreeMap, btree_map};

use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::Value;

/// One annotation attributed to a bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRecord {
    /// Category-specific primary field, e.g. `("transcript", "hello")`.
    pub primary: Option<(String, Value)>,
    /// JSON-encoded auxiliary metadata.
    pub assets: String,
}

impl CategoryRecord {
    pub fn new(field: impl Into<String>, value: Value, assets: String) -> Self {
        Self {
            primary: Some((field.into(), value)),
            assets,
        }
    }

    pub fn assets_only(assets: String) -> Self {
        Self {
            primary: None,
            assets,
        }
    }
}

impl Serialize for CategoryRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + self.primary.is_some() as usize))?;
        if let Some((field, value)) = &self.primary {
            map.serialize_entry(field, value)?;
        }
        map.serialize_entry("assets", &self.assets)?;
        map.end()
    }
}

/// Named category lists of a bucket. A slot only exists once something was
/// appended to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CategorySlots(BTreeMap<String, Vec<CategoryRecord>>);

impl CategorySlots {
    /// Append to the named slot, creating it on first use.
    pub fn append(&mut self, slot: &str, record: CategoryRecord) {
        match self.0.get_mut(slot) {
            Some(records) => records.push(record),
            None => {
                self.0.insert(slot.to_string(), vec![record]);
            }
        }
    }

    pub fn get(&self, slot: &str) -> Option<&[CategoryRecord]> {
        self.0.get(slot).map(Vec::as_slice)
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.0.contains_key(slot)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The search document for one fixed-width window of a video.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub id: String,
    pub account_id: String,
    pub external_id: String,
    pub name: String,
    pub meta_data: Value,
    pub start_time: String,
    pub end_time: String,
    #[serde(flatten)]
    pub slots: CategorySlots,
}

impl Interval {
    pub fn records(&self, slot: &str) -> Option<&[CategoryRecord]> {
        self.slots.get(slot)
    }
}

/// Buckets of one video keyed by their start offset in milliseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalMap {
    buckets: BTreeMap<u64, Interval>,
}

impl IntervalMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, offset_ms: u64, interval: Interval) {
        self.buckets.insert(offset_ms, interval);
    }

    /// Append `record` to `slot` in every listed bucket. Offsets outside the
    /// skeleton are skipped. Returns how many buckets received the record.
    pub fn append(&mut self, offsets: &[u64], slot: &str, record: &CategoryRecord) -> usize {
        let mut touched = 0;
        for offset in offsets {
            if let Some(interval) = self.buckets.get_mut(offset) {
                interval.slots.append(slot, record.clone());
                touched += 1;
            }
        }
        touched
    }

    pub fn get(&self, offset_ms: u64) -> Option<&Interval> {
        self.buckets.get(&offset_ms)
    }

    pub fn offsets(&self) -> impl Iterator<Item = u64> + '_ {
        self.buckets.keys().copied()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, u64, Interval> {
        self.buckets.iter()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Bucket documents in offset order.
    pub fn into_documents(self) -> Vec<Interval> {
        self.buckets.into_values().collect()
    }
}

impl<'a> IntoIterator for &'a IntervalMap {
    type Item = (&'a u64, &'a Interval);
    type IntoIter = btree_map::Iter<'a, u64, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.iter()
    }
}

/// One entry of a search index batch.
#[derive(Debug, Clone, Serialize)]
pub struct IndexAction {
    #[serde(rename = "@search.action")]
    pub action: &'static str,
    #[serde(flatten)]
    pub document: Interval,
}

/// Request body for the index's bulk document endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct IndexBatch {
    pub value: Vec<IndexAction>,
}

impl IndexBatch {
    pub const UPLOAD: &'static str = "upload";

    pub fn upload(intervals: IntervalMap) -> Self {
        Self {
            value: intervals
                .into_documents()
                .into_iter()
                .map(|document| IndexAction {
                    action: Self::UPLOAD,
                    document,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn interval(id: &str) -> Interval {
        Interval {
            id: id.to_string(),
            account_id: "acc".to_string(),
            external_id: String::new(),
            name: "show".to_string(),
            meta_data: Value::Null,
            start_time: "00:00:00".to_string(),
            end_time: "00:00:10".to_string(),
            slots: CategorySlots::default(),
        }
    }

    #[test]
    fn append_creates_slot_then_extends_it() {
        let mut slots = CategorySlots::default();
        assert!(!slots.contains("labels"));

        slots.append("labels", CategoryRecord::new("label", json!("a"), "{}".into()));
        slots.append("labels", CategoryRecord::new("label", json!("b"), "{}".into()));

        let labels = slots.get("labels").unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[1].primary, Some(("label".to_string(), json!("b"))));
    }

    #[test]
    fn append_skips_offsets_outside_skeleton() {
        let mut map = IntervalMap::new();
        map.insert(0, interval("v-0"));
        let record = CategoryRecord::assets_only("{}".into());

        assert_eq!(map.append(&[0, 10_000], "framePatterns", &record), 1);
        assert_eq!(map.len(), 1);
        assert!(map.get(10_000).is_none());
    }

    #[test]
    fn document_serializes_with_flattened_slots() {
        let mut doc = interval("v-0");
        doc.slots.append(
            "transcripts",
            CategoryRecord::new("transcript", json!("hi"), r#"{"id": 1}"#.into()),
        );
        doc.slots
            .append("framePatterns", CategoryRecord::assets_only("{}".into()));

        let mut map = IntervalMap::new();
        map.insert(0, doc);
        let batch = serde_json::to_value(IndexBatch::upload(map)).unwrap();

        assert_eq!(
            batch,
            json!({"value": [{
                "@search.action": "upload",
                "id": "v-0",
                "accountId": "acc",
                "externalId": "",
                "name": "show",
                "metaData": null,
                "startTime": "00:00:00",
                "endTime": "00:00:10",
                "framePatterns": [{"assets": "{}"}],
                "transcripts": [{"transcript": "hi", "assets": "{\"id\": 1}"}]
            }]})
        );
    }
}
