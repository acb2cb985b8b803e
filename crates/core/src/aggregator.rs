//! Distribution of insight annotations into fixed-width time buckets.

use log::debug;
use serde_json::{Map, Value};

use crate::{
    assets::{self, Assets},
    category::{
        CATEGORIES, CategoryDescriptor, Gate, Primary, RecordPass, SCORE_THRESHOLD, Scope,
    },
    config::IntervalConfig,
    error::{ClipdexError, Result},
    interval::{CategoryRecord, CategorySlots, Interval, IntervalMap},
    timecode::{Tokenizer, format_millis, parse_whole_millis},
    types::{CustomTagSpec, Video, VideoIndexReport},
};

/// Read access to one JSON object of a report, reporting missing or
/// mistyped fields against the category being merged.
#[derive(Clone, Copy)]
struct Fields<'a> {
    category: &'a str,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn new(category: &'a str, value: &'a Value, what: &str) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self { category, map }),
            _ => Err(ClipdexError::InvalidField {
                category: category.to_string(),
                field: what.to_string(),
                expected: "an object",
            }),
        }
    }

    fn get(&self, field: &str) -> Option<&'a Value> {
        self.map.get(field)
    }

    fn require(&self, field: &str) -> Result<&'a Value> {
        self.map
            .get(field)
            .ok_or_else(|| ClipdexError::MissingField {
                category: self.category.to_string(),
                field: field.to_string(),
            })
    }

    fn or_empty(&self, field: &str) -> Value {
        self.map
            .get(field)
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()))
    }

    fn invalid(&self, field: &str, expected: &'static str) -> ClipdexError {
        ClipdexError::InvalidField {
            category: self.category.to_string(),
            field: field.to_string(),
            expected,
        }
    }

    fn require_str(&self, field: &str) -> Result<&'a str> {
        self.require(field)?
            .as_str()
            .ok_or_else(|| self.invalid(field, "a timestamp string"))
    }

    fn require_f64(&self, field: &str) -> Result<f64> {
        self.require(field)?
            .as_f64()
            .ok_or_else(|| self.invalid(field, "a number"))
    }

    fn require_array(&self, field: &str) -> Result<&'a [Value]> {
        self.require(field)?
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| self.invalid(field, "an array"))
    }

    fn require_object(&self, field: &str) -> Result<Fields<'a>> {
        Fields::new(self.category, self.require(field)?, field)
    }
}

/// Fields available while building one record.
struct RecordContext<'a> {
    event: Fields<'a>,
    item: Option<Fields<'a>>,
    instance: Fields<'a>,
}

impl<'a> RecordContext<'a> {
    fn scope(&self, scope: Scope) -> Fields<'a> {
        match scope {
            Scope::Event => self.event,
            Scope::Item => self.item.unwrap_or(self.event),
            Scope::Instance => self.instance,
        }
    }
}

fn array<'a>(category: &str, key: &str, value: &'a Value) -> Result<&'a [Value]> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ClipdexError::InvalidField {
            category: category.to_string(),
            field: key.to_string(),
            expected: "an array",
        })
}

fn is_empty_text(value: &Value) -> bool {
    matches!(value, Value::String(text) if text.is_empty())
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn passes_gate(gate: &Gate, event: &Fields<'_>) -> Result<bool> {
    Ok(match *gate {
        Gate::Always => true,
        Gate::NonEmpty(field) => !is_empty_text(event.require(field)?),
        Gate::Above(field, threshold) => event.require_f64(field)? > threshold,
        Gate::NonEmptyAndAbove {
            text,
            score,
            threshold,
        } => !is_empty_text(event.require(text)?) && event.require_f64(score)? > threshold,
    })
}

fn build_record(pass: &RecordPass, ctx: &RecordContext<'_>) -> Result<CategoryRecord> {
    let mut fields = Assets::new();
    for field in pass.assets {
        let source = ctx.scope(field.scope);
        let value = if field.required {
            source.require(field.source)?.clone()
        } else {
            source.or_empty(field.source)
        };
        fields.insert(field.key.to_string(), value);
    }
    let assets = assets::encode(&fields)?;

    Ok(match pass.primary {
        Primary::None => CategoryRecord::assets_only(assets),
        Primary::Copy {
            scope,
            source,
            target,
        } => CategoryRecord::new(target, ctx.scope(scope).require(source)?.clone(), assets),
        Primary::Stringify { source, target } => CategoryRecord::new(
            target,
            Value::String(stringify(ctx.event.require(source)?)),
            assets,
        ),
    })
}

/// Builds the bucket documents of a report.
#[derive(Debug, Clone, Copy)]
pub struct IntervalAggregator {
    tokenizer: Tokenizer,
}

impl IntervalAggregator {
    pub fn new(config: IntervalConfig) -> Self {
        Self {
            tokenizer: Tokenizer::new(config),
        }
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Bucket documents for the first video of a report.
    pub fn parse_report(&self, report: &VideoIndexReport) -> Result<IntervalMap> {
        let video = report
            .videos
            .first()
            .ok_or_else(|| ClipdexError::EmptyReport {
                name: report.name.clone(),
            })?;
        self.aggregate_video(video, &report.name)
    }

    /// Skeleton of `video` with every built-in category merged into it.
    pub fn aggregate_video(&self, video: &Video, show_name: &str) -> Result<IntervalMap> {
        let mut intervals = self.build_skeleton(video, show_name)?;
        for descriptor in CATEGORIES {
            if let Some(events) = video.insights.annotation(descriptor.key) {
                self.merge_category(descriptor, events, &mut intervals)?;
            }
        }
        debug!(
            "video {:?} of {:?}: {} buckets",
            video.id,
            show_name,
            intervals.len()
        );
        Ok(intervals)
    }

    /// Empty buckets covering the whole duration of `video`.
    pub fn build_skeleton(&self, video: &Video, show_name: &str) -> Result<IntervalMap> {
        let duration_ms = parse_whole_millis(&video.insights.duration)?;
        let width_ms = self.tokenizer.width_ms();

        let mut intervals = IntervalMap::new();
        for offset in self.tokenizer.bucket_offsets(duration_ms) {
            let interval = Interval {
                id: format!("{}-{}", video.id, self.tokenizer.bucket_index(offset)),
                account_id: video.account_id.clone(),
                external_id: video.external_id.clone(),
                name: show_name.to_string(),
                meta_data: video.metadata.clone(),
                start_time: format_millis(offset),
                end_time: format_millis((offset + width_ms).min(duration_ms)),
                slots: CategorySlots::default(),
            };
            intervals.insert(offset, interval);
        }
        Ok(intervals)
    }

    /// Merge the events of one category into existing buckets.
    pub fn merge_category(
        &self,
        descriptor: &CategoryDescriptor,
        events: &Value,
        intervals: &mut IntervalMap,
    ) -> Result<()> {
        let category = descriptor.key;
        let mut placed = 0;

        for event in array(category, category, events)? {
            let event = Fields::new(category, event, "event")?;
            if !passes_gate(&descriptor.gate, &event)? {
                continue;
            }
            for pass in descriptor.passes {
                placed += self.place_pass(pass, event, intervals)?;
            }
        }

        debug!("{category}: {placed} records placed");
        Ok(())
    }

    fn place_pass(
        &self,
        pass: &RecordPass,
        event: Fields<'_>,
        intervals: &mut IntervalMap,
    ) -> Result<usize> {
        let Some(items_key) = pass.items else {
            return self.place_instances(pass, event, None, intervals);
        };
        let Some(items) = event.get(items_key) else {
            return Ok(0);
        };

        let mut placed = 0;
        for item in array(event.category, items_key, items)? {
            let item = Fields::new(event.category, item, items_key)?;
            placed += self.place_instances(pass, event, Some(item), intervals)?;
        }
        Ok(placed)
    }

    fn place_instances(
        &self,
        pass: &RecordPass,
        event: Fields<'_>,
        item: Option<Fields<'_>>,
        intervals: &mut IntervalMap,
    ) -> Result<usize> {
        let owner = item.unwrap_or(event);
        let mut placed = 0;

        for instance in owner.require_array("instances")? {
            let instance = Fields::new(event.category, instance, "instances")?;
            let offsets = self
                .tokenizer
                .related_buckets(instance.require_str("start")?, instance.require_str("end")?)?;
            let record = build_record(
                pass,
                &RecordContext {
                    event,
                    item,
                    instance,
                },
            )?;
            placed += intervals.append(&offsets, pass.slot, &record);
        }
        Ok(placed)
    }

    /// Merge custom vision model predictions. Each item covers the single
    /// window `starttime..endtime` of its thumbnail (a point when `endtime` is
    /// absent); every prediction above the threshold becomes one record.
    pub fn merge_custom_tags(
        &self,
        items: &Value,
        spec: &CustomTagSpec,
        intervals: &mut IntervalMap,
    ) -> Result<()> {
        let category = spec.tag_group.as_str();
        let mut placed = 0;

        for item in array(category, category, items)? {
            let item = Fields::new(category, item, "item")?;
            let predictions = item
                .require_object("imagePrediction")?
                .require_array("predictions")?;

            for prediction in predictions {
                let prediction = Fields::new(category, prediction, "predictions")?;
                let probability = prediction.require("probability")?;
                if is_empty_text(probability) {
                    continue;
                }
                if prediction.require_f64("probability")? <= SCORE_THRESHOLD {
                    continue;
                }

                let metadata = item.require_object("thumbnailMetadata")?;
                let start = metadata.require_str("starttime")?;
                let end = match metadata.get("endtime") {
                    Some(_) => metadata.require_str("endtime")?,
                    None => start,
                };
                let offsets = self.tokenizer.related_buckets(start, end)?;

                let mut fields = metadata.map.clone();
                fields.insert("probability".to_string(), probability.clone());
                let record = CategoryRecord::new(
                    spec.tag_field.as_str(),
                    prediction.require("tagName")?.clone(),
                    assets::encode(&fields)?,
                );
                placed += intervals.append(&offsets, category, &record);
            }
        }

        debug!("{category}: {placed} custom records placed");
        Ok(())
    }
}
