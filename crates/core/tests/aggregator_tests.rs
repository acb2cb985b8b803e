use clipdex_core::{
    ClipdexError, CustomTagSpec, IndexBatch, IntervalAggregator, IntervalConfig, IntervalMap,
    VideoIndexReport,
};
use serde_json::{Value, json};

fn report(duration: &str, insights: Value) -> VideoIndexReport {
    let mut insights = insights;
    insights["duration"] = json!(duration);
    serde_json::from_value(json!({
        "name": "Evening News",
        "state": "Processed",
        "videos": [{
            "id": "v1",
            "accountId": "acc-1",
            "externalId": "ext-1",
            "metadata": "season 2",
            "insights": insights,
        }],
    }))
    .unwrap()
}

fn aggregate(insights: Value) -> clipdex_core::Result<IntervalMap> {
    IntervalAggregator::new(IntervalConfig::default()).parse_report(&report("0:00:25", insights))
}

fn primaries(map: &IntervalMap, offset: u64, slot: &str) -> Vec<Value> {
    map.get(offset)
        .and_then(|interval| interval.records(slot))
        .unwrap_or_default()
        .iter()
        .map(|record| record.primary.clone().unwrap().1)
        .collect()
}

fn transcript(id: u64, text: &str, confidence: f64, start: &str, end: &str) -> Value {
    json!({
        "id": id,
        "text": text,
        "confidence": confidence,
        "speakerId": 1,
        "language": "en-US",
        "instances": [{"start": start, "end": end}],
    })
}

#[test]
fn skeleton_covers_whole_duration() {
    let map = aggregate(json!({})).unwrap();

    assert_eq!(map.offsets().collect::<Vec<_>>(), [0, 10_000, 20_000]);
    let docs = map.into_documents();
    let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["v1-0", "v1-1", "v1-2"]);

    assert_eq!(docs[0].start_time, "00:00:00");
    assert_eq!(docs[0].end_time, "00:00:10");
    assert_eq!(docs[2].start_time, "00:00:20");
    assert_eq!(docs[2].end_time, "00:00:25");
    assert_eq!(docs[1].account_id, "acc-1");
    assert_eq!(docs[1].external_id, "ext-1");
    assert_eq!(docs[1].name, "Evening News");
    assert_eq!(docs[1].meta_data, json!("season 2"));
    assert!(docs.iter().all(|d| d.slots.is_empty()));
}

#[test]
fn transcript_line_lands_in_boundary_bucket() {
    let map = aggregate(json!({
        "transcript": [transcript(1, "hello", 0.9, "0:00:05", "0:00:12")],
    }))
    .unwrap();

    assert!(map.get(0).unwrap().records("transcripts").is_none());
    assert!(map.get(20_000).unwrap().records("transcripts").is_none());

    let records = map.get(10_000).unwrap().records("transcripts").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].primary,
        Some(("transcript".to_string(), json!("hello")))
    );
    assert_eq!(
        records[0].assets,
        r#"{"id": 1, "speakerId": 1, "language": "en-US", "start": "0:00:05", "end": "0:00:12"}"#
    );
}

#[test]
fn span_crossing_boundaries_is_added_to_each() {
    let map = aggregate(json!({
        "keywords": [{
            "id": 4,
            "text": "budget",
            "confidence": 1.0,
            "language": "en-US",
            "instances": [{"start": "0:00:00", "end": "0:00:25"}],
        }],
    }))
    .unwrap();

    for offset in [0, 10_000, 20_000] {
        assert_eq!(primaries(&map, offset, "keywords"), [json!("budget")]);
    }
}

#[test]
fn gates_drop_empty_and_low_confidence_events() {
    let map = aggregate(json!({
        "transcript": [
            transcript(1, "", 0.9, "0:00:01", "0:00:02"),
            transcript(2, "borderline", 0.5, "0:00:01", "0:00:02"),
            transcript(3, "kept", 0.51, "0:00:01", "0:00:02"),
        ],
    }))
    .unwrap();

    assert_eq!(primaries(&map, 0, "transcripts"), [json!("kept")]);
}

#[test]
fn records_keep_event_order() {
    let map = aggregate(json!({
        "transcript": [
            transcript(1, "late", 0.9, "0:00:07", "0:00:08"),
            transcript(2, "early", 0.9, "0:00:01", "0:00:02"),
        ],
    }))
    .unwrap();

    assert_eq!(
        primaries(&map, 0, "transcripts"),
        [json!("late"), json!("early")]
    );
}

#[test]
fn empty_slots_are_not_serialized() {
    let map = aggregate(json!({
        "labels": [{"id": 1, "name": "desk", "instances": [{"start": "0:00:21", "end": "0:00:22"}]}],
    }))
    .unwrap();

    let batch = serde_json::to_value(IndexBatch::upload(map)).unwrap();
    let docs = batch["value"].as_array().unwrap();
    assert!(docs[0].get("labels").is_none());
    assert!(docs[1].get("labels").is_none());
    assert_eq!(docs[2]["labels"][0]["label"], json!("desk"));
    assert_eq!(docs[2]["@search.action"], json!("upload"));
}

#[test]
fn faces_emit_face_and_thumbnail_records() {
    let map = aggregate(json!({
        "faces": [{
            "id": 7,
            "name": "Jane Roe",
            "confidence": 0.93,
            "title": "Anchor",
            "instances": [{"thumbnailsIds": ["t1"], "start": "0:00:01", "end": "0:00:02"}],
            "thumbnails": [{
                "id": "t1",
                "fileName": "FaceInstanceThumbnail_t1.jpg",
                "instances": [{"start": "0:00:11", "end": "0:00:12"}],
            }],
        }],
    }))
    .unwrap();

    let faces = map.get(0).unwrap().records("faces").unwrap();
    assert_eq!(faces[0].primary, Some(("face".to_string(), json!("Jane Roe"))));
    assert_eq!(
        faces[0].assets,
        r#"{"id": 7, "description": "", "thumbnailId": "", "knownPersonId": "", "title": "Anchor", "imageUrl": "", "thumbnailsIds": ["t1"], "start": "0:00:01", "end": "0:00:02"}"#
    );

    let thumbnails = map.get(10_000).unwrap().records("thumbnails").unwrap();
    assert_eq!(
        thumbnails[0].primary,
        Some((
            "thumbnail".to_string(),
            json!("FaceInstanceThumbnail_t1.jpg")
        ))
    );
    assert!(thumbnails[0].assets.contains(r#""thumbnailsIds": "t1""#));
    assert!(map.get(0).unwrap().records("thumbnails").is_none());
}

#[test]
fn faces_without_thumbnails_still_index() {
    let map = aggregate(json!({
        "faces": [{
            "id": 8,
            "name": "John Doe",
            "confidence": 0.7,
            "instances": [{"start": "0:00:01", "end": "0:00:02"}],
        }],
    }))
    .unwrap();

    assert_eq!(primaries(&map, 0, "faces"), [json!("John Doe")]);
    assert!(map.get(0).unwrap().records("thumbnails").is_none());
}

#[test]
fn moderation_scores_become_strings_in_two_slots() {
    let map = aggregate(json!({
        "visualContentModeration": [{
            "id": 2,
            "adultScore": 0.1,
            "racyScore": "0.25",
            "instances": [{"start": "0:00:01", "end": "0:00:03"}],
        }],
    }))
    .unwrap();

    assert_eq!(primaries(&map, 0, "adultScores"), [json!("0.1")]);
    assert_eq!(primaries(&map, 0, "racyScores"), [json!("0.25")]);
}

#[test]
fn non_numeric_scores_use_json_rendering() {
    let map = aggregate(json!({
        "visualContentModeration": [{
            "id": 3,
            "adultScore": true,
            "racyScore": null,
            "instances": [{"start": "0:00:01", "end": "0:00:03"}],
        }],
    }))
    .unwrap();

    assert_eq!(primaries(&map, 0, "adultScores"), [json!("true")]);
    assert_eq!(primaries(&map, 0, "racyScores"), [json!("null")]);
}

#[test]
fn frame_patterns_carry_only_assets() {
    let map = aggregate(json!({
        "framePatterns": [
            {"id": 1, "confidence": 0.4, "instances": [{"start": "0:00:01", "end": "0:00:02"}]},
            {"id": 2, "confidence": 0.8, "instances": [{"start": "0:00:01", "end": "0:00:02"}]},
        ],
    }))
    .unwrap();

    let records = map.get(0).unwrap().records("framePatterns").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].primary, None);
    assert_eq!(
        records[0].assets,
        r#"{"id": 2, "start": "0:00:01", "end": "0:00:02"}"#
    );
}

#[test]
fn sentiments_gate_on_average_score() {
    let map = aggregate(json!({
        "sentiments": [
            {"id": 1, "sentimentType": "Positive", "averageScore": 0.9,
             "instances": [{"start": "0:00:01", "end": "0:00:02"}]},
            {"id": 2, "sentimentType": "Neutral", "averageScore": 0.5,
             "instances": [{"start": "0:00:01", "end": "0:00:02"}]},
        ],
    }))
    .unwrap();

    assert_eq!(primaries(&map, 0, "sentiments"), [json!("Positive")]);
}

#[test]
fn missing_required_field_is_reported() {
    let mut event = transcript(1, "hello", 0.9, "0:00:01", "0:00:02");
    event.as_object_mut().unwrap().remove("language");

    let err = aggregate(json!({ "transcript": [event] })).unwrap_err();
    match err {
        ClipdexError::MissingField { category, field } => {
            assert_eq!(category, "transcript");
            assert_eq!(field, "language");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        aggregate(json!({ "transcript": [transcript(1, "x", 0.9, "0:00:01", "0:00:02")] })),
        Ok(_)
    ));
}

#[test]
fn brands_require_brand_type_on_instance() {
    let err = aggregate(json!({
        "brands": [{
            "id": 1,
            "name": "Contoso",
            "confidence": 0.9,
            "referenceId": "Contoso",
            "referenceType": "Wiki",
            "description": "A company",
            "instances": [{"start": "0:00:01", "end": "0:00:02"}],
        }],
    }))
    .unwrap_err();

    assert!(matches!(err, ClipdexError::MissingField { ref field, .. } if field == "brandType"));
}

#[test]
fn malformed_timestamp_aborts_report() {
    let err = aggregate(json!({
        "transcript": [transcript(1, "hello", 0.9, "FOO", "0:00:02")],
    }))
    .unwrap_err();

    assert!(matches!(err, ClipdexError::InvalidTimestamp { ref text } if text == "FOO"));
    assert!(err.is_malformed_report());
}

#[test]
fn instances_past_the_end_are_ignored() {
    let map = aggregate(json!({
        "emotions": [{"id": 1, "type": "Joy", "instances": [{"start": "0:01:00", "end": "0:01:05"}]}],
    }))
    .unwrap();

    assert_eq!(map.len(), 3);
    assert!(map.iter().all(|(_, interval)| interval.slots.is_empty()));
}

#[test]
fn aggregation_is_repeatable() {
    let insights = json!({
        "transcript": [transcript(1, "hello", 0.9, "0:00:05", "0:00:12")],
        "audioEffects": [{"id": 1, "type": "Silence", "instances": [{"start": "0:00:00", "end": "0:00:03"}]}],
    });

    assert_eq!(
        aggregate(insights.clone()).unwrap(),
        aggregate(insights).unwrap()
    );
}

#[test]
fn only_first_video_is_used() {
    let mut two_videos = report("0:00:05", json!({}));
    let mut second = two_videos.videos[0].clone();
    second.id = "v2".to_string();
    two_videos.videos.push(second);

    let map = IntervalAggregator::new(IntervalConfig::default())
        .parse_report(&two_videos)
        .unwrap();
    assert_eq!(map.into_documents()[0].id, "v1-0");
}

#[test]
fn report_without_videos_is_rejected() {
    let mut empty = report("0:00:05", json!({}));
    empty.videos.clear();

    let err = IntervalAggregator::new(IntervalConfig::default())
        .parse_report(&empty)
        .unwrap_err();
    assert!(matches!(err, ClipdexError::EmptyReport { .. }));
}

#[test]
fn custom_tags_are_grouped_under_caller_slot() {
    let aggregator = IntervalAggregator::new(IntervalConfig::default());
    let mut map = aggregator.parse_report(&report("0:00:25", json!({}))).unwrap();
    let items = json!([
        {
            "thumbnailMetadata": {"id": "th1", "starttime": "0:00:12", "endtime": "0:00:13"},
            "imagePrediction": {"predictions": [
                {"tagName": "contoso-logo", "probability": 0.97},
                {"tagName": "fabrikam-logo", "probability": 0.2},
            ]},
        },
        {
            "thumbnailMetadata": {"id": "th2", "starttime": "0:00:21"},
            "imagePrediction": {"predictions": [{"tagName": "contoso-logo", "probability": 0.8}]},
        },
    ]);
    let spec = CustomTagSpec {
        tag_field: "logo".to_string(),
        tag_group: "logos".to_string(),
    };

    aggregator
        .merge_custom_tags(&items, &spec, &mut map)
        .unwrap();

    assert_eq!(primaries(&map, 10_000, "logos"), [json!("contoso-logo")]);
    assert_eq!(primaries(&map, 20_000, "logos"), [json!("contoso-logo")]);
    assert!(map.get(0).unwrap().records("logos").is_none());
    assert_eq!(
        map.get(10_000).unwrap().records("logos").unwrap()[0].assets,
        r#"{"id": "th1", "starttime": "0:00:12", "endtime": "0:00:13", "probability": 0.97}"#
    );
}

#[test]
fn narrower_interval_yields_more_buckets() {
    let aggregator = IntervalAggregator::new(IntervalConfig::new(5_000).unwrap());
    let map = aggregator
        .parse_report(&report(
            "0:00:12",
            json!({"transcript": [transcript(1, "hi", 0.9, "0:00:04", "0:00:11")]}),
        ))
        .unwrap();

    assert_eq!(map.offsets().collect::<Vec<_>>(), [0, 5_000, 10_000]);
    assert_eq!(map.into_documents()[2].end_time, "00:00:12");
}

#[test]
fn forty_second_video_scenario() {
    let aggregator = IntervalAggregator::new(IntervalConfig::default());
    let map = aggregator
        .parse_report(&report(
            "00:00:40",
            json!({"transcript": [transcript(1, "hi", 0.9, "00:00:05", "00:00:12")]}),
        ))
        .unwrap();

    assert_eq!(map.offsets().collect::<Vec<_>>(), [0, 10_000, 20_000, 30_000]);
    assert_eq!(primaries(&map, 10_000, "transcripts"), [json!("hi")]);
    assert!(map.get(0).unwrap().records("transcripts").is_none());
    assert_eq!(map.get(30_000).unwrap().end_time, "00:00:40");
}

#[test]
fn gated_out_custom_item_needs_no_metadata() {
    let aggregator = IntervalAggregator::new(IntervalConfig::default());
    let mut map = aggregator.parse_report(&report("0:00:25", json!({}))).unwrap();
    let items = json!([
        {"imagePrediction": {"predictions": [{"tagName": "x", "probability": 0.1}]}},
    ]);
    let spec = CustomTagSpec {
        tag_field: "logo".to_string(),
        tag_group: "logos".to_string(),
    };

    aggregator
        .merge_custom_tags(&items, &spec, &mut map)
        .unwrap();
    assert!(map.iter().all(|(_, interval)| interval.slots.is_empty()));
}

fn single_assets(insights: Value, slot: &str) -> (Option<(String, Value)>, String) {
    let map = aggregate(insights).unwrap();
    let records = map.get(0).unwrap().records(slot).unwrap();
    assert_eq!(records.len(), 1, "{slot}");
    (records[0].primary.clone(), records[0].assets.clone())
}

#[test]
fn ocr_record_shape() {
    let (primary, assets) = single_assets(
        json!({"ocr": [{
            "id": 3, "text": "BREAKING", "confidence": 0.95, "left": 10, "top": 20,
            "width": 300, "height": 40, "language": "en-US",
            "instances": [{"start": "0:00:01", "end": "0:00:04"}],
        }]}),
        "ocrs",
    );
    assert_eq!(primary, Some(("ocr".to_string(), json!("BREAKING"))));
    assert_eq!(
        assets,
        r#"{"id": 3, "left": 10, "top": 20, "width": 300, "height": 40, "language": "en-US", "start": "0:00:01", "end": "0:00:04"}"#
    );
}

#[test]
fn topic_optional_fields_default_to_empty() {
    let (primary, assets) = single_assets(
        json!({"topics": [{
            "id": 5, "name": "Economy", "confidence": 0.8, "iptcName": "Economy/Markets",
            "instances": [{"start": "0:00:02", "end": "0:00:05"}],
        }]}),
        "topics",
    );
    assert_eq!(primary, Some(("topic".to_string(), json!("Economy"))));
    assert_eq!(
        assets,
        r#"{"id": 5, "referenceId": "", "referenceType": "", "iptcName": "Economy/Markets", "iabName": "", "language": "", "start": "0:00:02", "end": "0:00:05"}"#
    );
}

#[test]
fn named_location_record_shape() {
    let (primary, assets) = single_assets(
        json!({"namedLocations": [{
            "id": 1, "name": "Paris", "confidence": 0.9, "referenceId": "Paris",
            "instances": [{"instanceSource": "Transcript", "start": "0:00:03", "end": "0:00:04"}],
        }]}),
        "namedLocations",
    );
    assert_eq!(primary, Some(("namedLocation".to_string(), json!("Paris"))));
    assert_eq!(
        assets,
        r#"{"id": 1, "referenceId": "Paris", "referenceUrl": "", "description": "", "confidence": 0.9, "instanceSource": "Transcript", "start": "0:00:03", "end": "0:00:04"}"#
    );
}

#[test]
fn named_person_record_shape() {
    let (primary, assets) = single_assets(
        json!({"namedPeople": [{
            "id": 2, "name": "Ada Lovelace", "confidence": 0.7,
            "description": "Mathematician", "referenceUrl": "https://example.org/ada",
            "instances": [{"instanceSource": "Ocr", "start": "0:00:05", "end": "0:00:06"}],
        }]}),
        "namedPeople",
    );
    assert_eq!(
        primary,
        Some(("namedPerson".to_string(), json!("Ada Lovelace")))
    );
    assert_eq!(
        assets,
        r#"{"id": 2, "referenceId": "", "referenceUrl": "https://example.org/ada", "description": "Mathematician", "confidence": 0.7, "instanceSource": "Ocr", "start": "0:00:05", "end": "0:00:06"}"#
    );
}

#[test]
fn named_entities_require_instance_source() {
    let err = aggregate(json!({"namedPeople": [{
        "id": 2, "name": "Ada Lovelace", "confidence": 0.7,
        "instances": [{"start": "0:00:05", "end": "0:00:06"}],
    }]}))
    .unwrap_err();

    assert!(
        matches!(err, ClipdexError::MissingField { ref field, .. } if field == "instanceSource")
    );
}

#[test]
fn emotion_and_audio_effect_record_shapes() {
    let (primary, assets) = single_assets(
        json!({"emotions": [{"id": 4, "type": "Joy",
            "instances": [{"start": "0:00:01", "end": "0:00:02"}]}]}),
        "emotions",
    );
    assert_eq!(primary, Some(("emotion".to_string(), json!("Joy"))));
    assert_eq!(assets, r#"{"id": 4, "start": "0:00:01", "end": "0:00:02"}"#);

    let (primary, assets) = single_assets(
        json!({"audioEffects": [{"id": 6, "type": "Applause",
            "instances": [{"start": "0:00:03", "end": "0:00:09"}]}]}),
        "audioEffects",
    );
    assert_eq!(primary, Some(("audioEffect".to_string(), json!("Applause"))));
    assert_eq!(assets, r#"{"id": 6, "start": "0:00:03", "end": "0:00:09"}"#);
}

#[test]
fn brand_record_shape() {
    let (primary, assets) = single_assets(
        json!({"brands": [{
            "id": 1, "name": "Contoso", "confidence": 0.9, "referenceId": "Contoso",
            "referenceType": "Wiki", "description": "A company",
            "instances": [{"brandType": "Transcript", "start": "0:00:01", "end": "0:00:02"}],
        }]}),
        "brands",
    );
    assert_eq!(primary, Some(("brand".to_string(), json!("Contoso"))));
    assert_eq!(
        assets,
        r#"{"id": 1, "confidence": 0.9, "referenceId": "Contoso", "referenceType": "Wiki", "description": "A company", "brandType": "Transcript", "start": "0:00:01", "end": "0:00:02"}"#
    );
}
