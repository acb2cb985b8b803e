//! Declarative description of every insight category the aggregator knows.
//!
//! Each [`CategoryDescriptor`] says which events qualify ([`Gate`]), and which
//! records they produce ([`RecordPass`]): the slot name, the primary field and
//! the ordered list of asset fields. The merge routine in
//! [`crate::aggregator`] interprets these tables; no category has code of its
//! own.

/// Where an asset or primary field is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The annotation event, e.g. one face.
    Event,
    /// A nested item of the event, e.g. one thumbnail of a face.
    Item,
    /// The time instance currently being placed.
    Instance,
}

/// Which events of a category contribute records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gate {
    Always,
    /// The field must not be the empty string.
    NonEmpty(&'static str),
    /// The numeric field must exceed the threshold.
    Above(&'static str, f64),
    /// Both of the above, evaluated in order.
    NonEmptyAndAbove {
        text: &'static str,
        score: &'static str,
        threshold: f64,
    },
}

pub const SCORE_THRESHOLD: f64 = 0.5;

const fn text_and_score(text: &'static str, score: &'static str) -> Gate {
    Gate::NonEmptyAndAbove {
        text,
        score,
        threshold: SCORE_THRESHOLD,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primary {
    /// Record carries only `assets`.
    None,
    /// Copy the source value as is.
    Copy {
        scope: Scope,
        source: &'static str,
        target: &'static str,
    },
    /// Render the source value as a string.
    Stringify {
        source: &'static str,
        target: &'static str,
    },
}

const fn copy(source: &'static str, target: &'static str) -> Primary {
    Primary::Copy {
        scope: Scope::Event,
        source,
        target,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetField {
    pub key: &'static str,
    pub scope: Scope,
    pub source: &'static str,
    /// Missing optional fields are written as `""`.
    pub required: bool,
}

const fn event(key: &'static str) -> AssetField {
    AssetField {
        key,
        scope: Scope::Event,
        source: key,
        required: true,
    }
}

const fn event_opt(key: &'static str) -> AssetField {
    AssetField {
        key,
        scope: Scope::Event,
        source: key,
        required: false,
    }
}

const fn instance(key: &'static str) -> AssetField {
    AssetField {
        key,
        scope: Scope::Instance,
        source: key,
        required: true,
    }
}

const fn instance_opt(key: &'static str) -> AssetField {
    AssetField {
        key,
        scope: Scope::Instance,
        source: key,
        required: false,
    }
}

const fn item_as(key: &'static str, source: &'static str) -> AssetField {
    AssetField {
        key,
        scope: Scope::Item,
        source,
        required: true,
    }
}

const START: AssetField = instance("start");
const END: AssetField = instance("end");

/// One kind of record emitted for a qualifying event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordPass {
    pub slot: &'static str,
    /// When set, iterate this optional array of the event and place the
    /// instances of each item instead of the event's own instances.
    pub items: Option<&'static str>,
    pub primary: Primary,
    pub assets: &'static [AssetField],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryDescriptor {
    /// Key of the event array under `insights`.
    pub key: &'static str,
    pub gate: Gate,
    pub passes: &'static [RecordPass],
}

impl CategoryDescriptor {
    pub fn slots(&self) -> impl Iterator<Item = &'static str> + use<> {
        self.passes.iter().map(|pass| pass.slot)
    }
}

/// A category emitting one record kind from the event's own instances.
macro_rules! category {
    ($key:literal, $gate:expr, $slot:literal, $primary:expr, $assets:expr $(,)?) => {
        CategoryDescriptor {
            key: $key,
            gate: $gate,
            passes: &[RecordPass {
                slot: $slot,
                items: None,
                primary: $primary,
                assets: $assets,
            }],
        }
    };
}

pub const TRANSCRIPT: CategoryDescriptor = category!(
    "transcript",
    text_and_score("text", "confidence"),
    "transcripts",
    copy("text", "transcript"),
    &[event("id"), event("speakerId"), event("language"), START, END],
);

pub const OCR: CategoryDescriptor = category!(
    "ocr",
    text_and_score("text", "confidence"),
    "ocrs",
    copy("text", "ocr"),
    &[
        event("id"),
        event("left"),
        event("top"),
        event("width"),
        event("height"),
        event("language"),
        START,
        END,
    ],
);

pub const KEYWORDS: CategoryDescriptor = category!(
    "keywords",
    text_and_score("text", "confidence"),
    "keywords",
    copy("text", "keyword"),
    &[event("id"), event("language"), START, END],
);

pub const TOPICS: CategoryDescriptor = category!(
    "topics",
    text_and_score("name", "confidence"),
    "topics",
    copy("name", "topic"),
    &[
        event("id"),
        event_opt("referenceId"),
        event_opt("referenceType"),
        event_opt("iptcName"),
        event_opt("iabName"),
        event_opt("language"),
        START,
        END,
    ],
);

const FACE_ID: AssetField = event("id");
const FACE_DESCRIPTION: AssetField = event_opt("description");
const FACE_THUMBNAIL_ID: AssetField = event_opt("thumbnailId");
const FACE_KNOWN_PERSON_ID: AssetField = event_opt("knownPersonId");
const FACE_TITLE: AssetField = event_opt("title");
const FACE_IMAGE_URL: AssetField = event_opt("imageUrl");

pub const FACES: CategoryDescriptor = CategoryDescriptor {
    key: "faces",
    gate: text_and_score("name", "confidence"),
    passes: &[
        RecordPass {
            slot: "faces",
            items: None,
            primary: copy("name", "face"),
            assets: &[
                FACE_ID,
                FACE_DESCRIPTION,
                FACE_THUMBNAIL_ID,
                FACE_KNOWN_PERSON_ID,
                FACE_TITLE,
                FACE_IMAGE_URL,
                instance_opt("thumbnailsIds"),
                START,
                END,
            ],
        },
        RecordPass {
            slot: "thumbnails",
            items: Some("thumbnails"),
            primary: Primary::Copy {
                scope: Scope::Item,
                source: "fileName",
                target: "thumbnail",
            },
            assets: &[
                FACE_ID,
                FACE_DESCRIPTION,
                FACE_THUMBNAIL_ID,
                FACE_KNOWN_PERSON_ID,
                FACE_TITLE,
                FACE_IMAGE_URL,
                item_as("thumbnailsIds", "id"),
                START,
                END,
            ],
        },
    ],
};

pub const LABELS: CategoryDescriptor = category!(
    "labels",
    Gate::NonEmpty("name"),
    "labels",
    copy("name", "label"),
    &[
        event("id"),
        event_opt("referenceId"),
        event_opt("language"),
        START,
        END,
    ],
);

const NAMED_ENTITY_ASSETS: &[AssetField] = &[
    event("id"),
    event_opt("referenceId"),
    event_opt("referenceUrl"),
    event_opt("description"),
    event_opt("confidence"),
    instance("instanceSource"),
    START,
    END,
];

pub const NAMED_LOCATIONS: CategoryDescriptor = category!(
    "namedLocations",
    text_and_score("name", "confidence"),
    "namedLocations",
    copy("name", "namedLocation"),
    NAMED_ENTITY_ASSETS,
);

pub const NAMED_PEOPLE: CategoryDescriptor = category!(
    "namedPeople",
    text_and_score("name", "confidence"),
    "namedPeople",
    copy("name", "namedPerson"),
    NAMED_ENTITY_ASSETS,
);

const ID_AND_SPAN: &[AssetField] = &[event("id"), START, END];

pub const AUDIO_EFFECTS: CategoryDescriptor = category!(
    "audioEffects",
    Gate::NonEmpty("type"),
    "audioEffects",
    copy("type", "audioEffect"),
    ID_AND_SPAN,
);

pub const SENTIMENTS: CategoryDescriptor = category!(
    "sentiments",
    text_and_score("sentimentType", "averageScore"),
    "sentiments",
    copy("sentimentType", "sentimentType"),
    &[event("id"), event_opt("averageScore"), START, END],
);

pub const EMOTIONS: CategoryDescriptor = category!(
    "emotions",
    Gate::NonEmpty("type"),
    "emotions",
    copy("type", "emotion"),
    ID_AND_SPAN,
);

pub const VISUAL_CONTENT_MODERATION: CategoryDescriptor = CategoryDescriptor {
    key: "visualContentModeration",
    gate: Gate::Always,
    passes: &[
        RecordPass {
            slot: "adultScores",
            items: None,
            primary: Primary::Stringify {
                source: "adultScore",
                target: "adultScore",
            },
            assets: ID_AND_SPAN,
        },
        RecordPass {
            slot: "racyScores",
            items: None,
            primary: Primary::Stringify {
                source: "racyScore",
                target: "racyScore",
            },
            assets: ID_AND_SPAN,
        },
    ],
};

pub const FRAME_PATTERNS: CategoryDescriptor = category!(
    "framePatterns",
    Gate::Above("confidence", SCORE_THRESHOLD),
    "framePatterns",
    Primary::None,
    ID_AND_SPAN,
);

pub const BRANDS: CategoryDescriptor = category!(
    "brands",
    text_and_score("name", "confidence"),
    "brands",
    copy("name", "brand"),
    &[
        event("id"),
        event("confidence"),
        event("referenceId"),
        event("referenceType"),
        event("description"),
        instance("brandType"),
        START,
        END,
    ],
);

/// Every built-in category in the order reports are merged.
pub const CATEGORIES: &[CategoryDescriptor] = &[
    TRANSCRIPT,
    OCR,
    KEYWORDS,
    TOPICS,
    FACES,
    LABELS,
    NAMED_LOCATIONS,
    NAMED_PEOPLE,
    AUDIO_EFFECTS,
    SENTIMENTS,
    EMOTIONS,
    VISUAL_CONTENT_MODERATION,
    FRAME_PATTERNS,
    BRANDS,
];

pub fn find(key: &str) -> Option<&'static CategoryDescriptor> {
    CATEGORIES.iter().find(|descriptor| descriptor.key == key)
}
