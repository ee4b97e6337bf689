use nstorage::models::{ContentFields, DiscussionFields, EntityType, NormalizedRecord, RecordFields};

use crate::models::{RawContent, RawTopic};

const DEFAULT_STATUS: &str = "Live";
const UNTITLED_DISCUSSION: &str = "Untitled Discussion";

/// Maps a content search item into a course or good practice.
pub fn normalize_content(raw: &RawContent, entity_type: EntityType) -> NormalizedRecord {
    NormalizedRecord::new(
        entity_type,
        RecordFields::Content(ContentFields {
            identifier: raw.identifier.clone().unwrap_or_default(),
            name: raw.name.clone().unwrap_or_default(),
            course_status: non_empty(raw.status.as_deref()).unwrap_or(DEFAULT_STATUS).to_string(),
            description: raw.description.clone().unwrap_or_default(),
        }),
    )
}

/// Maps a forum topic into a discussion. A tid of 0 counts as missing.
pub fn normalize_topic(raw: &RawTopic) -> NormalizedRecord {
    NormalizedRecord::new(
        EntityType::Discussion,
        RecordFields::Discussion(DiscussionFields {
            title: non_empty(raw.title.as_deref())
                .unwrap_or(UNTITLED_DISCUSSION)
                .to_string(),
            slug: raw.slug.clone().unwrap_or_default(),
            tid: raw.tid.filter(|tid| *tid != 0),
        }),
    )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}
