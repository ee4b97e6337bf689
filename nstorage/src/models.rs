use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::StorageError;

/// An independently synchronized category of local record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityType {
    Course,
    GoodPractice,
    Discussion,
}

impl EntityType {
    /// Startup order of the initial reconciliation pass.
    pub const ALL: [EntityType; 3] = [
        EntityType::Course,
        EntityType::GoodPractice,
        EntityType::Discussion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Course => "course",
            EntityType::GoodPractice => "good-practice",
            EntityType::Discussion => "discussion",
        }
    }

    pub fn profile(&self) -> &'static EntityProfile {
        match self {
            EntityType::Course => &PROFILES[0],
            EntityType::GoodPractice => &PROFILES[1],
            EntityType::Discussion => &PROFILES[2],
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = StorageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "course" | "courses" => Ok(EntityType::Course),
            "good-practice" | "good-practices" => Ok(EntityType::GoodPractice),
            "discussion" | "discussions" => Ok(EntityType::Discussion),
            other => Err(StorageError::InvalidArg(format!(
                "unknown entity type '{other}'"
            ))),
        }
    }
}

/// Column layout shared by a group of entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    Content,
    Discussion,
}

/// Declarative description of how one entity type is stored and compared.
#[derive(Debug)]
pub struct EntityProfile {
    pub entity_type: EntityType,
    pub singular: &'static str,
    pub plural: &'static str,
    pub table: &'static str,
    pub shape: RecordShape,
    /// Fields copied from remote to local and compared to decide on updates.
    pub mirrored_fields: &'static [&'static str],
}

const CONTENT_MIRRORED: &[&str] = &["name", "course_status", "description"];
const DISCUSSION_MIRRORED: &[&str] = &["title", "slug", "tid"];

static PROFILES: [EntityProfile; 3] = [
    EntityProfile {
        entity_type: EntityType::Course,
        singular: "course",
        plural: "courses",
        table: "courses",
        shape: RecordShape::Content,
        mirrored_fields: CONTENT_MIRRORED,
    },
    EntityProfile {
        entity_type: EntityType::GoodPractice,
        singular: "good practice",
        plural: "good practices",
        table: "good_practices",
        shape: RecordShape::Content,
        mirrored_fields: CONTENT_MIRRORED,
    },
    EntityProfile {
        entity_type: EntityType::Discussion,
        singular: "discussion",
        plural: "discussions",
        table: "discussions",
        shape: RecordShape::Discussion,
        mirrored_fields: DISCUSSION_MIRRORED,
    },
];

/// Correlation handle between a remote record and a local one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum IdentityKey {
    Identifier(String),
    Tid(i64),
    Slug(String),
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Identifier(value) => write!(f, "identifier={value}"),
            IdentityKey::Tid(value) => write!(f, "tid={value}"),
            IdentityKey::Slug(value) => write!(f, "slug={value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFields {
    pub identifier: String,
    pub name: String,
    pub course_status: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionFields {
    pub title: String,
    pub slug: String,
    pub tid: Option<i64>,
}

/// Canonical local-shape fields of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordFields {
    Content(ContentFields),
    Discussion(DiscussionFields),
}

impl RecordFields {
    pub fn shape(&self) -> RecordShape {
        match self {
            RecordFields::Content(_) => RecordShape::Content,
            RecordFields::Discussion(_) => RecordShape::Discussion,
        }
    }

    /// Identity keys in matching priority order. Empty strings are never keys.
    pub fn identity_keys(&self) -> Vec<IdentityKey> {
        match self {
            RecordFields::Content(fields) => {
                if fields.identifier.is_empty() {
                    Vec::new()
                } else {
                    vec![IdentityKey::Identifier(fields.identifier.clone())]
                }
            }
            RecordFields::Discussion(fields) => {
                let mut keys = Vec::with_capacity(2);
                if let Some(tid) = fields.tid {
                    keys.push(IdentityKey::Tid(tid));
                }
                if !fields.slug.is_empty() {
                    keys.push(IdentityKey::Slug(fields.slug.clone()));
                }
                keys
            }
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            RecordFields::Content(fields) => &fields.name,
            RecordFields::Discussion(fields) => &fields.title,
        }
    }

    /// Value of a named field, `None` when absent or unknown to this shape.
    pub fn value(&self, field: &str) -> Option<String> {
        match self {
            RecordFields::Content(fields) => match field {
                "identifier" => Some(fields.identifier.clone()),
                "name" => Some(fields.name.clone()),
                "course_status" => Some(fields.course_status.clone()),
                "description" => Some(fields.description.clone()),
                _ => None,
            },
            RecordFields::Discussion(fields) => match field {
                "title" => Some(fields.title.clone()),
                "slug" => Some(fields.slug.clone()),
                "tid" => fields.tid.map(|tid| tid.to_string()),
                _ => None,
            },
        }
    }

    /// Mirrored fields of `profile` whose values differ between `self` and `other`.
    pub fn changed_fields(&self, other: &RecordFields, profile: &EntityProfile) -> Vec<&'static str> {
        profile
            .mirrored_fields
            .iter()
            .copied()
            .filter(|field| self.value(field) != other.value(field))
            .collect()
    }
}

/// A remote record mapped into local shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRecord {
    pub entity_type: EntityType,
    pub fields: RecordFields,
}

impl NormalizedRecord {
    pub fn new(entity_type: EntityType, fields: RecordFields) -> Self {
        Self {
            entity_type,
            fields,
        }
    }

    pub fn identity_keys(&self) -> Vec<IdentityKey> {
        self.fields.identity_keys()
    }

    pub fn display_name(&self) -> &str {
        self.fields.display_name()
    }
}

/// A persisted entity as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalRecord {
    pub id: i64,
    pub entity_type: EntityType,
    pub fields: RecordFields,
    pub published_at: Option<DateTime<Utc>>,
}
