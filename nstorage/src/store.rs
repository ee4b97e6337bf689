use crate::config::StorageConfig;
use crate::errors::{Result, StorageError};
use crate::models::{
    ContentFields, DiscussionFields, EntityProfile, EntityType, IdentityKey, LocalRecord,
    RecordFields, RecordShape,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::sync::{Arc, Mutex, MutexGuard};

/// Keyed access to the local persistent store, scoped to one entity type per call.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn find_all(&self, entity_type: EntityType) -> Result<Vec<LocalRecord>>;

    async fn find_one(
        &self,
        entity_type: EntityType,
        key: &IdentityKey,
    ) -> Result<Option<LocalRecord>>;

    async fn create(
        &self,
        entity_type: EntityType,
        fields: &RecordFields,
        published_at: DateTime<Utc>,
    ) -> Result<LocalRecord>;

    /// Rewrites the mirrored fields of record `id`.
    async fn update(&self, entity_type: EntityType, id: i64, fields: &RecordFields)
    -> Result<()>;

    async fn delete(&self, entity_type: EntityType, id: i64) -> Result<()>;

    async fn count(&self, entity_type: EntityType) -> Result<usize> {
        Ok(self.find_all(entity_type).await?.len())
    }
}

/// SQLite-backed [`EntityStore`] with one table per entity type.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let conn = Connection::open(&config.database_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS courses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identifier TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                course_status TEXT NOT NULL,
                description TEXT NOT NULL,
                published_at INTEGER
            );
            CREATE TABLE IF NOT EXISTS good_practices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identifier TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                course_status TEXT NOT NULL,
                description TEXT NOT NULL,
                published_at INTEGER
            );
            CREATE TABLE IF NOT EXISTS discussions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                slug TEXT NOT NULL,
                tid INTEGER UNIQUE,
                published_at INTEGER
            );
            CREATE UNIQUE INDEX IF NOT EXISTS discussions_slug_key
                ON discussions (slug) WHERE slug <> '';
            COMMIT;",
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::SyncError("store connection lock poisoned".to_string()))
    }

    fn select_sql(profile: &EntityProfile) -> String {
        match profile.shape {
            RecordShape::Content => format!(
                "SELECT id, identifier, name, course_status, description, published_at FROM {}",
                profile.table
            ),
            RecordShape::Discussion => format!(
                "SELECT id, title, slug, tid, published_at FROM {}",
                profile.table
            ),
        }
    }

    fn row_to_record(entity_type: EntityType, row: &Row<'_>) -> rusqlite::Result<LocalRecord> {
        let profile = entity_type.profile();
        let (fields, published_at): (RecordFields, Option<i64>) = match profile.shape {
            RecordShape::Content => (
                RecordFields::Content(ContentFields {
                    identifier: row.get(1)?,
                    name: row.get(2)?,
                    course_status: row.get(3)?,
                    description: row.get(4)?,
                }),
                row.get(5)?,
            ),
            RecordShape::Discussion => (
                RecordFields::Discussion(DiscussionFields {
                    title: row.get(1)?,
                    slug: row.get(2)?,
                    tid: row.get(3)?,
                }),
                row.get(4)?,
            ),
        };

        Ok(LocalRecord {
            id: row.get(0)?,
            entity_type,
            fields,
            published_at: published_at.and_then(|secs| DateTime::from_timestamp(secs, 0)),
        })
    }

    fn check_shape(entity_type: EntityType, fields: &RecordFields) -> Result<&'static EntityProfile> {
        let profile = entity_type.profile();
        if fields.shape() != profile.shape {
            return Err(StorageError::InvalidArg(format!(
                "{:?} fields cannot be stored as {}",
                fields.shape(),
                entity_type
            )));
        }
        Ok(profile)
    }
}

#[async_trait]
impl EntityStore for SqliteStore {
    async fn find_all(&self, entity_type: EntityType) -> Result<Vec<LocalRecord>> {
        let profile = entity_type.profile();
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY id", Self::select_sql(profile)))?;
        let rows = stmt.query_map([], |row| Self::row_to_record(entity_type, row))?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    async fn find_one(
        &self,
        entity_type: EntityType,
        key: &IdentityKey,
    ) -> Result<Option<LocalRecord>> {
        let profile = entity_type.profile();
        let column = match (profile.shape, key) {
            (RecordShape::Content, IdentityKey::Identifier(_)) => "identifier",
            (RecordShape::Discussion, IdentityKey::Tid(_)) => "tid",
            (RecordShape::Discussion, IdentityKey::Slug(_)) => "slug",
            _ => {
                return Err(StorageError::InvalidArg(format!(
                    "{key} is not an identity key of {entity_type}"
                )));
            }
        };
        let sql = format!("{} WHERE {} = ?1", Self::select_sql(profile), column);

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let record = match key {
            IdentityKey::Identifier(value) | IdentityKey::Slug(value) => stmt
                .query_row(params![value], |row| Self::row_to_record(entity_type, row))
                .optional()?,
            IdentityKey::Tid(value) => stmt
                .query_row(params![value], |row| Self::row_to_record(entity_type, row))
                .optional()?,
        };
        Ok(record)
    }

    async fn create(
        &self,
        entity_type: EntityType,
        fields: &RecordFields,
        published_at: DateTime<Utc>,
    ) -> Result<LocalRecord> {
        let profile = Self::check_shape(entity_type, fields)?;
        let conn = self.conn()?;
        match fields {
            RecordFields::Content(content) => {
                conn.execute(
                    &format!(
                        "INSERT INTO {} (identifier, name, course_status, description, published_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        profile.table
                    ),
                    params![
                        content.identifier,
                        content.name,
                        content.course_status,
                        content.description,
                        published_at.timestamp(),
                    ],
                )?;
            }
            RecordFields::Discussion(discussion) => {
                conn.execute(
                    &format!(
                        "INSERT INTO {} (title, slug, tid, published_at) VALUES (?1, ?2, ?3, ?4)",
                        profile.table
                    ),
                    params![
                        discussion.title,
                        discussion.slug,
                        discussion.tid,
                        published_at.timestamp(),
                    ],
                )?;
            }
        }

        Ok(LocalRecord {
            id: conn.last_insert_rowid(),
            entity_type,
            fields: fields.clone(),
            published_at: DateTime::from_timestamp(published_at.timestamp(), 0),
        })
    }

    async fn update(
        &self,
        entity_type: EntityType,
        id: i64,
        fields: &RecordFields,
    ) -> Result<()> {
        let profile = Self::check_shape(entity_type, fields)?;
        let conn = self.conn()?;
        let changed = match fields {
            RecordFields::Content(content) => conn.execute(
                &format!(
                    "UPDATE {} SET name = ?1, course_status = ?2, description = ?3 WHERE id = ?4",
                    profile.table
                ),
                params![content.name, content.course_status, content.description, id],
            )?,
            RecordFields::Discussion(discussion) => conn.execute(
                &format!(
                    "UPDATE {} SET title = ?1, slug = ?2, tid = ?3 WHERE id = ?4",
                    profile.table
                ),
                params![discussion.title, discussion.slug, discussion.tid, id],
            )?,
        };

        if changed == 0 {
            return Err(StorageError::NotFound(format!("{entity_type} #{id}")));
        }
        Ok(())
    }

    async fn delete(&self, entity_type: EntityType, id: i64) -> Result<()> {
        let profile = entity_type.profile();
        let conn = self.conn()?;
        let changed = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", profile.table),
            params![id],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("{entity_type} #{id}")));
        }
        Ok(())
    }

    async fn count(&self, entity_type: EntityType) -> Result<usize> {
        let profile = entity_type.profile();
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", profile.table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
