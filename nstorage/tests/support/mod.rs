#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nstorage::{
    NStorage,
    config::StorageConfig,
    errors::{FetchError, Result, StorageError},
    fetch::RemoteSource,
    models::{
        ContentFields, DiscussionFields, EntityType, IdentityKey, LocalRecord, NormalizedRecord,
        RecordFields,
    },
    store::{EntityStore, SqliteStore},
    sync::Reconciler,
};
use tempfile::TempDir;
use tokio::sync::Mutex;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub config: StorageConfig,
    pub store: Arc<SqliteStore>,
}

pub async fn init_test_context() -> anyhow::Result<TestContext> {
    let _ = env_logger::builder().is_test(true).try_init();

    let temp_dir = tempfile::tempdir()?;
    let config = StorageConfig::new(temp_dir.path());
    let storage = NStorage::new(config.clone()).await?;

    Ok(TestContext {
        temp_dir,
        config,
        store: storage.store,
    })
}

/// Remote source replaying a scripted response per entity type.
pub struct MockSource {
    responses: Mutex<Vec<(EntityType, std::result::Result<Vec<NormalizedRecord>, String>)>>,
    shape_failure: bool,
    pub calls: Mutex<usize>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            shape_failure: false,
            calls: Mutex::new(0),
        }
    }

    pub fn failing_with_shape_error() -> Self {
        Self {
            shape_failure: true,
            ..Self::new()
        }
    }

    pub async fn respond(&self, entity_type: EntityType, records: Vec<NormalizedRecord>) {
        let mut responses = self.responses.lock().await;
        responses.retain(|(kind, _)| *kind != entity_type);
        responses.push((entity_type, Ok(records)));
    }

    pub async fn fail(&self, entity_type: EntityType, message: &str) {
        let mut responses = self.responses.lock().await;
        responses.retain(|(kind, _)| *kind != entity_type);
        responses.push((entity_type, Err(message.to_string())));
    }
}

#[async_trait]
impl RemoteSource for MockSource {
    fn name(&self) -> &'static str {
        "mock_source"
    }

    async fn fetch(
        &self,
        entity_type: EntityType,
    ) -> std::result::Result<Vec<NormalizedRecord>, FetchError> {
        *self.calls.lock().await += 1;
        let url = format!("mock://{entity_type}");
        let responses = self.responses.lock().await;
        let scripted = responses
            .iter()
            .find(|(kind, _)| *kind == entity_type)
            .map(|(_, response)| response.clone());

        match scripted {
            Some(Ok(records)) => Ok(records),
            Some(Err(message)) if self.shape_failure => Err(FetchError::ResponseShape {
                url,
                reason: message,
            }),
            Some(Err(message)) => Err(FetchError::Transport { url, message }),
            None => Ok(Vec::new()),
        }
    }
}

/// Store wrapper that rejects writes touching selected display names.
pub struct FlakyStore {
    inner: Arc<SqliteStore>,
    failing_names: HashSet<String>,
    pub writes: Mutex<usize>,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteStore>, failing_names: &[&str]) -> Self {
        Self {
            inner,
            failing_names: failing_names.iter().map(|name| name.to_string()).collect(),
            writes: Mutex::new(0),
        }
    }

    fn check(&self, name: &str) -> Result<()> {
        if self.failing_names.contains(name) {
            return Err(StorageError::SyncError(format!("rejected write for {name}")));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for FlakyStore {
    async fn find_all(&self, entity_type: EntityType) -> Result<Vec<LocalRecord>> {
        self.inner.find_all(entity_type).await
    }

    async fn find_one(
        &self,
        entity_type: EntityType,
        key: &IdentityKey,
    ) -> Result<Option<LocalRecord>> {
        self.inner.find_one(entity_type, key).await
    }

    async fn create(
        &self,
        entity_type: EntityType,
        fields: &RecordFields,
        published_at: DateTime<Utc>,
    ) -> Result<LocalRecord> {
        *self.writes.lock().await += 1;
        self.check(fields.display_name())?;
        self.inner.create(entity_type, fields, published_at).await
    }

    async fn update(
        &self,
        entity_type: EntityType,
        id: i64,
        fields: &RecordFields,
    ) -> Result<()> {
        *self.writes.lock().await += 1;
        self.check(fields.display_name())?;
        self.inner.update(entity_type, id, fields).await
    }

    async fn delete(&self, entity_type: EntityType, id: i64) -> Result<()> {
        *self.writes.lock().await += 1;
        let existing = self
            .inner
            .find_all(entity_type)
            .await?
            .into_iter()
            .find(|record| record.id == id);
        if let Some(record) = existing {
            self.check(record.fields.display_name())?;
        }
        self.inner.delete(entity_type, id).await
    }

    async fn count(&self, entity_type: EntityType) -> Result<usize> {
        self.inner.count(entity_type).await
    }
}

pub fn reconciler(store: Arc<dyn EntityStore>, source: Arc<MockSource>) -> Reconciler {
    Reconciler::new(store, source)
}

pub fn course(identifier: &str, name: &str, description: &str) -> NormalizedRecord {
    NormalizedRecord::new(EntityType::Course, content(identifier, name, description))
}

pub fn good_practice(identifier: &str, name: &str) -> NormalizedRecord {
    NormalizedRecord::new(EntityType::GoodPractice, content(identifier, name, ""))
}

pub fn content(identifier: &str, name: &str, description: &str) -> RecordFields {
    RecordFields::Content(ContentFields {
        identifier: identifier.to_string(),
        name: name.to_string(),
        course_status: "Live".to_string(),
        description: description.to_string(),
    })
}

pub fn discussion(title: &str, slug: &str, tid: Option<i64>) -> NormalizedRecord {
    NormalizedRecord::new(
        EntityType::Discussion,
        RecordFields::Discussion(DiscussionFields {
            title: title.to_string(),
            slug: slug.to_string(),
            tid,
        }),
    )
}

pub async fn seed(store: &SqliteStore, entity_type: EntityType, fields: RecordFields) -> LocalRecord {
    store
        .create(entity_type, &fields, Utc::now())
        .await
        .expect("seed record")
}

pub async fn names(store: &SqliteStore, entity_type: EntityType) -> Vec<String> {
    let mut names: Vec<String> = store
        .find_all(entity_type)
        .await
        .expect("list records")
        .into_iter()
        .map(|record| record.fields.display_name().to_string())
        .collect();
    names.sort();
    names
}
