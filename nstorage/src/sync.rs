use crate::errors::FetchError;
use crate::fetch::RemoteSource;
use crate::models::{EntityType, IdentityKey, LocalRecord, NormalizedRecord, RecordFields};
use crate::report::{Decision, RunReport, RunStatus, RunSummary};
use crate::store::EntityStore;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Defines the core interface for reconciling local state with a remote source.
#[async_trait]
pub trait DataSynchronizer: Send + Sync {
    /// Runs one complete reconciliation pass for `entity_type`.
    ///
    /// Never fails: fetch problems abort the run with zero changes and
    /// per-record write problems are counted, both surfacing in the summary.
    async fn reconcile(&self, entity_type: EntityType) -> RunSummary;
}

/// Local records of one entity type, addressable by every identity key.
struct LocalIndex {
    records: Vec<LocalRecord>,
    by_key: HashMap<IdentityKey, usize>,
}

impl LocalIndex {
    fn build(records: Vec<LocalRecord>) -> Self {
        let mut index = Self {
            records: Vec::with_capacity(records.len()),
            by_key: HashMap::new(),
        };
        for record in records {
            index.insert(record);
        }
        index
    }

    fn insert(&mut self, record: LocalRecord) -> usize {
        let slot = self.records.len();
        for key in record.fields.identity_keys() {
            if let Some(existing) = self.by_key.get(&key) {
                log::warn!(
                    "Local {} #{} shares {} with #{}; keeping the earlier record for matching",
                    record.entity_type,
                    record.id,
                    key,
                    self.records[*existing].id
                );
                continue;
            }
            self.by_key.insert(key, slot);
        }
        self.records.push(record);
        slot
    }

    /// Slots hit by `keys`, in key priority order, without repeats.
    fn lookup(&self, keys: &[IdentityKey]) -> Vec<usize> {
        let mut hits = Vec::new();
        for key in keys {
            if let Some(slot) = self.by_key.get(key) {
                if !hits.contains(slot) {
                    hits.push(*slot);
                }
            }
        }
        hits
    }

    fn replace_fields(&mut self, slot: usize, fields: RecordFields) {
        for key in self.records[slot].fields.identity_keys() {
            if self.by_key.get(&key) == Some(&slot) {
                self.by_key.remove(&key);
            }
        }
        for key in fields.identity_keys() {
            self.by_key.entry(key).or_insert(slot);
        }
        self.records[slot].fields = fields;
    }
}

/// Generic reconciliation engine shared by every entity type.
pub struct Reconciler {
    store: Arc<dyn EntityStore>,
    source: Arc<dyn RemoteSource>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn EntityStore>, source: Arc<dyn RemoteSource>) -> Self {
        Self { store, source }
    }

    async fn total_in_store(&self, entity_type: EntityType) -> Option<usize> {
        match self.store.count(entity_type).await {
            Ok(total) => Some(total),
            Err(err) => {
                log::warn!(
                    "Could not count local {}: {}",
                    entity_type.profile().plural,
                    err
                );
                None
            }
        }
    }

    async fn apply(
        &self,
        report: &mut RunReport,
        remote: Vec<NormalizedRecord>,
        locals: Vec<LocalRecord>,
    ) {
        let entity_type = report.entity_type();
        let profile = entity_type.profile();

        let remote_keys: HashSet<IdentityKey> = remote
            .iter()
            .flat_map(|record| record.identity_keys())
            .collect();

        let mut index = LocalIndex::build(locals);
        let initial_len = index.records.len();
        let mut claimed: HashMap<usize, String> = HashMap::new();

        for record in remote {
            let keys = record.identity_keys();
            if keys.is_empty() {
                log::warn!(
                    "Skipping {} '{}': no identity key in remote record",
                    profile.singular,
                    record.display_name()
                );
                report.record_failure();
                continue;
            }

            let hits = index.lookup(&keys);
            if hits.len() > 1 {
                let ids: Vec<i64> = hits.iter().map(|slot| index.records[*slot].id).collect();
                log::warn!(
                    "Remote {} '{}' matches several local records {:?}; using #{}",
                    profile.singular,
                    record.display_name(),
                    ids,
                    ids[0]
                );
            }

            let Some(slot) = hits.first().copied() else {
                match self
                    .store
                    .create(entity_type, &record.fields, Utc::now())
                    .await
                {
                    Ok(created) => {
                        log::info!("Created {}: {}", profile.singular, record.display_name());
                        let slot = index.insert(created);
                        claimed.insert(slot, keys[0].to_string());
                        report.record(Decision::Created);
                    }
                    Err(err) => {
                        log::error!(
                            "Error creating {} '{}' ({}): {}",
                            profile.singular,
                            record.display_name(),
                            keys[0],
                            err
                        );
                        report.record_failure();
                    }
                }
                continue;
            };

            if let Some(previous) = claimed.insert(slot, keys[0].to_string()) {
                log::warn!(
                    "Local {} #{} matched again by {} after {}; the later remote record wins",
                    profile.singular,
                    index.records[slot].id,
                    keys[0],
                    previous
                );
            }

            let local = &index.records[slot];
            let changed = local.fields.changed_fields(&record.fields, profile);
            if changed.is_empty() {
                report.record(Decision::Skipped);
                continue;
            }

            let local_id = local.id;
            match self
                .store
                .update(entity_type, local_id, &record.fields)
                .await
            {
                Ok(()) => {
                    log::info!(
                        "Updated {}: {} ({})",
                        profile.singular,
                        record.display_name(),
                        changed.join(", ")
                    );
                    index.replace_fields(slot, record.fields);
                    report.record(Decision::Updated);
                }
                Err(err) => {
                    log::error!(
                        "Error updating {} '{}' (#{}): {}",
                        profile.singular,
                        record.display_name(),
                        local_id,
                        err
                    );
                    report.record_failure();
                }
            }
        }

        for local in index.records.iter().take(initial_len) {
            let still_remote = local
                .fields
                .identity_keys()
                .iter()
                .any(|key| remote_keys.contains(key));
            if still_remote {
                continue;
            }

            match self.store.delete(entity_type, local.id).await {
                Ok(()) => {
                    log::info!(
                        "Deleted {}: {}",
                        profile.singular,
                        local.fields.display_name()
                    );
                    report.record(Decision::Deleted);
                }
                Err(err) => {
                    log::error!(
                        "Error deleting {} '{}' (#{}): {}",
                        profile.singular,
                        local.fields.display_name(),
                        local.id,
                        err
                    );
                    report.record_failure();
                }
            }
        }
    }
}

#[async_trait]
impl DataSynchronizer for Reconciler {
    async fn reconcile(&self, entity_type: EntityType) -> RunSummary {
        let profile = entity_type.profile();
        let mut report = RunReport::start(entity_type);
        log::info!(
            "Starting {} synchronization from {} (run={})",
            profile.singular,
            self.source.name(),
            report.run_id()
        );

        let remote = match self.source.fetch(entity_type).await {
            Ok(records) => records,
            Err(err @ FetchError::ResponseShape { .. }) => {
                log::warn!("No {} found in API response: {}", profile.plural, err);
                let total = self.total_in_store(entity_type).await;
                return report.halt(RunStatus::Aborted, err.to_string(), total);
            }
            Err(err) => {
                log::error!("Error fetching {} from API: {}", profile.plural, err);
                let total = self.total_in_store(entity_type).await;
                return report.halt(RunStatus::Aborted, err.to_string(), total);
            }
        };

        if remote.is_empty() {
            log::warn!("No {} found in API response", profile.plural);
            let total = self.total_in_store(entity_type).await;
            return report.halt(RunStatus::NoOp, "remote collection is empty", total);
        }
        report.set_total_processed(remote.len());

        let locals = match self.store.find_all(entity_type).await {
            Ok(locals) => locals,
            Err(err) => {
                log::error!("Error loading local {}: {}", profile.plural, err);
                return report.halt(RunStatus::Aborted, err.to_string(), None);
            }
        };

        self.apply(&mut report, remote, locals).await;

        let total_in_store = self.total_in_store(entity_type).await;
        report.finish(total_in_store)
    }
}
