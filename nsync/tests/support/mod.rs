#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nstorage::{
    models::EntityType,
    report::{Decision, RunReport, RunSummary},
    sync::DataSynchronizer,
};
use nsync::scheduler::SyncScheduler;
use tokio::sync::{Notify, Semaphore};

/// Records every reconcile call; gated instances block until `release` is called.
pub struct FakeSynchronizer {
    calls: Mutex<Vec<EntityType>>,
    started: Notify,
    gate: Option<Semaphore>,
}

impl FakeSynchronizer {
    pub fn immediate() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            started: Notify::new(),
            gate: None,
        })
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            started: Notify::new(),
            gate: Some(Semaphore::new(0)),
        })
    }

    pub fn calls(&self) -> Vec<EntityType> {
        self.calls.lock().unwrap().clone()
    }

    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn release(&self, runs: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(runs);
        }
    }
}

#[async_trait]
impl DataSynchronizer for FakeSynchronizer {
    async fn reconcile(&self, entity_type: EntityType) -> RunSummary {
        self.calls.lock().unwrap().push(entity_type);
        self.started.notify_one();
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        let mut report = RunReport::start(entity_type);
        report.set_total_processed(1);
        report.record(Decision::Created);
        report.finish(Some(1))
    }
}

pub fn scheduler_with(fake: &Arc<FakeSynchronizer>) -> Arc<SyncScheduler> {
    let synchronizer: Arc<dyn DataSynchronizer> = fake.clone();
    Arc::new(SyncScheduler::new(synchronizer))
}
