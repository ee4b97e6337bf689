use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use chrono::{DateTime, Utc};
use nstorage::{models::EntityType, report::RunSummary, sync::DataSynchronizer};
use serde::Serialize;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

/// Cron triggers (UTC, with seconds), staggered so the three runs rarely overlap.
pub const CRON_SCHEDULES: [(EntityType, &str); 3] = [
    (EntityType::Course, "0 0 * * * *"),
    (EntityType::GoodPractice, "0 5 * * * *"),
    (EntityType::Discussion, "0 10 * * * *"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running { started_at: DateTime<Utc> },
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running { .. } => "running",
        }
    }
}

/// Run state and last outcome of one entity type.
#[derive(Debug)]
pub struct SyncSlot {
    entity_type: EntityType,
    state: Mutex<RunState>,
    last_summary: Mutex<Option<RunSummary>>,
}

impl SyncSlot {
    fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            state: Mutex::new(RunState::Idle),
            last_summary: Mutex::new(None),
        }
    }

    /// Moves the slot to `Running`, or returns `None` if a run already holds it.
    pub fn try_begin(&self) -> Option<SlotGuard<'_>> {
        let mut state = lock(&self.state);
        if let RunState::Running { .. } = *state {
            return None;
        }
        *state = RunState::Running {
            started_at: Utc::now(),
        };
        Some(SlotGuard { slot: self })
    }

    pub fn state(&self) -> RunState {
        *lock(&self.state)
    }

    pub fn last_summary(&self) -> Option<RunSummary> {
        lock(&self.last_summary).clone()
    }

    fn store_summary(&self, summary: &RunSummary) {
        *lock(&self.last_summary) = Some(summary.clone());
    }

    fn status(&self) -> SlotStatus {
        let state = self.state();
        SlotStatus {
            entity_type: self.entity_type,
            state: state.as_str(),
            running_since: match state {
                RunState::Running { started_at } => Some(started_at),
                RunState::Idle => None,
            },
            last_summary: self.last_summary(),
        }
    }
}

/// Returns its slot to `Idle` when dropped, including on panic.
#[derive(Debug)]
pub struct SlotGuard<'a> {
    slot: &'a SyncSlot,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        *lock(&self.slot.state) = RunState::Idle;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotStatus {
    pub entity_type: EntityType,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running_since: Option<DateTime<Utc>>,
    pub last_summary: Option<RunSummary>,
}

/// Serializes runs per entity type and drives them from startup, cron and manual triggers.
pub struct SyncScheduler {
    synchronizer: Arc<dyn DataSynchronizer>,
    slots: [SyncSlot; 3],
}

impl SyncScheduler {
    pub fn new(synchronizer: Arc<dyn DataSynchronizer>) -> Self {
        Self {
            synchronizer,
            slots: EntityType::ALL.map(SyncSlot::new),
        }
    }

    pub fn slot(&self, entity_type: EntityType) -> &SyncSlot {
        let index = match entity_type {
            EntityType::Course => 0,
            EntityType::GoodPractice => 1,
            EntityType::Discussion => 2,
        };
        &self.slots[index]
    }

    /// Runs one reconciliation unless the entity type is already running.
    pub async fn run_once(&self, entity_type: EntityType) -> Option<RunSummary> {
        let slot = self.slot(entity_type);
        let Some(_guard) = slot.try_begin() else {
            warn!(entity = %entity_type, "sync already in progress, skipping trigger");
            return None;
        };

        info!(entity = %entity_type, "Starting {} sync", entity_type.profile().singular);
        let summary = self.synchronizer.reconcile(entity_type).await;
        slot.store_summary(&summary);
        Some(summary)
    }

    /// Startup pass over every entity type, one after another.
    pub async fn initial_sync(&self) -> Vec<RunSummary> {
        let mut summaries = Vec::with_capacity(EntityType::ALL.len());
        for entity_type in EntityType::ALL {
            if let Some(summary) = self.run_once(entity_type).await {
                summaries.push(summary);
            }
        }
        summaries
    }

    /// Registers and starts one cron job per entity type.
    pub async fn arm(self: &Arc<Self>) -> anyhow::Result<JobScheduler> {
        let sched = JobScheduler::new().await.context("creating scheduler")?;
        for (entity_type, cron) in CRON_SCHEDULES {
            let scheduler = Arc::clone(self);
            let job = Job::new_async(cron, move |_uuid, _l| {
                let scheduler = Arc::clone(&scheduler);
                Box::pin(async move {
                    info!(entity = %entity_type, "scheduled sync triggered");
                    scheduler.run_once(entity_type).await;
                })
            })
            .with_context(|| format!("creating scheduler job for cron {cron}"))?;
            sched.add(job).await.context("adding scheduler job")?;
            info!(entity = %entity_type, cron, "sync trigger armed");
        }
        sched.start().await.context("starting scheduler")?;
        Ok(sched)
    }

    pub fn snapshot(&self) -> Vec<SlotStatus> {
        self.slots.iter().map(SyncSlot::status).collect()
    }
}
