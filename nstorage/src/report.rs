use crate::models::EntityType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Outcome of reconciling one remote record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Created,
    Updated,
    Skipped,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialFailure,
    NoOp,
    Aborted,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub entity_type: EntityType,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub failed: usize,
    pub total_processed: usize,
    pub total_in_store: Option<usize>,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RunSummary {
    pub fn changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

/// Accumulates the counters of a single run.
#[derive(Debug)]
pub struct RunReport {
    run_id: Uuid,
    entity_type: EntityType,
    started_at: DateTime<Utc>,
    created: usize,
    updated: usize,
    skipped: usize,
    deleted: usize,
    failed: usize,
    total_processed: usize,
}

impl RunReport {
    pub fn start(entity_type: EntityType) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            entity_type,
            started_at: Utc::now(),
            created: 0,
            updated: 0,
            skipped: 0,
            deleted: 0,
            failed: 0,
            total_processed: 0,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn set_total_processed(&mut self, total: usize) {
        self.total_processed = total;
    }

    pub fn record(&mut self, decision: Decision) {
        match decision {
            Decision::Created => self.created += 1,
            Decision::Updated => self.updated += 1,
            Decision::Skipped => self.skipped += 1,
            Decision::Deleted => self.deleted += 1,
        }
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// Closes a run that applied its decisions and logs the outcome.
    pub fn finish(self, total_in_store: Option<usize>) -> RunSummary {
        let status = if self.failed > 0 {
            RunStatus::PartialFailure
        } else {
            RunStatus::Success
        };
        let summary = self.into_summary(status, total_in_store, None);
        log_summary(&summary);
        summary
    }

    /// Closes a run that never reached the diff stage; the store is unchanged.
    pub fn halt(
        self,
        status: RunStatus,
        message: impl Into<String>,
        total_in_store: Option<usize>,
    ) -> RunSummary {
        let summary = self.into_summary(status, total_in_store, Some(message.into()));
        log_summary(&summary);
        summary
    }

    fn into_summary(
        self,
        status: RunStatus,
        total_in_store: Option<usize>,
        message: Option<String>,
    ) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            entity_type: self.entity_type,
            started_at: self.started_at,
            finished_at: Utc::now(),
            created: self.created,
            updated: self.updated,
            skipped: self.skipped,
            deleted: self.deleted,
            failed: self.failed,
            total_processed: self.total_processed,
            total_in_store,
            status,
            message,
        }
    }
}

fn log_summary(summary: &RunSummary) {
    let plural = summary.entity_type.profile().plural;
    match summary.status {
        RunStatus::Success | RunStatus::PartialFailure => {
            log::info!(
                "{} synchronization finished ({:?}) run={}",
                plural,
                summary.status,
                summary.run_id
            );
            log::info!("   - created: {}", summary.created);
            log::info!("   - updated: {}", summary.updated);
            log::info!("   - skipped: {}", summary.skipped);
            log::info!("   - deleted: {}", summary.deleted);
            log::info!("   - failed: {}", summary.failed);
            log::info!("   - total processed: {}", summary.total_processed);
            match summary.total_in_store {
                Some(total) => log::info!("   - total in store: {}", total),
                None => log::info!("   - total in store: unknown"),
            }
        }
        RunStatus::NoOp | RunStatus::Aborted => {
            log::info!(
                "{} synchronization ended without changes ({:?}) run={}: {}",
                plural,
                summary.status,
                summary.run_id,
                summary.message.as_deref().unwrap_or("")
            );
            if let Some(total) = summary.total_in_store {
                log::info!("   - total in store: {}", total);
            }
        }
    }
}
