use std::sync::Arc;

use tokio_cron_scheduler::JobScheduler;
use tracing::{debug, info};

use crate::scheduler::SyncScheduler;

/// Runs before anything is initialized. Nothing needs registering yet.
pub fn register() {
    debug!("register hook: nothing to register");
}

/// Initial sync of every entity type, then arms the cron triggers.
pub async fn bootstrap(scheduler: Arc<SyncScheduler>) -> anyhow::Result<JobScheduler> {
    info!("Running initial sync");
    let summaries = scheduler.initial_sync().await;
    info!(runs = summaries.len(), "Initial sync finished");
    scheduler.arm().await
}
