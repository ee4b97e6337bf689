pub mod config;
pub mod lifecycle;
pub mod scheduler;

use std::{
    future::{Future, IntoFuture},
    net::SocketAddr,
    sync::Arc,
};

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::{Args, Parser, Subcommand};
use nstorage::{
    config::StorageConfig,
    errors::StorageError,
    models::EntityType,
    report::{RunStatus, RunSummary},
    sync::DataSynchronizer,
    NStorage,
};
use nulpfetcher::NulpFetcher;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, signal};
use tokio_cron_scheduler::JobScheduler;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{SourceArgs, StoreArgs, DEFAULT_BIND};
use crate::scheduler::{SlotStatus, SyncScheduler};

/// Runs the command line interface for the nsync service.
pub async fn run_cli() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let cli = Cli::parse();
    match cli.command {
        Some(Command::Serve(args)) => run_serve(args).await?,
        Some(Command::Sync(args)) => run_sync(args).await?,
        None => {
            println!("No subcommand provided. Use --help to see available commands.");
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Runs the initial sync, arms the hourly triggers and serves the status API
    Serve(ServeArgs),
    /// Runs one reconciliation per selected entity type and prints the summaries
    Sync(SyncArgs),
}

#[derive(Args)]
struct ServeArgs {
    #[command(flatten)]
    sources: SourceArgs,
    #[command(flatten)]
    store: StoreArgs,
    /// Socket address to bind the status API
    #[arg(long, env = "NSYNC_BIND", default_value = DEFAULT_BIND)]
    bind: String,
}

#[derive(Args)]
struct SyncArgs {
    #[command(flatten)]
    sources: SourceArgs,
    #[command(flatten)]
    store: StoreArgs,
    /// Entity type to sync (course, good-practice, discussion); all when omitted
    #[arg(long)]
    entity: Option<EntityType>,
}

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<SyncScheduler>,
}

impl AppState {
    pub fn new(scheduler: Arc<SyncScheduler>) -> Self {
        Self { scheduler }
    }
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[derive(Deserialize)]
struct SyncRequest {
    entity: String,
}

#[derive(Serialize)]
struct StatusResponse {
    entities: Vec<SlotStatus>,
}

type ApiResult<T> = Result<T, ApiError>;

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

async fn open_synchronizer(
    sources: &SourceArgs,
    store: &StoreArgs,
) -> anyhow::Result<Arc<dyn DataSynchronizer>> {
    let fetcher =
        NulpFetcher::from_settings(&sources.settings()).context("invalid source configuration")?;
    let config = StorageConfig::with_database_path(&store.db_path);
    let storage = NStorage::new(config)
        .await
        .with_context(|| format!("failed to open content store {}", store.db_path.display()))?;
    info!("Content store at {}", store.db_path.display());
    Ok(Arc::new(storage.synchronizer(Arc::new(fetcher))))
}

async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    lifecycle::register();

    let addr: SocketAddr = args.bind.parse().context("failed to parse bind address")?;
    let synchronizer = open_synchronizer(&args.sources, &args.store).await?;
    let scheduler = Arc::new(SyncScheduler::new(synchronizer));

    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind status listener")?;
    info!("Status API listening on {}", addr);

    serve(
        listener,
        AppState::new(Arc::clone(&scheduler)),
        lifecycle::bootstrap(scheduler),
        shutdown_signal(),
    )
    .await
}

/// Serves the status API while `bootstrap` runs; a failed bootstrap stops the server.
pub async fn serve<B, S>(
    listener: TcpListener,
    state: AppState,
    bootstrap: B,
    shutdown: S,
) -> anyhow::Result<()>
where
    B: Future<Output = anyhow::Result<JobScheduler>>,
    S: Future<Output = ()> + Send + 'static,
{
    let server = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .into_future();
    tokio::pin!(server);
    tokio::pin!(bootstrap);

    let mut cron = tokio::select! {
        armed = &mut bootstrap => match armed {
            Ok(cron) => cron,
            Err(err) => {
                error!("Bootstrap failed, stopping the status API: {:#}", err);
                return Err(err.context("bootstrap failed"));
            }
        },
        served = &mut server => {
            served.context("status server error")?;
            warn!("Shutdown requested before the initial sync finished");
            return Ok(());
        }
    };

    server.await.context("status server error")?;
    cron.shutdown().await.context("stopping scheduler")?;
    info!("Scheduler stopped");
    Ok(())
}

async fn run_sync(args: SyncArgs) -> anyhow::Result<()> {
    let synchronizer = open_synchronizer(&args.sources, &args.store).await?;
    let scheduler = SyncScheduler::new(synchronizer);

    let summaries = match args.entity {
        Some(entity_type) => scheduler.run_once(entity_type).await.into_iter().collect(),
        None => scheduler.initial_sync().await,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&summaries).context("failed to render summaries")?
    );

    let aborted = summaries
        .iter()
        .filter(|summary| summary.status == RunStatus::Aborted)
        .count();
    if aborted > 0 {
        anyhow::bail!("{aborted} sync run(s) aborted");
    }
    Ok(())
}

/// Builds the HTTP router used by the status API.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/sync", post(trigger_sync))
        .with_state(state)
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        entities: state.scheduler.snapshot(),
    })
}

async fn trigger_sync(
    State(state): State<AppState>,
    Json(payload): Json<SyncRequest>,
) -> ApiResult<Json<RunSummary>> {
    let entity_type: EntityType = payload.entity.parse()?;

    match state.scheduler.run_once(entity_type).await {
        Some(summary) => Ok(Json(summary)),
        None => Err(ApiError::Conflict(format!(
            "{entity_type} sync already in progress"
        ))),
    }
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("Shutdown signal received");
}

impl From<StorageError> for ApiError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::InvalidArg(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
