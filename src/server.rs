/// Server setup and initialization
///
/// Wires together every component: SQLite pool, workflow storage and
/// registry, execution store, engine, queue backend, scheduler and HTTP
/// routes. All wiring is explicit; there are no global singletons.

use crate::{
    api::{
        create_execution_routes, create_webhook_routes, create_workflow_routes, AppState,
    },
    config::{Config, QueueBackend},
    execution::store::{ExecutionStore, SqliteLogSink},
    queue::{
        consumer::ExecutionConsumer, durable::SqliteQueue, memory::MemoryQueue, ExecutionQueue,
    },
    runtime::{engine::ExecutionEngine, executor::NodeExecutor, scheduler::ScheduleService},
    workflow::{registry::WorkflowRegistry, storage::WorkflowStorage},
};
use anyhow::Result;
use axum::{routing::get, Router};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;

/// Create the main Axum application with all routes
pub async fn create_app(config: Config) -> Result<Router> {
    tracing::info!("📁 Ensuring data directory exists: {}", config.database.data_dir);
    std::fs::create_dir_all(&config.database.data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create data directory: {}", e))?;

    let db_path = format!("{}/flowforge.db", config.database.data_dir);
    tracing::info!("🗄️ Opening SQLite database: {}", db_path);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(&db_path)
                .create_if_missing(true),
        )
        .await?;

    tracing::info!("📋 Initializing workflow storage");
    let storage = WorkflowStorage::new(pool.clone());
    storage.init_schema().await?;

    tracing::info!("🗂️ Initializing execution store");
    let store = ExecutionStore::new(pool.clone());
    store.init_schema().await?;

    tracing::info!("📊 Initializing workflow registry");
    let registry = Arc::new(WorkflowRegistry::new(storage.clone()));
    registry.init_from_storage().await?;

    tracing::info!("⚙️ Initializing node executor and execution engine");
    let executor = Arc::new(NodeExecutor::new());
    let log_sink = Arc::new(SqliteLogSink::new(store.clone()));
    let engine = Arc::new(ExecutionEngine::new(executor, log_sink));

    let consumer = Arc::new(ExecutionConsumer::new(engine, store.clone()));

    let queue: Arc<dyn ExecutionQueue> = match config.queue.backend {
        QueueBackend::Memory => {
            tracing::info!("📬 Using in-memory execution queue");
            Arc::new(MemoryQueue::start(consumer))
        }
        QueueBackend::Durable => {
            tracing::info!("📬 Using durable SQLite execution queue");
            let durable = SqliteQueue::new(pool.clone());
            durable.init_schema().await?;
            durable.spawn_worker(
                consumer,
                Duration::from_millis(config.queue.poll_interval_ms),
            );
            Arc::new(durable)
        }
    };

    tracing::info!("⏰ Initializing cron scheduler service");
    let scheduler = Arc::new(
        ScheduleService::new(Arc::clone(&registry), store.clone(), Arc::clone(&queue)).await?,
    );
    {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move {
            if let Err(e) = scheduler.start().await {
                tracing::error!("❌ Failed to start cron scheduler: {}", e);
            }
        });
    }

    let app_state = AppState {
        storage,
        registry,
        scheduler,
        store,
        queue,
    };

    tracing::info!("📡 Creating HTTP router");
    let app = Router::new()
        .route("/healthz", get(health_check))
        .merge(create_workflow_routes().with_state(app_state.clone()))
        .merge(create_execution_routes().with_state(app_state.clone()))
        .merge(create_webhook_routes().with_state(app_state));

    tracing::info!("✅ Application initialized successfully");
    Ok(app)
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting Flowforge server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "ok"
}
