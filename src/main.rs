/// Flowforge: workflow execution engine server
///
/// Main entry point. Loads configuration from FLOWFORGE_* environment
/// variables and starts the HTTP server.

use flowforge::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Workflow management API at /api/workflows/*
/// - Manual run dispatch at /api/workflows/{id}/run
/// - Execution inspection at /api/executions/*
/// - Webhook triggering at /webhook/{workflow_id}/*
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
