//! Courtside application binary - composition root.
//!
//! 1. Parse the CLI and load configuration from TOML
//! 2. Open the data source (in-memory demo data or SQLite)
//! 3. Pick the generative backend (Gemini, or disabled without an API key)
//! 4. Register the tools and flows
//! 5. Start the axum REST API server

mod cli;

use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use courtside_api::{start_server, AppState};
use courtside_core::config::{BackendConfig, BackendProvider, CourtsideConfig, DataSourceKind};
use courtside_core::error::CourtsideError;
use courtside_core::seed::demo_dataset;
use courtside_core::store::{DataSource, InMemoryStore};
use courtside_flows::{
    DisabledBackend, FlowOrchestrator, GeminiBackend, GenerativeBackend, ToolRegistry,
};
use courtside_storage::{Database, SqliteDataSource};

use crate::cli::{expand_home, CliArgs};

fn open_data_source(
    config: &CourtsideConfig,
    seed_demo_data: bool,
) -> Result<Arc<dyn DataSource>, CourtsideError> {
    match config.general.data_source {
        DataSourceKind::Memory => {
            tracing::info!("Using in-memory demo data");
            Ok(Arc::new(InMemoryStore::new(demo_dataset(Utc::now()))))
        }
        DataSourceKind::Sqlite => {
            let path = expand_home(&config.general.database_path);
            let source = SqliteDataSource::new(Arc::new(Database::new(&path)?));
            if seed_demo_data {
                source.import_dataset(&demo_dataset(Utc::now()))?;
                tracing::info!(path = %path.display(), "Demo data imported");
            }
            Ok(Arc::new(source))
        }
    }
}

fn select_backend(config: &BackendConfig) -> Arc<dyn GenerativeBackend> {
    match config.provider {
        BackendProvider::Disabled => {
            tracing::info!("Generative backend disabled by configuration");
            Arc::new(DisabledBackend)
        }
        BackendProvider::Gemini => match GeminiBackend::from_config(config) {
            Ok(backend) => {
                tracing::info!(model = %config.model, "Gemini backend ready");
                Arc::new(backend)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    env = %config.api_key_env,
                    "Gemini unavailable; flows will fail until an API key is set"
                );
                Arc::new(DisabledBackend)
            }
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing starts so its log level can apply.
    let config_file = args.resolve_config_path();
    let loaded = if config_file.exists() {
        CourtsideConfig::load(&config_file).map_err(Some)
    } else {
        Err(None)
    };
    let (mut config, load_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) => (CourtsideConfig::default(), e),
    };
    config.general.port = args.resolve_port(config.general.port);
    config.general.log_level = args.resolve_log_level(&config.general.log_level);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Courtside v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config. Using defaults."
        ),
    }

    let source = open_data_source(&config, args.seed_demo_data)?;
    let backend = select_backend(&config.backend);

    let tools = Arc::new(ToolRegistry::with_defaults(source));
    let orchestrator = FlowOrchestrator::with_defaults(tools, backend, config.flows.clone())?;
    tracing::info!(
        flows = ?orchestrator.names(),
        backend = orchestrator.backend_name(),
        "Flows registered"
    );

    let state = AppState::new(config.clone(), orchestrator);
    if let Err(e) = start_server(&config, state).await {
        tracing::error!(error = %e, "API server stopped");
        tracing::error!("Try: COURTSIDE_PORT={} courtside", config.general.port.saturating_add(1));
        return Err(e.into());
    }

    Ok(())
}
