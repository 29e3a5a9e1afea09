pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod models;
pub mod services;

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tower_sessions::session_store::ExpiredDeletion;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub use cli::{Cli, Commands};
pub use config::Config;
use db::Store;
use models::user::Role;

/// Entry point for the binary: the command line is parsed before any config
/// is read, so `--help` and `init-config` work with a broken config file.
pub fn main_entry() -> anyhow::Result<()> {
    let command = Cli::parse().command.unwrap_or(Commands::Serve);

    if !command.needs_config() {
        return cli::cmd_init_config();
    }

    let config = Config::load()?;
    let worker_threads = config.general.worker_threads;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();

    if worker_threads > 0 {
        builder.worker_threads(worker_threads);
    }

    let runtime = builder.build()?;
    runtime.block_on(run(command, config))
}

pub async fn run(command: Commands, config: Config) -> anyhow::Result<()> {
    if command.needs_valid_config() {
        config.validate()?;
    }

    init_tracing(&config);
    config.log_sources();

    match command {
        Commands::Serve => serve(config).await,
        Commands::Users => cli::cmd_list_users(&config).await,
        Commands::Promote { email } => cli::cmd_set_role(&config, &email, Role::Admin).await,
        Commands::Demote { email } => cli::cmd_set_role(&config, &email, Role::User).await,
        Commands::InitConfig => cli::cmd_init_config(),
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.general.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!("Members v{} starting...", env!("CARGO_PKG_VERSION"));

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let port = config.server.port;
    let cleanup_interval = Duration::from_secs(config.session.cleanup_interval_seconds.max(1));

    let state = api::create_app_state(config, store.clone(), prometheus_handle).await?;

    // Expiry is enforced on load; this only reclaims rows.
    let deletion_task = tokio::spawn({
        let sessions = state.sessions.clone();
        async move {
            if let Err(e) = sessions.continuously_delete_expired(cleanup_interval).await {
                error!("Session cleanup task failed: {}", e);
            }
        }
    });

    let app = api::router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("🌐 Web Server running at http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    deletion_task.abort();
    store.close().await?;

    served.context("Web server error")?;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}
