use std::sync::Arc;

use anyhow::Context;
use axum::http::{header::CONTENT_TYPE, Method};
use clap::Parser;
use faasbox_cli::{DaemonSettings, FaasboxdArgs};
use faasbox_core::{engine::ExecutionEngine, health::HealthSupervisor, pool::EnvironmentPool};
use faasbox_server::{route, state::AppState};
use faasbox_utils::{CHECKMARK, CROSS};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

//--------------------------------------------------------------------------------------------------
// Functions: Main
//--------------------------------------------------------------------------------------------------

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = FaasboxdArgs::parse();
    let settings = DaemonSettings::resolve(args).context("invalid configuration")?;
    let config = Arc::new(settings.server_config()?);

    if let Err(e) = run(settings, config).await {
        eprintln!("{} {:#}", &*CROSS, e);
        return Err(e);
    }

    Ok(())
}

async fn run(settings: DaemonSettings, config: Arc<faasbox_server::Config>) -> anyhow::Result<()> {
    let store = settings
        .open_store()
        .await
        .with_context(|| format!("failed to open function store {}", settings.store))?;
    println!(
        "{} Function store ready at {}",
        &*CHECKMARK,
        console::style(&settings.store).yellow()
    );

    let pool = Arc::new(EnvironmentPool::new(settings.slots)?);
    let backend = settings.create_backend().await?;
    backend
        .initialize(pool.slot_names())
        .await
        .with_context(|| format!("failed to initialize {} backend", backend.name()))?;
    println!(
        "{} Started {} {} slots",
        &*CHECKMARK,
        pool.size(),
        console::style(backend.name()).yellow()
    );

    let supervisor_shutdown = CancellationToken::new();
    let supervisor = Arc::new(HealthSupervisor::new(
        pool.clone(),
        backend.clone(),
        settings.health_config(),
    ))
    .spawn(supervisor_shutdown.clone());

    let engine = Arc::new(ExecutionEngine::new(
        pool.clone(),
        backend.clone(),
        settings.engine_config(),
    ));
    let state = AppState::new(config.clone(), engine, store, pool.clone(), backend.name());

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(Any);

    let app = route::create_router(state).layer(cors);

    tracing::info!("starting server on {}", config.get_addr());
    println!(
        "{} Server listening on {}",
        &*CHECKMARK,
        console::style(config.get_addr()).yellow()
    );

    let listener = tokio::net::TcpListener::bind(config.get_addr()).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    tracing::info!("shutting down");
    supervisor_shutdown.cancel();
    if let Err(e) = supervisor.await {
        tracing::warn!("health supervisor ended abnormally: {}", e);
    }

    pool.shutdown();
    if let Err(e) = backend.teardown(pool.slot_names()).await {
        tracing::warn!("failed to tear down {} backend: {}", backend.name(), e);
    }

    served?;
    println!("{} Shut down cleanly", &*CHECKMARK);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
