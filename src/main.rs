//! sewaflow-scheduler: siembra las preferencias y barre una vez por día.
//!
//! Con el feature `memory_demo` corre contra la store en memoria; si no,
//! requiere `DATABASE_URL`.
use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info};
use sewa_core::{Store, WorkflowEngine};
#[cfg(not(feature = "memory_demo"))]
use sewa_persistence::{build_pool_from_env, PgStore, PoolProvider};
use sewaflow::{run, AppConfig, DailyTrigger};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
                             .init();

    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("config:invalid err={}", e);
            return ExitCode::from(2);
        }
    };

    match open_store().await {
        Ok(store) => serve(store, cfg).await,
        Err(code) => code,
    }
}

#[cfg(feature = "memory_demo")]
async fn open_store() -> Result<Arc<sewa_core::InMemoryStore>, ExitCode> {
    info!("startup:backend memory");
    Ok(Arc::new(sewa_core::InMemoryStore::new()))
}

#[cfg(not(feature = "memory_demo"))]
async fn open_store() -> Result<Arc<PgStore<PoolProvider>>, ExitCode> {
    // construir el pool corre migraciones: fuera del reactor
    match tokio::task::spawn_blocking(build_pool_from_env).await {
        Ok(Ok(pool)) => Ok(Arc::new(PgStore::new(PoolProvider { pool }))),
        Ok(Err(e)) => {
            error!("pool:failed err={}", e);
            Err(ExitCode::from(5))
        }
        Err(e) => {
            error!("pool:aborted err={}", e);
            Err(ExitCode::from(5))
        }
    }
}

async fn serve<S: Store + 'static>(store: Arc<S>, cfg: AppConfig) -> ExitCode {
    let engine = Arc::new(WorkflowEngine::builder(store).primary_location(cfg.primary_location.clone())
                                                         .build());
    let seeder = engine.clone();
    match tokio::task::spawn_blocking(move || seeder.resolver().ensure_seeded()).await {
        Ok(Ok(n)) => info!("startup:seeded inserted={} primary_location={}", n, cfg.primary_location),
        Ok(Err(e)) => {
            error!("startup:seed_failed err={}", e);
            return ExitCode::from(5);
        }
        Err(e) => {
            error!("startup:seed_aborted err={}", e);
            return ExitCode::from(5);
        }
    }
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("scheduler:signal_failed err={}", e);
            std::future::pending::<()>().await;
        }
    };
    run(engine, DailyTrigger::new(cfg.sweep_hour), shutdown).await;
    ExitCode::SUCCESS
}
