//! Contract engine server.
//!
//! Loads the engine configuration and pricing catalog, reports health and
//! prunes expired contracts on a fixed interval until interrupted.
//!
//! The binary hosts the engine over [`InMemoryContractStore`], so it starts
//! empty and serves as a health and pruning harness. The serving loop is
//! generic over [`ContractStore`]; deployments with a persistent store build
//! their own [`ContractManager`] and hand it to the same loop.
//!
//! # Environment Variables
//!
//! - `CONTRACT_ENGINE_CONFIG`: path to a TOML configuration file (optional)
//! - `CONTRACT_ENGINE_CATALOG`: comma-separated list of JSON pricing files
//! - `LOG_FORMAT`: `json` or `pretty` (default: `pretty`)
//! - `RUST_LOG`: log level filter (default: `info`)

mod observability;

use std::{
    path::Path,
    process::ExitCode,
    time::{Duration, Instant},
};

use contract_engine::{
    ContractManager, EngineError, Result,
    catalog::InMemoryCatalog,
    config::EngineConfig,
    contract::{ContractFilter, ContractStore, InMemoryContractStore},
};
use observability::{HealthCheck, HealthReport, HealthStatus, LogFormat, init_observability};

type Manager<S> = ContractManager<S, InMemoryCatalog>;

#[tokio::main]
async fn main() -> ExitCode {
    init_observability(LogFormat::from_env());

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, code = e.code().as_str(), "Contract engine stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config = load_config(std::env::var("CONTRACT_ENGINE_CONFIG").ok().as_deref())?;
    checks.push(HealthCheck::pass_with_message(
        "config",
        format!(
            "cache capacity {}, pruning every {}s",
            config.cache.capacity, config.pruning.interval_secs
        ),
    ));

    let catalog = InMemoryCatalog::new();
    checks.extend(load_catalog(&catalog, &std::env::var("CONTRACT_ENGINE_CATALOG").unwrap_or_default()));

    let manager = ContractManager::new(InMemoryContractStore::new(), catalog, &config)?;
    let report = health(&manager, &started, checks.clone()).await;
    log_report(&report);
    if report.status == HealthStatus::Unhealthy {
        return Err(EngineError::ConfigError("startup health checks failed".into()));
    }

    tracing::info!(interval_secs = config.pruning.interval_secs, "Contract engine ready");
    let pruned = serve(&manager, config.pruning_interval(), shutdown_signal()).await;

    log_report(&health(&manager, &started, checks).await);
    tracing::info!(pruned, "Contract engine shut down");
    Ok(())
}

/// Prunes on every tick of `interval` until `shutdown` completes.
///
/// The first pass runs immediately. Returns the number of contracts pruned.
async fn serve<S: ContractStore>(
    manager: &Manager<S>,
    interval: Duration,
    shutdown: impl Future<Output = ()>,
) -> usize {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut total = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match manager.prune_expired_contracts().await {
                    Ok(0) => tracing::debug!("No expired contracts"),
                    Ok(pruned) => {
                        tracing::info!(pruned, "Pruned expired contracts");
                        total += pruned;
                    }
                    Err(e) => tracing::warn!(error = %e, "Pruning pass failed"),
                }
            }
            () = &mut shutdown => break,
        }
    }
    total
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    let Some(path) = path.filter(|p| !p.trim().is_empty()) else {
        tracing::info!("No configuration file given, using defaults");
        return Ok(EngineConfig::default());
    };

    let document = std::fs::read_to_string(path)
        .map_err(|e| EngineError::ConfigError(format!("cannot read {path}: {e}")))?;
    let config = EngineConfig::from_toml(&document)?;
    tracing::info!(path, "Loaded configuration");
    Ok(config)
}

/// Publishes every pricing file in `paths`, one health check per file.
fn load_catalog(catalog: &InMemoryCatalog, paths: &str) -> Vec<HealthCheck> {
    let paths: Vec<&str> = paths.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
    if paths.is_empty() {
        return vec![HealthCheck::warn("catalog", "no pricing versions loaded")];
    }

    paths
        .into_iter()
        .map(|path| {
            let name = format!("catalog:{}", file_name(path));
            let published = std::fs::read_to_string(path)
                .map_err(|e| EngineError::InvalidCatalog(format!("cannot read {path}: {e}")))
                .and_then(|document| catalog.publish_json(&document));
            match published {
                Ok(reference) => {
                    tracing::info!(pricing = %reference, path, "Published pricing version");
                    HealthCheck::pass_with_message(name, reference.to_string())
                }
                Err(e) => {
                    tracing::error!(error = %e, path, "Rejected pricing file");
                    HealthCheck::fail(name, e.to_string())
                }
            }
        })
        .collect()
}

fn file_name(path: &str) -> &str {
    Path::new(path).file_name().and_then(|name| name.to_str()).unwrap_or(path)
}

async fn health<S: ContractStore>(
    manager: &Manager<S>,
    started: &Instant,
    mut checks: Vec<HealthCheck>,
) -> HealthReport {
    let contracts = match manager.list_contracts(&ContractFilter::default()).await {
        Ok(page) => page.total,
        Err(e) => {
            checks.push(HealthCheck::fail("store", e.to_string()));
            0
        }
    };
    HealthReport::new(started.elapsed().as_secs(), contracts, manager.cache_stats(), checks)
}

fn log_report(report: &HealthReport) {
    match report.to_json() {
        Ok(json) => tracing::info!(status = report.status.as_str(), report = %json, "Health report"),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize health report"),
    }
}
