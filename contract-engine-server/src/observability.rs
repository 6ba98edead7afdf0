//! Observability infrastructure for the contract engine server.
//!
//! Provides structured logging and health reports for production
//! deployments.

use std::io;

use contract_engine::entitlements::CacheStats;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Log format configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format for development.
    Pretty,
    /// JSON format for production log aggregation.
    Json,
}

impl LogFormat {
    /// Determines log format from environment.
    ///
    /// Checks `LOG_FORMAT` environment variable:
    /// - `json` => JSON format
    /// - `pretty` or unset => Pretty format
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("LOG_FORMAT").unwrap_or_default())
    }

    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Initializes structured logging.
///
/// Log level comes from `RUST_LOG` (default `info`); audit lines can be
/// isolated with a filter on the `audit` target, e.g.
/// `RUST_LOG=info,audit=info`.
pub fn init_observability(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .with_writer(io::stderr),
                )
                .init();
        }
        LogFormat::Json => {
            subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .with_writer(io::stderr),
                )
                .init();
        }
    }
}

/// Health check status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Engine is serving with a complete catalog.
    Healthy,
    /// Engine runs but something needs attention.
    Degraded,
    /// Engine cannot serve.
    Unhealthy,
}

impl HealthStatus {
    /// Returns string representation for JSON serialization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

/// Health check status for individual checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthCheckStatus {
    /// Check passed.
    Pass,
    /// Check failed.
    Fail,
    /// Degraded but operational.
    Warn,
}

impl HealthCheckStatus {
    /// Returns string representation for JSON serialization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Warn => "warn",
        }
    }
}

/// Individual health check result.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// Check name.
    pub name: String,
    /// Check status.
    pub status: HealthCheckStatus,
    /// Optional message with details.
    pub message: Option<String>,
}

impl HealthCheck {
    /// Creates a passing health check with a message.
    #[must_use]
    pub fn pass_with_message(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), status: HealthCheckStatus::Pass, message: Some(message.into()) }
    }

    /// Creates a warning.
    #[must_use]
    pub fn warn(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), status: HealthCheckStatus::Warn, message: Some(message.into()) }
    }

    /// Creates a failing health check with error message.
    #[must_use]
    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), status: HealthCheckStatus::Fail, message: Some(message.into()) }
    }
}

/// Overall health report for the engine.
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Overall status.
    pub status: HealthStatus,
    /// Server version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_secs: u64,
    /// Stored contracts.
    pub contracts: usize,
    /// Entitlement cache counters.
    pub cache: CacheStats,
    /// Individual health checks.
    pub checks: Vec<HealthCheck>,
}

impl HealthReport {
    /// Builds a report whose status is derived from `checks`.
    #[must_use]
    pub fn new(uptime_secs: u64, contracts: usize, cache: CacheStats, checks: Vec<HealthCheck>) -> Self {
        Self {
            status: Self::compute_status(&checks),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            uptime_secs,
            contracts,
            cache,
            checks,
        }
    }

    /// Serializes health report to JSON string.
    ///
    /// # Errors
    ///
    /// Returns error if JSON serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::json!({
            "status": self.status.as_str(),
            "version": self.version,
            "uptime_secs": self.uptime_secs,
            "contracts": self.contracts,
            "cache": {
                "entries": self.cache.entries,
                "in_flight": self.cache.in_flight,
                "hits": self.cache.hits,
                "misses": self.cache.misses,
                "computations": self.cache.computations,
                "evictions": self.cache.evictions,
            },
            "checks": self.checks.iter().map(|c| {
                let mut obj = serde_json::json!({
                    "name": c.name,
                    "status": c.status.as_str(),
                });
                if let Some(msg) = &c.message {
                    obj["message"] = serde_json::Value::String(msg.clone());
                }
                obj
            }).collect::<Vec<_>>(),
        });

        serde_json::to_string_pretty(&json)
    }

    /// Determines overall health status from individual checks.
    #[must_use]
    pub fn compute_status(checks: &[HealthCheck]) -> HealthStatus {
        if checks.iter().any(|c| c.status == HealthCheckStatus::Fail) {
            HealthStatus::Unhealthy
        } else if checks.iter().any(|c| c.status == HealthCheckStatus::Warn) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse(""), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("unknown"), LogFormat::Pretty);
    }

    #[test]
    fn test_health_status_compute() {
        let pass = HealthCheck::pass_with_message("config", "defaults");
        let warn = HealthCheck::warn("catalog", "no pricing versions loaded");
        let fail = HealthCheck::fail("catalog", "malformed pricing document");

        assert_eq!(HealthReport::compute_status(&[]), HealthStatus::Healthy);
        assert_eq!(HealthReport::compute_status(&[pass.clone()]), HealthStatus::Healthy);
        assert_eq!(
            HealthReport::compute_status(&[pass.clone(), warn.clone()]),
            HealthStatus::Degraded
        );
        assert_eq!(HealthReport::compute_status(&[pass, warn, fail]), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_health_report_to_json() {
        let cache = CacheStats { hits: 9, misses: 1, computations: 1, entries: 1, ..CacheStats::default() };
        let report = HealthReport::new(
            3600,
            12,
            cache,
            vec![
                HealthCheck::pass_with_message("config", "loaded engine.toml"),
                HealthCheck::warn("catalog", "no pricing versions loaded"),
            ],
        );

        let json = report.to_json().expect("JSON serialization should succeed");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        assert_eq!(value["status"], "degraded");
        assert_eq!(value["uptime_secs"], 3600);
        assert_eq!(value["contracts"], 12);
        assert_eq!(value["cache"]["hits"], 9);
        assert_eq!(value["checks"][1]["status"], "warn");
        assert_eq!(value["checks"][1]["message"], "no pricing versions loaded");
    }
}
