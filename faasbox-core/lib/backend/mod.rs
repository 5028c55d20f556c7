//! Execution backends that provide the environment behind each slot.
//!
//! This module handles:
//! - A single backend capability shared by the pool, health supervisor and engine
//! - Container-backed slots driven through a container engine CLI
//! - Sandbox-backed slots that spawn a fresh bubblewrap process per execution
//!
//! The backend is chosen by configuration. Nothing outside this module knows which one is active.

mod container;
mod sandbox;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use container::*;
pub use sandbox::*;

use std::{fmt, str::FromStr, time::Duration};

use async_trait::async_trait;
use tokio::time;

use crate::{config::Language, launcher::Invocation, FaasboxError, FaasboxResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Which backend implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Pooled, long-running containers.
    Container,

    /// A namespace-isolated process per execution.
    #[default]
    Sandbox,
}

/// The self-reported health of a running environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthSignal {
    /// The environment reports itself healthy.
    Healthy,

    /// The environment's health check has not settled yet.
    Starting,

    /// The environment declares no health check.
    NoHealthcheck,

    /// The environment reports a problem.
    Unhealthy(String),
}

/// The result of probing one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Running and healthy.
    Healthy,

    /// Failed liveness or health; carries the reason.
    Failing(String),
}

/// The environment behind the pool's slots.
///
/// Implementations must not hold locks across the external calls made here; the pool's state is
/// mutated only by its callers.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// A short name for logs and status output.
    fn name(&self) -> &'static str;

    /// Prepares every slot's environment. Errors are fatal to startup.
    async fn initialize(&self, slots: &[String]) -> FaasboxResult<()>;

    /// Whether the slot's environment is running.
    async fn is_running(&self, slot: &str) -> FaasboxResult<bool>;

    /// The slot's self-reported health. Only consulted when the slot is running.
    async fn health_signal(&self, slot: &str) -> FaasboxResult<HealthSignal>;

    /// Stops, removes and recreates the slot's environment.
    async fn rebuild(&self, slot: &str) -> FaasboxResult<()>;

    /// The command that runs `language`'s wrapper inside the slot.
    fn invocation(&self, slot: &str, language: Language) -> FaasboxResult<Invocation>;

    /// Stops and removes every slot's environment.
    async fn teardown(&self, slots: &[String]) -> FaasboxResult<()>;

    /// Checks liveness, then health, each bounded by `timeout`.
    ///
    /// A missing health check and a health check that is still starting both count as healthy.
    async fn probe(&self, slot: &str, timeout: Duration) -> ProbeOutcome {
        match time::timeout(timeout, self.is_running(slot)).await {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => return ProbeOutcome::Failing("not running".into()),
            Ok(Err(e)) => return ProbeOutcome::Failing(format!("liveness check failed: {}", e)),
            Err(_) => {
                return ProbeOutcome::Failing(format!(
                    "liveness check timed out after {:?}",
                    timeout
                ))
            }
        }

        match time::timeout(timeout, self.health_signal(slot)).await {
            Ok(Ok(signal)) if signal.is_healthy() => ProbeOutcome::Healthy,
            Ok(Ok(signal)) => ProbeOutcome::Failing(format!("reported {}", signal)),
            Ok(Err(e)) => ProbeOutcome::Failing(format!("health check failed: {}", e)),
            Err(_) => ProbeOutcome::Failing(format!("health check timed out after {:?}", timeout)),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl HealthSignal {
    /// Parses a container engine's health status string.
    pub fn from_status(status: &str) -> Self {
        match status.trim() {
            "healthy" => HealthSignal::Healthy,
            "starting" => HealthSignal::Starting,
            "" | "no-healthcheck" => HealthSignal::NoHealthcheck,
            other => HealthSignal::Unhealthy(other.to_string()),
        }
    }

    /// Whether the signal counts as healthy.
    pub fn is_healthy(&self) -> bool {
        !matches!(self, HealthSignal::Unhealthy(_))
    }
}

impl ProbeOutcome {
    /// Whether the probe passed.
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl FromStr for BackendKind {
    type Err = FaasboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "container" | "docker" | "podman" => Ok(BackendKind::Container),
            "sandbox" | "bwrap" => Ok(BackendKind::Sandbox),
            other => Err(FaasboxError::Validation(format!(
                "unknown backend: {} (expected sandbox or container)",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Container => f.write_str("container"),
            BackendKind::Sandbox => f.write_str("sandbox"),
        }
    }
}

impl fmt::Display for HealthSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthSignal::Healthy => f.write_str("healthy"),
            HealthSignal::Starting => f.write_str("starting"),
            HealthSignal::NoHealthcheck => f.write_str("no-healthcheck"),
            HealthSignal::Unhealthy(status) => write!(f, "unhealthy ({})", status),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
