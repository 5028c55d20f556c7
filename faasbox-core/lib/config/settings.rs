use std::time::Duration;

use getset::CopyGetters;
use typed_builder::TypedBuilder;

use faasbox_utils::{
    DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_EXECUTION_TIMEOUT_SECS, DEFAULT_HEALTH_INTERVAL_SECS,
    DEFAULT_PROBE_TIMEOUT, DEFAULT_QUEUE_SCAN_TIMEOUT,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Timeouts and buffering used by the execution engine.
#[derive(Debug, Clone, CopyGetters, TypedBuilder)]
pub struct EngineConfig {
    /// Wall-clock limit for a single execution.
    #[builder(default = Duration::from_secs(DEFAULT_EXECUTION_TIMEOUT_SECS))]
    #[getset(get_copy = "pub with_prefix")]
    execution_timeout: Duration,

    /// How long a caller waits for an idle slot.
    #[builder(default = Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS))]
    #[getset(get_copy = "pub with_prefix")]
    acquire_timeout: Duration,

    /// Capacity of the channel carrying streamed log events.
    #[builder(default = 64)]
    #[getset(get_copy = "pub with_prefix")]
    event_buffer: usize,
}

/// Timing of the health supervisor.
#[derive(Debug, Clone, CopyGetters, TypedBuilder)]
pub struct HealthConfig {
    /// Period between ticks.
    #[builder(default = Duration::from_secs(DEFAULT_HEALTH_INTERVAL_SECS))]
    #[getset(get_copy = "pub with_prefix")]
    interval: Duration,

    /// Bound on each probe command.
    #[builder(default = DEFAULT_PROBE_TIMEOUT)]
    #[getset(get_copy = "pub with_prefix")]
    probe_timeout: Duration,

    /// Bound on scanning the availability queue when quarantining a slot.
    #[builder(default = DEFAULT_QUEUE_SCAN_TIMEOUT)]
    #[getset(get_copy = "pub with_prefix")]
    queue_scan_timeout: Duration,
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for EngineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
