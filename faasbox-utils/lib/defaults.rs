//! Default values shared across the faasbox crates.

use std::{path::PathBuf, sync::LazyLock, time::Duration};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The name of the faasbox home directory, relative to the user's home.
pub const FAASBOX_HOME_DIR: &str = ".faasbox";

/// The default faasbox home path.
pub static DEFAULT_FAASBOX_HOME: LazyLock<PathBuf> = LazyLock::new(|| {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(FAASBOX_HOME_DIR)
});

/// Sub directory of the faasbox home where wrapper scripts are installed.
pub const WRAPPERS_SUBDIR: &str = "wrappers";

/// Sub directory of the faasbox home where sandbox slot directories live.
pub const SLOTS_SUBDIR: &str = "slots";

/// File name of the sqlite function store inside the faasbox home.
pub const FUNCTIONS_DB_FILENAME: &str = "functions.db";

/// Prefix for the names of pooled execution slots.
pub const SLOT_NAME_PREFIX: &str = "faasbox-runtime";

/// The default host the server binds to.
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// The default port the server listens on.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// The default number of CPUs granted to each execution.
pub const DEFAULT_MAX_CPUS: f64 = 1.0;

/// The default memory ceiling for each execution.
pub const DEFAULT_MAX_MEMORY: &str = "128M";

/// The default wall-clock limit for one execution, in seconds.
pub const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 30;

/// The default time a caller waits for an idle slot, in seconds.
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

/// The default maximum size of submitted code, in bytes.
pub const DEFAULT_MAX_CODE_SIZE: usize = 256 * 1024;

/// The default period between health supervisor ticks, in seconds.
pub const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 30;

/// The default timeout for a single health probe command.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// The default bound on scanning the availability queue during quarantine.
pub const DEFAULT_QUEUE_SCAN_TIMEOUT: Duration = Duration::from_millis(100);

/// The default container engine binary.
pub const DEFAULT_CONTAINER_ENGINE: &str = "podman";

/// The default runtime image used by the container backend.
pub const DEFAULT_RUNTIME_IMAGE: &str = "faas-runtime";

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Returns the default pool size: two slots per available processing unit.
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 2
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
