use std::path::PathBuf;

use clap::Parser;

use crate::styles;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Arguments for the faasboxd command.
///
/// Every flag is optional; an unset flag falls back to its environment variable, then to the
/// built-in default.
#[derive(Debug, Default, Parser)]
#[command(name = "faasboxd", author, version, about, styles = styles::styles())]
pub struct FaasboxdArgs {
    /// Host to bind to [env: HTTP_HOST]
    #[arg(long)]
    pub host: Option<String>,

    /// Port number to listen on [env: HTTP_PORT]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Number of pooled execution slots [env: MAX_CONTAINERS]
    #[arg(short = 'n', long = "slots")]
    pub slots: Option<usize>,

    /// CPU quota per execution, in CPUs [env: MAX_CPUS]
    #[arg(long)]
    pub cpus: Option<f64>,

    /// Memory ceiling per execution, e.g. 128M [env: MAX_MEMORY]
    #[arg(long)]
    pub memory: Option<String>,

    /// Execution timeout in seconds [env: EXECUTION_TIMEOUT_SECS]
    #[arg(long)]
    pub execution_timeout: Option<u64>,

    /// Slot acquisition timeout in seconds [env: ACQUIRE_TIMEOUT_SECS]
    #[arg(long)]
    pub acquire_timeout: Option<u64>,

    /// Maximum accepted code size in bytes [env: MAX_CODE_SIZE]
    #[arg(long)]
    pub max_code_size: Option<usize>,

    /// Execution backend: sandbox or container [env: FAASBOX_BACKEND]
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Home directory for wrappers, slots and the function database [env: FAASBOX_HOME]
    #[arg(long)]
    pub home: Option<PathBuf>,

    /// Function store: `memory`, a `sqlite:` url or a database file [env: FAASBOX_STORE]
    #[arg(long)]
    pub store: Option<String>,

    /// Shared systemd slice for sandboxed executions [env: FAASBOX_SLICE]
    #[arg(long)]
    pub slice: Option<String>,

    /// Container engine binary [env: CONTAINER_ENGINE]
    #[arg(long)]
    pub engine: Option<String>,

    /// Container runtime image [env: RUNTIME_IMAGE]
    #[arg(long)]
    pub image: Option<String>,

    /// Dockerfile used to build the runtime image [env: RUNTIME_DOCKERFILE]
    #[arg(long)]
    pub dockerfile: Option<PathBuf>,

    /// Shared node_modules directory for typescript [env: NODE_MODULES_PATH]
    #[arg(long)]
    pub node_modules: Option<PathBuf>,

    /// Health check period in seconds [env: HEALTH_INTERVAL_SECS]
    #[arg(long)]
    pub health_interval: Option<u64>,
}
