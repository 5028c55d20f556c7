//! Settings resolution for the faasboxd daemon.
//!
//! Each value comes from its command line flag when given, otherwise from its environment
//! variable, otherwise from the built-in default.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use faasbox_core::{
    backend::{
        BackendKind, ContainerBackend, ContainerConfig, ExecutionBackend, SandboxBackend,
        SandboxConfig,
    },
    config::{EngineConfig, HealthConfig, MemorySize, ResourceLimits},
    resource,
    store::{FunctionStore, MemoryFunctionStore, SqliteFunctionStore},
};
use faasbox_server::Config;
use faasbox_utils::{
    env::{
        get_env_or, get_faasbox_home_path, ACQUIRE_TIMEOUT_ENV_VAR, BACKEND_ENV_VAR,
        CONTAINER_ENGINE_ENV_VAR, EXECUTION_TIMEOUT_ENV_VAR, HEALTH_INTERVAL_ENV_VAR,
        HTTP_HOST_ENV_VAR, HTTP_PORT_ENV_VAR, MAX_CODE_SIZE_ENV_VAR, MAX_CONTAINERS_ENV_VAR,
        MAX_CPUS_ENV_VAR, MAX_MEMORY_ENV_VAR, NODE_MODULES_ENV_VAR, RUNTIME_DOCKERFILE_ENV_VAR,
        RUNTIME_IMAGE_ENV_VAR, SLICE_ENV_VAR, STORE_ENV_VAR,
    },
    default_pool_size, DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_CONTAINER_ENGINE,
    DEFAULT_EXECUTION_TIMEOUT_SECS, DEFAULT_HEALTH_INTERVAL_SECS,
    DEFAULT_MAX_CODE_SIZE, DEFAULT_MAX_CPUS, DEFAULT_MAX_MEMORY, DEFAULT_RUNTIME_IMAGE,
    DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT, FUNCTIONS_DB_FILENAME, WRAPPERS_SUBDIR,
};

use crate::{FaasboxCliError, FaasboxCliResult, FaasboxdArgs};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const MEMORY_STORE: &str = "memory";

const SQLITE_URL_PREFIX: &str = "sqlite:";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Where uploaded functions are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// In process memory, lost on restart.
    Memory,

    /// A `sqlite:` connection url.
    Url(String),

    /// A sqlite database file.
    File(PathBuf),
}

/// Fully resolved daemon settings.
#[derive(Debug, Clone)]
pub struct DaemonSettings {
    /// Host to bind to.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Number of pooled slots.
    pub slots: usize,

    /// Per-execution resource limits.
    pub limits: ResourceLimits,

    /// Wall-clock limit for one execution.
    pub execution_timeout: Duration,

    /// How long a request waits for a slot.
    pub acquire_timeout: Duration,

    /// Largest accepted code submission, in bytes.
    pub max_code_size: usize,

    /// Which backend isolates executions.
    pub backend: BackendKind,

    /// Home directory.
    pub home: PathBuf,

    /// Function store location.
    pub store: StoreLocation,

    /// Optional shared systemd slice.
    pub slice: Option<String>,

    /// Container engine binary.
    pub engine: String,

    /// Container runtime image.
    pub image: String,

    /// Dockerfile the runtime image is built from.
    pub dockerfile: Option<PathBuf>,

    /// Shared node_modules directory for typescript.
    pub node_modules: Option<PathBuf>,

    /// Health supervisor period.
    pub health_interval: Duration,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DaemonSettings {
    /// Resolves settings from `args`, the environment and defaults.
    pub fn resolve(args: FaasboxdArgs) -> FaasboxCliResult<Self> {
        let home = args.home.unwrap_or_else(get_faasbox_home_path);

        let cpus = pick(args.cpus, MAX_CPUS_ENV_VAR, DEFAULT_MAX_CPUS)?;
        let memory = pick(args.memory, MAX_MEMORY_ENV_VAR, DEFAULT_MAX_MEMORY.to_string())?;
        let limits = ResourceLimits::new(cpus, MemorySize::parse(&memory)?)?;

        let slots = pick(args.slots, MAX_CONTAINERS_ENV_VAR, default_pool_size())?;
        if slots == 0 {
            return Err(FaasboxCliError::InvalidArgument(
                "slot count must be positive".to_string(),
            ));
        }

        let store = match pick_optional(args.store, STORE_ENV_VAR)? {
            Some(value) => StoreLocation::from_str(&value)?,
            None => StoreLocation::File(home.join(FUNCTIONS_DB_FILENAME)),
        };

        Ok(Self {
            host: pick(args.host, HTTP_HOST_ENV_VAR, DEFAULT_SERVER_HOST.to_string())?,
            port: pick(args.port, HTTP_PORT_ENV_VAR, DEFAULT_SERVER_PORT)?,
            slots,
            limits,
            execution_timeout: pick_secs(
                args.execution_timeout,
                EXECUTION_TIMEOUT_ENV_VAR,
                DEFAULT_EXECUTION_TIMEOUT_SECS,
            )?,
            acquire_timeout: pick_secs(
                args.acquire_timeout,
                ACQUIRE_TIMEOUT_ENV_VAR,
                DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            max_code_size: pick(args.max_code_size, MAX_CODE_SIZE_ENV_VAR, DEFAULT_MAX_CODE_SIZE)?,
            backend: pick(args.backend, BACKEND_ENV_VAR, BackendKind::default().to_string())?
                .parse()?,
            home,
            store,
            slice: pick_optional(args.slice, SLICE_ENV_VAR)?,
            engine: pick(
                args.engine,
                CONTAINER_ENGINE_ENV_VAR,
                DEFAULT_CONTAINER_ENGINE.to_string(),
            )?,
            image: pick(args.image, RUNTIME_IMAGE_ENV_VAR, DEFAULT_RUNTIME_IMAGE.to_string())?,
            dockerfile: pick_optional(args.dockerfile, RUNTIME_DOCKERFILE_ENV_VAR)?,
            node_modules: pick_optional(args.node_modules, NODE_MODULES_ENV_VAR)?,
            health_interval: pick_secs(
                args.health_interval,
                HEALTH_INTERVAL_ENV_VAR,
                DEFAULT_HEALTH_INTERVAL_SECS,
            )?,
        })
    }

    /// The directory holding the shared wrapper scripts.
    pub fn wrapper_dir(&self) -> PathBuf {
        self.home.join(WRAPPERS_SUBDIR)
    }

    /// The HTTP server configuration.
    pub fn server_config(&self) -> FaasboxCliResult<Config> {
        Ok(Config::new(&self.host, self.port, self.max_code_size)?)
    }

    /// The execution engine configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::builder()
            .execution_timeout(self.execution_timeout)
            .acquire_timeout(self.acquire_timeout)
            .build()
    }

    /// The health supervisor configuration.
    pub fn health_config(&self) -> HealthConfig {
        HealthConfig::builder()
            .interval(self.health_interval)
            .build()
    }

    /// Opens the function store, applying migrations for sqlite stores.
    pub async fn open_store(&self) -> FaasboxCliResult<Arc<dyn FunctionStore>> {
        let store: Arc<dyn FunctionStore> = match &self.store {
            StoreLocation::Memory => Arc::new(MemoryFunctionStore::new()),
            StoreLocation::Url(url) => Arc::new(SqliteFunctionStore::connect(url).await?),
            StoreLocation::File(path) => Arc::new(SqliteFunctionStore::open(path).await?),
        };

        Ok(store)
    }

    /// Creates the selected backend. Its environments are not started until
    /// [`ExecutionBackend::initialize`] is called.
    pub async fn create_backend(&self) -> FaasboxCliResult<Arc<dyn ExecutionBackend>> {
        let backend: Arc<dyn ExecutionBackend> = match self.backend {
            BackendKind::Sandbox => Arc::new(SandboxBackend::new(
                SandboxConfig::builder()
                    .root_dir(self.home.clone())
                    .limits(self.limits.clone())
                    .module_dir(self.node_modules.clone())
                    .slice(self.slice.clone())
                    .build(),
            )),
            BackendKind::Container => {
                let wrapper_dir = self.wrapper_dir();
                resource::install_wrappers(&wrapper_dir).await?;

                Arc::new(ContainerBackend::new(
                    ContainerConfig::builder()
                        .engine(self.engine.clone())
                        .image(self.image.clone())
                        .dockerfile(self.dockerfile.clone())
                        .wrapper_dir(wrapper_dir)
                        .limits(self.limits.clone())
                        .build(),
                ))
            }
        };

        Ok(backend)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn pick<T>(flag: Option<T>, var: &str, default: T) -> FaasboxCliResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match flag {
        Some(value) => Ok(value),
        None => Ok(get_env_or(var, default)?),
    }
}

fn pick_optional<T>(flag: Option<T>, var: &str) -> FaasboxCliResult<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    if flag.is_some() {
        return Ok(flag);
    }

    match get_env_or(var, String::new())?.trim() {
        "" => Ok(None),
        value => value.parse().map(Some).map_err(|e: T::Err| {
            FaasboxCliError::InvalidArgument(format!("invalid value for {}: {}", var, e))
        }),
    }
}

fn pick_secs(flag: Option<u64>, var: &str, default: u64) -> FaasboxCliResult<Duration> {
    let secs = pick(flag, var, default)?;
    if secs == 0 {
        return Err(FaasboxCliError::InvalidArgument(format!(
            "{} must be at least one second",
            var
        )));
    }

    Ok(Duration::from_secs(secs))
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl FromStr for StoreLocation {
    type Err = FaasboxCliError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err(FaasboxCliError::InvalidArgument(
                "store location must not be empty".to_string(),
            ));
        }

        Ok(if value.eq_ignore_ascii_case(MEMORY_STORE) {
            StoreLocation::Memory
        } else if value.starts_with(SQLITE_URL_PREFIX) {
            StoreLocation::Url(value.to_string())
        } else {
            StoreLocation::File(Path::new(value).to_path_buf())
        })
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocation::Memory => write!(f, "{}", MEMORY_STORE),
            StoreLocation::Url(url) => write!(f, "{}", url),
            StoreLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
