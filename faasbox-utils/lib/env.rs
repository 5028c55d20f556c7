//! Utility functions for working with environment variables.

use std::{path::PathBuf, str::FromStr};

use crate::{FaasboxUtilsError, FaasboxUtilsResult, DEFAULT_FAASBOX_HOME};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Environment variable for the faasbox home directory
pub const FAASBOX_HOME_ENV_VAR: &str = "FAASBOX_HOME";

/// Environment variable for the host the server binds to
pub const HTTP_HOST_ENV_VAR: &str = "HTTP_HOST";

/// Environment variable for the port the server listens on
pub const HTTP_PORT_ENV_VAR: &str = "HTTP_PORT";

/// Environment variable for the number of pooled slots
pub const MAX_CONTAINERS_ENV_VAR: &str = "MAX_CONTAINERS";

/// Environment variable for the per-execution CPU quota
pub const MAX_CPUS_ENV_VAR: &str = "MAX_CPUS";

/// Environment variable for the per-execution memory ceiling
pub const MAX_MEMORY_ENV_VAR: &str = "MAX_MEMORY";

/// Environment variable for the per-execution timeout in seconds
pub const EXECUTION_TIMEOUT_ENV_VAR: &str = "EXECUTION_TIMEOUT_SECS";

/// Environment variable for the slot acquisition timeout in seconds
pub const ACQUIRE_TIMEOUT_ENV_VAR: &str = "ACQUIRE_TIMEOUT_SECS";

/// Environment variable for the maximum accepted code size in bytes
pub const MAX_CODE_SIZE_ENV_VAR: &str = "MAX_CODE_SIZE";

/// Environment variable selecting the execution backend (`sandbox` or `container`)
pub const BACKEND_ENV_VAR: &str = "FAASBOX_BACKEND";

/// Environment variable selecting the function store (`memory` or a sqlite url)
pub const STORE_ENV_VAR: &str = "FAASBOX_STORE";

/// Environment variable naming the shared systemd slice for sandboxed executions
pub const SLICE_ENV_VAR: &str = "FAASBOX_SLICE";

/// Environment variable for the container engine binary
pub const CONTAINER_ENGINE_ENV_VAR: &str = "CONTAINER_ENGINE";

/// Environment variable for the container runtime image
pub const RUNTIME_IMAGE_ENV_VAR: &str = "RUNTIME_IMAGE";

/// Environment variable for the Dockerfile used to build the runtime image
pub const RUNTIME_DOCKERFILE_ENV_VAR: &str = "RUNTIME_DOCKERFILE";

/// Environment variable for the shared typescript module directory
pub const NODE_MODULES_ENV_VAR: &str = "NODE_MODULES_PATH";

/// Environment variable for the health supervisor period in seconds
pub const HEALTH_INTERVAL_ENV_VAR: &str = "HEALTH_INTERVAL_SECS";

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Returns the path to the faasbox home directory.
/// If the FAASBOX_HOME environment variable is set, returns that path.
/// Otherwise, returns the default faasbox home path.
pub fn get_faasbox_home_path() -> PathBuf {
    if let Ok(faasbox_home) = std::env::var(FAASBOX_HOME_ENV_VAR) {
        PathBuf::from(faasbox_home)
    } else {
        DEFAULT_FAASBOX_HOME.to_owned()
    }
}

/// Reads and parses an environment variable, falling back to `default` when it is unset or empty.
///
/// ## Arguments
///
/// * `name` - The environment variable to read
/// * `default` - The value used when the variable is unset or blank
///
/// ## Example
///
/// ```
/// use faasbox_utils::env::get_env_or;
///
/// let port: u16 = get_env_or("FAASBOX_DOC_UNSET_PORT", 8080).unwrap();
/// assert_eq!(port, 8080);
/// ```
pub fn get_env_or<T>(name: &str, default: T) -> FaasboxUtilsResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map_err(|e: T::Err| FaasboxUtilsError::InvalidEnvValue {
                    name: name.to_string(),
                    value,
                    reason: e.to_string(),
                })
        }
        _ => Ok(default),
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_or_uses_default_when_unset() {
        let value: u64 = get_env_or("FAASBOX_TEST_ENV_UNSET", 30).unwrap();
        assert_eq!(value, 30);
    }

    #[test]
    fn test_get_env_or_parses_value() {
        std::env::set_var("FAASBOX_TEST_ENV_PARSE", " 12 ");
        let value: usize = get_env_or("FAASBOX_TEST_ENV_PARSE", 2).unwrap();
        assert_eq!(value, 12);
    }

    #[test]
    fn test_get_env_or_rejects_garbage() {
        std::env::set_var("FAASBOX_TEST_ENV_GARBAGE", "many");
        let err = get_env_or::<usize>("FAASBOX_TEST_ENV_GARBAGE", 2).unwrap_err();
        assert!(err.to_string().contains("FAASBOX_TEST_ENV_GARBAGE"));
    }

    #[test]
    fn test_blank_value_falls_back() {
        std::env::set_var("FAASBOX_TEST_ENV_BLANK", "   ");
        let value: f64 = get_env_or("FAASBOX_TEST_ENV_BLANK", 1.5).unwrap();
        assert_eq!(value, 1.5);
    }
}
