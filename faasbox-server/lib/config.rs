//! Configuration module for the faasbox server.
//!
//! This module handles server configuration including:
//! - The address to listen on
//! - Request size limits

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use faasbox_utils::{DEFAULT_MAX_CODE_SIZE, DEFAULT_SERVER_PORT};
use getset::{CopyGetters, Getters};

use crate::{ServerError, ServerResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Configuration structure that holds the HTTP settings
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct Config {
    /// Address to listen on
    #[getset(get = "pub with_prefix")]
    addr: SocketAddr,

    /// Maximum accepted size of submitted code, in bytes
    #[getset(get_copy = "pub with_prefix")]
    max_code_size: usize,
}

//--------------------------------------------------------------------------------------------------
// Implementations
//--------------------------------------------------------------------------------------------------

impl Config {
    /// Create a new configuration
    pub fn new(host: &str, port: u16, max_code_size: usize) -> ServerResult<Self> {
        let ip: IpAddr = host
            .parse()
            .map_err(|e| ServerError::ConfigError(format!("invalid host {:?}: {}", host, e)))?;

        if max_code_size == 0 {
            return Err(ServerError::ConfigError(
                "maximum code size must be positive".to_string(),
            ));
        }

        Ok(Self {
            addr: SocketAddr::new(ip, port),
            max_code_size,
        })
    }

    /// The largest request body accepted, leaving room for JSON escaping and input.
    pub fn body_limit(&self) -> usize {
        self.max_code_size.saturating_mul(2)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_SERVER_PORT),
            max_code_size: DEFAULT_MAX_CODE_SIZE,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
