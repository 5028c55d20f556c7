//! Application state management for the faasbox server.
//!
//! This module handles:
//! - Global application state
//! - Sharing the engine, pool and store across handlers

use std::sync::Arc;

use faasbox_core::{engine::ExecutionEngine, pool::EnvironmentPool, store::FunctionStore};
use getset::Getters;

use crate::config::Config;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Application state structure
#[derive(Clone, Getters)]
#[getset(get = "pub with_prefix")]
pub struct AppState {
    /// The application configuration
    config: Arc<Config>,

    /// The engine that runs scripts
    engine: Arc<ExecutionEngine>,

    /// Where uploaded functions live
    store: Arc<dyn FunctionStore>,

    /// The pool the engine draws slots from
    pool: Arc<EnvironmentPool>,

    /// Name of the active execution backend
    backend_name: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl AppState {
    /// Create a new application state instance
    pub fn new(
        config: Arc<Config>,
        engine: Arc<ExecutionEngine>,
        store: Arc<dyn FunctionStore>,
        pool: Arc<EnvironmentPool>,
        backend_name: impl Into<String>,
    ) -> Self {
        Self {
            config,
            engine,
            store,
            pool,
            backend_name: backend_name.into(),
        }
    }
}
