//! `faasbox-core` runs short-lived, untrusted scripts inside isolated, resource-capped environments.
//!
//! # Overview
//!
//! faasbox keeps a fixed-size pool of execution slots on a single host. It handles:
//! - Slot lifecycle and availability
//! - Periodic health probing with quarantine and rebuild
//! - Sandboxed process invocation (bubblewrap + systemd resource accounting)
//! - Streaming execution with timeout, cancellation and diagnostic handling
//! - Versioned function storage
//!
//! # Architecture
//!
//! - **Pool**: fixed set of named slots, each guarded by its own lock, plus a queue of idle names
//! - **Health**: background supervisor that quarantines and rebuilds failing slots
//! - **Launcher**: pure builder for isolated process invocations
//! - **Backend**: container or sandbox implementation of the slot environment
//! - **Engine**: acquires a slot, runs the script and resolves a single outcome
//! - **Store**: path-addressed, versioned code storage
//!
//! # Modules
//!
//! - [`backend`] - Execution backend trait and its container and sandbox implementations
//! - [`config`] - Languages, resource limits and component configuration
//! - [`engine`] - The streaming execution engine and result classification
//! - [`health`] - The health supervisor
//! - [`launcher`] - The sandbox launcher
//! - [`pool`] - The environment pool and slot state machine
//! - [`resource`] - Embedded language wrapper scripts
//! - [`store`] - Function store implementations

#![warn(missing_docs)]

mod error;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod backend;
pub mod config;
pub mod engine;
pub mod health;
pub mod launcher;
pub mod pool;
pub mod resource;
pub mod store;

pub use error::*;
