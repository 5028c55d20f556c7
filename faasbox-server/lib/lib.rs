//! Faasbox Server - An HTTP API for uploading, running and streaming short-lived functions.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod payload;
pub mod route;
pub mod state;
pub mod stream;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use config::*;
pub use error::*;
pub use handler::*;
pub use middleware::*;
pub use payload::*;
pub use route::*;
pub use state::*;
pub use stream::*;
