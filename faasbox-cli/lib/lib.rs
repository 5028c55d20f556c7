//! `faasbox-cli` contains the argument parsing and settings resolution behind the `faasboxd`
//! daemon.

#![warn(missing_docs)]

mod args;
mod error;
mod settings;
mod styles;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use args::*;
pub use error::*;
pub use settings::*;
pub use styles::*;
