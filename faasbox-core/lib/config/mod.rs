//! Configuration types and helpers.

mod language;
mod limits;
mod settings;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use language::*;
pub use limits::*;
pub use settings::*;
