//! Error types for `faasbox-utils`.

use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a faasbox-utils operation.
pub type FaasboxUtilsResult<T> = Result<T, FaasboxUtilsError>;

/// An error that occurred in a faasbox-utils operation.
#[derive(pretty_error_debug::Debug, Error)]
pub enum FaasboxUtilsError {
    /// An environment variable was set to a value that could not be parsed.
    #[error("invalid value for {name}: {value:?} ({reason})")]
    InvalidEnvValue {
        /// The variable name.
        name: String,

        /// The raw value.
        value: String,

        /// Why parsing failed.
        reason: String,
    },
}
