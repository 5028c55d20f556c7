use faasbox_core::FaasboxError;
use faasbox_server::ServerError;
use faasbox_utils::FaasboxUtilsError;
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a faasbox-cli operation.
pub type FaasboxCliResult<T> = Result<T, FaasboxCliError>;

/// An error that occurred while configuring or running the daemon.
#[derive(pretty_error_debug::Debug, Error)]
pub enum FaasboxCliError {
    /// An environment variable could not be parsed.
    #[error(transparent)]
    Utils(#[from] FaasboxUtilsError),

    /// An error from the execution core.
    #[error(transparent)]
    Core(#[from] FaasboxError),

    /// An error from the HTTP layer.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// An I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A flag or variable holds an unusable value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
