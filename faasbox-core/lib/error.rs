use std::time::Duration;

use thiserror::Error;

use crate::{config::Language, pool::SlotState};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a faasbox-core operation.
pub type FaasboxResult<T> = Result<T, FaasboxError>;

/// An error that occurred while running or managing executions.
#[derive(pretty_error_debug::Debug, Error)]
pub enum FaasboxError {
    /// No idle slot became available before the deadline.
    #[error("no idle execution slot became available within {0:?}")]
    AcquisitionTimeout(Duration),

    /// A dequeued slot was no longer idle.
    #[error("slot {slot} is in invalid state {state}")]
    SlotStateConflict {
        /// The slot that was handed back.
        slot: String,

        /// The state it was found in.
        state: SlotState,
    },

    /// The pool has been shut down.
    #[error("execution pool is shut down")]
    PoolClosed,

    /// The named slot is not part of the pool.
    #[error("unknown slot: {0}")]
    UnknownSlot(String),

    /// The sandboxed process could not be started.
    #[error("failed to launch {program}: {source}")]
    SandboxLaunchFailure {
        /// The program that was being started.
        program: String,

        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The execution ran past its deadline and was killed.
    #[error("execution timed out after {0:?}")]
    ExecutionTimeout(Duration),

    /// The script wrote to its diagnostic stream or exited unsuccessfully.
    #[error("execution error: {0}")]
    ExecutionError(String),

    /// The caller went away before the execution finished.
    #[error("client cancelled the execution")]
    ClientCancelled,

    /// The request payload was rejected.
    #[error("validation error: {0}")]
    Validation(String),

    /// The language tag is not supported.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The requested function path or version does not exist.
    #[error("not found: {0}")]
    StoreNotFound(String),

    /// The path is already bound to a different language.
    #[error("path {path} already used by {existing}, cannot upload {requested}")]
    LanguageConflict {
        /// The function path.
        path: String,

        /// The language the path was first uploaded with.
        existing: Language,

        /// The language of the rejected upload.
        requested: Language,
    },

    /// A backend operation (initialize, probe, rebuild, teardown) failed.
    #[error("backend error: {0}")]
    Backend(String),

    /// An error that occurred during an I/O operation.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An error that occurred during a database operation.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An error that occurred while (de)serializing json.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl FaasboxError {
    /// Whether this error was caused by the request rather than by the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FaasboxError::Validation(_)
                | FaasboxError::UnsupportedLanguage(_)
                | FaasboxError::StoreNotFound(_)
                | FaasboxError::LanguageConflict { .. }
        )
    }
}
