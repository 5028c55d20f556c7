//! Error types for the faasbox server.
//!
//! Every error renders as `{"error": "<message>"}` with a status code derived from its cause.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use faasbox_core::FaasboxError;
use thiserror::Error;

use crate::payload::ErrorResponse;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a server operation.
pub type ServerResult<T> = Result<T, ServerError>;

/// An error that occurred while handling a request or configuring the server.
#[derive(pretty_error_debug::Debug, Error)]
pub enum ServerError {
    /// The request was rejected before any slot was touched.
    #[error(transparent)]
    ValidationError(#[from] ValidationError),

    /// An error from the execution core.
    #[error(transparent)]
    Core(#[from] FaasboxError),

    /// The request body exceeds the configured limit.
    #[error("request body too large: {0}")]
    PayloadTooLarge(String),

    /// The server configuration is invalid.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// An unexpected internal failure.
    #[error("internal error: {0}")]
    InternalError(String),
}

/// A problem with the request payload.
#[derive(pretty_error_debug::Debug, Error)]
pub enum ValidationError {
    /// Generic invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The language tag is not supported.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// No code was supplied.
    #[error("code is required")]
    EmptyCode,

    /// The code exceeds the configured maximum.
    #[error("code is {size} bytes, the limit is {limit} bytes")]
    CodeTooLarge {
        /// Size of the submitted code.
        size: usize,

        /// Configured maximum.
        limit: usize,
    },
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ServerError {
    /// The HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServerError::Core(e) => match e {
                FaasboxError::Validation(_) | FaasboxError::UnsupportedLanguage(_) => {
                    StatusCode::BAD_REQUEST
                }
                FaasboxError::StoreNotFound(_) => StatusCode::NOT_FOUND,
                FaasboxError::LanguageConflict { .. } => StatusCode::CONFLICT,
                FaasboxError::AcquisitionTimeout(_)
                | FaasboxError::SlotStateConflict { .. }
                | FaasboxError::PoolClosed => StatusCode::SERVICE_UNAVAILABLE,
                FaasboxError::ExecutionTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                // nobody is listening any more; the status only shows up in logs
                FaasboxError::ClientCancelled => StatusCode::REQUEST_TIMEOUT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::ConfigError(_) | ServerError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::debug!("request rejected: {}", self);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
