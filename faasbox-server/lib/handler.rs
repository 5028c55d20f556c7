//! Request handlers for the faasbox server.
//!
//! This module implements:
//! - The upload, run and run-now endpoints
//! - Health and pool status endpoints
//! - Validation of submitted code before any slot is touched

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, Query, Request, State},
    http::StatusCode,
    response::{sse::Sse, IntoResponse, Response},
    Json,
};
use faasbox_core::{config::Language, engine::ExecutionRequest};
use serde::de::DeserializeOwned;

use crate::{
    error::{ServerError, ValidationError},
    payload::{
        input_text, PoolStatusResponse, RegularMessageResponse, RunNowRequest, RunQuery,
        RunRequest, UploadRequest, UploadResponse,
    },
    state::AppState,
    stream, ServerResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A JSON body whose rejections render as [`ServerError`]s.
pub struct JsonBody<T>(pub T);

//--------------------------------------------------------------------------------------------------
// Functions: Handlers
//--------------------------------------------------------------------------------------------------

/// Handler for health check
pub async fn health() -> ServerResult<impl IntoResponse> {
    Ok((
        StatusCode::OK,
        Json(RegularMessageResponse {
            message: "Service is healthy".to_string(),
        }),
    ))
}

/// Handler for pool status
pub async fn status(State(state): State<AppState>) -> ServerResult<impl IntoResponse> {
    let snapshot = state.get_pool().snapshot();
    Ok(Json(PoolStatusResponse {
        backend: state.get_backend_name().clone(),
        slots: snapshot.slots,
        available: snapshot.available,
    }))
}

/// Handler for storing a new function version
pub async fn upload(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UploadRequest>,
) -> ServerResult<impl IntoResponse> {
    let language = validate_submission(&state, &payload.code, &payload.language)?;

    let record = state
        .get_store()
        .put(&payload.path, &payload.code, language)
        .await?;

    tracing::info!(
        "stored {} version {} ({})",
        record.get_path(),
        record.get_version(),
        language
    );

    Ok((
        StatusCode::OK,
        Json(UploadResponse {
            path: record.get_path().clone(),
            language: language.to_string(),
            version: *record.get_version(),
        }),
    ))
}

/// Handler for running a stored function
pub async fn run(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<RunQuery>,
    JsonBody(payload): JsonBody<RunRequest>,
) -> ServerResult<Response> {
    let record = state.get_store().get(&path, query.version()).await?;
    tracing::debug!("resolved {} to version {}", record.get_path(), record.get_version());

    let language = *record.get_language();
    let request = ExecutionRequest::new(record.into_code(), language, input_text(&payload.input))?;
    execute(state, request, payload.stream).await
}

/// Handler for running inline code
pub async fn run_now(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RunNowRequest>,
) -> ServerResult<Response> {
    let language = validate_submission(&state, &payload.code, &payload.language)?;
    let request = ExecutionRequest::new(payload.code, language, input_text(&payload.input))?;
    execute(state, request, payload.stream).await
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Runs `request`, answering with a single JSON result or an event stream.
async fn execute(state: AppState, request: ExecutionRequest, streaming: bool) -> ServerResult<Response> {
    let engine = state.get_engine().clone();

    if streaming {
        let events = stream::execution_events(engine, request);
        return Ok(Sse::new(events).into_response());
    }

    // the run is cancelled by dropping this future when the client goes away
    let outcome = engine
        .run(&request, None, tokio_util::sync::CancellationToken::new())
        .await?;

    Ok((StatusCode::OK, Json(outcome.into_output())).into_response())
}

fn validate_submission(state: &AppState, code: &str, language: &str) -> ServerResult<Language> {
    let language = language
        .parse::<Language>()
        .map_err(|_| ValidationError::UnsupportedLanguage(language.to_string()))?;

    if code.trim().is_empty() {
        return Err(ValidationError::EmptyCode.into());
    }

    let limit = state.get_config().get_max_code_size();
    if code.len() > limit {
        return Err(ValidationError::CodeTooLarge {
            size: code.len(),
            limit,
        }
        .into());
    }

    Ok(language)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_error(rejection)),
        }
    }
}

fn rejection_error(rejection: JsonRejection) -> ServerError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(rejection.body_text())
    } else {
        ValidationError::InvalidInput(rejection.body_text()).into()
    }
}
