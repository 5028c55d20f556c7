//! Server-sent event streaming of script runs.
//!
//! Each intermediate output line becomes a `log` event and the run ends with exactly one `result`
//! or `error` event. Dropping the response stream cancels the run.

use std::{convert::Infallible, sync::Arc};

use axum::response::sse::Event;
use faasbox_core::engine::{classify, ExecutionEngine, ExecutionEvent, ExecutionRequest};
use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::payload::{StreamEnvelope, StreamEventKind};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Starts `request` on `engine` and returns the stream of its events.
pub fn execution_events(
    engine: Arc<ExecutionEngine>,
    request: ExecutionRequest,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let (sink, mut events) = engine.event_channel();

    let run = tokio::spawn(async move { engine.run(&request, Some(sink), cancel).await });

    async_stream::stream! {
        let _guard = guard;

        while let Some(ExecutionEvent::Log(line)) = events.recv().await {
            yield Ok(envelope_event(&StreamEnvelope::new(StreamEventKind::Log, classify(&line))));
        }

        let terminal = match run.await {
            Ok(Ok(outcome)) => StreamEnvelope::new(StreamEventKind::Result, outcome.into_output()),
            Ok(Err(e)) => StreamEnvelope::error(e.to_string()),
            Err(e) => {
                tracing::error!("execution task failed: {}", e);
                StreamEnvelope::error(format!("execution task failed: {}", e))
            }
        };

        yield Ok(envelope_event(&terminal));
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn envelope_event(envelope: &StreamEnvelope) -> Event {
    match serde_json::to_string(envelope) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            tracing::error!("failed to serialize stream event: {}", e);
            Event::default().data(r#"{"event":"error","data":"serialization failed","type":"text"}"#)
        }
    }
}
