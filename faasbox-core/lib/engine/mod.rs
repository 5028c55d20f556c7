//! Streaming execution engine.
//!
//! This module handles:
//! - Acquiring a slot and launching the script inside it
//! - Feeding the `{code, input}` payload to the wrapper over stdin
//! - One-line lookahead over stdout so the final line becomes the result
//! - Resolving cancellation, timeout, diagnostic output and process exit into one outcome
//!
//! Whatever ends the run, the child is killed unless it exited on its own, the output readers are
//! stopped, and the slot is released before [`ExecutionEngine::run`] returns.

mod outcome;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use outcome::*;

use std::{process::ExitStatus, sync::Arc, time::Duration};

use getset::Getters;
use serde::Serialize;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader},
    process::Child,
    sync::mpsc,
    task::JoinHandle,
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{
    backend::ExecutionBackend,
    config::{EngineConfig, Language},
    pool::EnvironmentPool,
    FaasboxError, FaasboxResult,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// How long output is still collected after the script exits. Background descendants that keep
/// the pipes open beyond this are cut off.
const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(250);

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A script to run.
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub with_prefix")]
pub struct ExecutionRequest {
    /// The script source.
    code: String,

    /// The language it is written in.
    language: Language,

    /// The raw input made available to the script as `event`/`input`.
    input: String,
}

/// An intermediate event produced while a script runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionEvent {
    /// A stdout line that turned out not to be the final one.
    Log(String),
}

/// Runs scripts in pooled slots.
pub struct ExecutionEngine {
    pool: Arc<EnvironmentPool>,
    backend: Arc<dyn ExecutionBackend>,
    config: EngineConfig,
}

#[derive(Serialize)]
struct Payload<'a> {
    code: &'a str,
    input: &'a str,
}

/// How the race between the run's signals was decided.
enum Resolution {
    Cancelled,
    TimedOut,
    Diagnostic(String),
    Exited,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ExecutionRequest {
    /// Creates a request, rejecting blank code.
    pub fn new(
        code: impl Into<String>,
        language: Language,
        input: impl Into<String>,
    ) -> FaasboxResult<Self> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(FaasboxError::Validation("code must not be empty".into()));
        }

        Ok(Self {
            code,
            language,
            input: input.into(),
        })
    }
}

impl ExecutionEngine {
    /// Creates an engine that runs scripts in `pool`'s slots through `backend`.
    pub fn new(
        pool: Arc<EnvironmentPool>,
        backend: Arc<dyn ExecutionBackend>,
        config: EngineConfig,
    ) -> Self {
        Self {
            pool,
            backend,
            config,
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Creates a channel sized for streaming a run's events.
    pub fn event_channel(
        &self,
    ) -> (
        mpsc::Sender<ExecutionEvent>,
        mpsc::Receiver<ExecutionEvent>,
    ) {
        mpsc::channel(self.config.get_event_buffer().max(1))
    }

    /// Runs `request` to completion.
    ///
    /// Every stdout line except the last is sent to `sink` as [`ExecutionEvent::Log`] when a sink
    /// is given; the last line is classified into the returned outcome. The run ends with the
    /// first of:
    ///
    /// 1. `cancel` firing: [`FaasboxError::ClientCancelled`]
    /// 2. the execution timeout: [`FaasboxError::ExecutionTimeout`]
    /// 3. any stderr line: [`FaasboxError::ExecutionError`] carrying that line
    /// 4. an unsuccessful exit: [`FaasboxError::ExecutionError`] carrying the exit status
    /// 5. a successful exit: the outcome
    ///
    /// Once the script has exited, cancellation and the timeout no longer apply; remaining output
    /// is collected for a short grace period. A full `sink` never delays the other signals.
    /// Nothing is sent to `sink` once the run has ended.
    pub async fn run(
        &self,
        request: &ExecutionRequest,
        sink: Option<mpsc::Sender<ExecutionEvent>>,
        cancel: CancellationToken,
    ) -> FaasboxResult<ExecutionOutcome> {
        let lease = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FaasboxError::ClientCancelled),
            lease = self.pool.acquire_lease(self.config.get_acquire_timeout()) => lease?,
        };

        let invocation = self.backend.invocation(lease.name(), request.language)?;
        lease.mark_executing()?;

        tracing::debug!("running {} script in slot {}", request.language, lease.name());
        let mut child = invocation
            .to_command()
            .spawn()
            .map_err(|source| FaasboxError::SandboxLaunchFailure {
                program: invocation.get_program().clone(),
                source,
            })?;

        let payload = serde_json::to_vec(&Payload {
            code: &request.code,
            input: &request.input,
        })?;

        let result = self.drive(&mut child, payload, sink, cancel).await;
        match &result {
            Ok(_) => tracing::debug!("slot {} finished", lease.name()),
            Err(e) => tracing::info!("slot {} run ended: {}", lease.name(), e),
        }

        drop(lease);
        result
    }

    async fn drive(
        &self,
        child: &mut Child,
        payload: Vec<u8>,
        sink: Option<mpsc::Sender<ExecutionEvent>>,
        cancel: CancellationToken,
    ) -> FaasboxResult<ExecutionOutcome> {
        let writer = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&payload).await {
                    tracing::debug!("failed to write script payload: {}", e);
                }
                // stdin is closed when dropped here
            })
        });

        let (out_tx, mut out_rx) = mpsc::channel(64);
        let (err_tx, mut err_rx) = mpsc::channel(8);
        let mut readers: Vec<JoinHandle<()>> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(forward_lines(stdout, out_tx)));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(forward_lines(stderr, err_tx)));
        }

        let timeout = self.config.get_execution_timeout();
        let deadline = time::sleep(timeout);
        tokio::pin!(deadline);

        // armed once the child exits; bounds how long descendants may keep the pipes open
        let drain = time::sleep(timeout);
        tokio::pin!(drain);

        let mut held: Option<String> = None;
        let mut stdout_open = true;
        let mut stderr_open = true;
        let mut exit_status: Option<ExitStatus> = None;

        let resolution = loop {
            let running = exit_status.is_none();
            if !running && !stdout_open && !stderr_open {
                break Resolution::Exited;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled(), if running => break Resolution::Cancelled,
                _ = &mut deadline, if running => break Resolution::TimedOut,
                _ = &mut drain, if !running => break Resolution::Exited,
                line = err_rx.recv(), if stderr_open => match line {
                    Some(line) => break Resolution::Diagnostic(line),
                    None => stderr_open = false,
                },
                line = out_rx.recv(), if stdout_open => match line {
                    Some(line) => {
                        let (Some(previous), Some(sink)) = (held.replace(line), &sink) else {
                            continue;
                        };

                        // a stalled consumer must not hold off the other signals
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled(), if running => break Resolution::Cancelled,
                            _ = &mut deadline, if running => break Resolution::TimedOut,
                            _ = &mut drain, if !running => break Resolution::Exited,
                            sent = sink.send(ExecutionEvent::Log(previous)) => {
                                if sent.is_err() {
                                    break Resolution::Cancelled;
                                }
                            }
                        }
                    }
                    None => stdout_open = false,
                },
                status = child.wait(), if running => {
                    exit_status = Some(status?);
                    drain.as_mut().reset(time::Instant::now() + EXIT_DRAIN_GRACE);
                }
            }
        };

        if exit_status.is_none() {
            if let Err(e) = child.start_kill() {
                tracing::debug!("failed to kill script process: {}", e);
            }
            if let Err(e) = child.wait().await {
                tracing::debug!("failed to reap script process: {}", e);
            }
        }

        // Orphaned descendants can keep the pipes open, so readers are stopped rather than drained.
        drop(out_rx);
        drop(err_rx);
        for task in readers.into_iter().chain(writer) {
            task.abort();
            let _ = task.await;
        }

        match resolution {
            Resolution::Cancelled => Err(FaasboxError::ClientCancelled),
            Resolution::TimedOut => Err(FaasboxError::ExecutionTimeout(timeout)),
            Resolution::Diagnostic(line) => Err(FaasboxError::ExecutionError(line)),
            Resolution::Exited => match exit_status {
                Some(status) if !status.success() => Err(FaasboxError::ExecutionError(format!(
                    "process exited with {}",
                    status
                ))),
                _ => Ok(ExecutionOutcome::from_final_line(held.unwrap_or_default())),
            },
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Sends each line of `reader` to `tx`, without its line terminator.
async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']).to_string();
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!("stopped reading script output: {}", e);
                break;
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::{config::EngineConfig, pool::SlotState};

    #[test_log::test(tokio::test)]
    async fn test_streams_all_but_last_line() -> FaasboxResult<()> {
        let (pool, engine) = helper::engine("echo L1; echo L2; echo L3", EngineConfig::default());
        let (tx, mut rx) = engine.event_channel();

        let outcome = engine
            .run(&helper::request(), Some(tx), CancellationToken::new())
            .await?;

        assert_eq!(outcome.get_raw(), "L3");
        assert_eq!(helper::drain(&mut rx).await, vec!["L1", "L2"]);
        assert_eq!(pool.available(), pool.size());
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_structured_result_with_and_without_stream() -> FaasboxResult<()> {
        let script = r#"echo A; echo '{"x":1}'"#;
        let (_pool, engine) = helper::engine(script, EngineConfig::default());

        let outcome = engine
            .run(&helper::request(), None, CancellationToken::new())
            .await?;
        let output = outcome.into_output();
        assert_eq!(output.kind, OutputKind::Structured);
        assert_eq!(output.data, json!({"x": 1}));

        let (tx, mut rx) = engine.event_channel();
        let outcome = engine
            .run(&helper::request(), Some(tx), CancellationToken::new())
            .await?;
        assert_eq!(helper::drain(&mut rx).await, vec!["A"]);
        assert_eq!(outcome.get_output().data, json!({"x": 1}));
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_payload_is_written_to_stdin() -> FaasboxResult<()> {
        let (_pool, engine) = helper::engine("cat; echo; echo done", EngineConfig::default());
        let request = ExecutionRequest::new("print(1)", Language::Python, r#"{"a":2}"#)?;

        let (tx, mut rx) = engine.event_channel();
        engine.run(&request, Some(tx), CancellationToken::new()).await?;

        let logs = helper::drain(&mut rx).await;
        let payload: serde_json::Value = serde_json::from_str(&logs[0]).unwrap();
        assert_eq!(payload, json!({"code": "print(1)", "input": "{\"a\":2}"}));
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_diagnostic_line_wins() {
        let script = "echo one; echo two; echo boom >&2; sleep 5; echo late";
        let (pool, engine) = helper::engine(script, EngineConfig::default());

        let started = time::Instant::now();
        let err = engine
            .run(&helper::request(), None, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FaasboxError::ExecutionError(ref line) if line == "boom"));
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(pool.available(), pool.size());
    }

    #[test_log::test(tokio::test)]
    async fn test_diagnostic_beats_failing_exit() {
        let (_pool, engine) = helper::engine("echo bad input >&2; exit 1", EngineConfig::default());
        let err = engine
            .run(&helper::request(), None, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FaasboxError::ExecutionError(ref line) if line == "bad input"));
    }

    #[test_log::test(tokio::test)]
    async fn test_non_zero_exit_is_an_error() {
        let (pool, engine) = helper::engine("echo partial; exit 3", EngineConfig::default());
        let err = engine
            .run(&helper::request(), None, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FaasboxError::ExecutionError(ref msg) if msg.contains('3')));
        assert_eq!(pool.available(), pool.size());
    }

    #[test_log::test(tokio::test)]
    async fn test_timeout_kills_process() {
        let config = EngineConfig::builder()
            .execution_timeout(Duration::from_millis(200))
            .build();
        let (pool, engine) = helper::engine("echo started; exec sleep 10", config);

        let started = time::Instant::now();
        let err = engine
            .run(&helper::request(), None, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FaasboxError::ExecutionTimeout(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(pool.available(), pool.size());
    }

    #[test_log::test(tokio::test)]
    async fn test_cancellation_stops_events() {
        let (pool, engine) = helper::engine("echo A; echo B; exec sleep 10", EngineConfig::default());
        let (tx, mut rx) = engine.event_channel();
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                time::sleep(Duration::from_millis(300)).await;
                cancel.cancel();
            })
        };

        let err = engine
            .run(&helper::request(), Some(tx), cancel)
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, FaasboxError::ClientCancelled));
        // B was still held back when the run was cancelled
        assert_eq!(helper::drain(&mut rx).await, vec!["A"]);
        assert_eq!(pool.available(), pool.size());
    }

    #[test_log::test(tokio::test)]
    async fn test_dropped_sink_cancels_run() {
        let (_pool, engine) = helper::engine("echo A; echo B; echo C; exec sleep 10", EngineConfig::default());
        let (tx, rx) = engine.event_channel();
        drop(rx);

        let err = engine
            .run(&helper::request(), Some(tx), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FaasboxError::ClientCancelled));
    }

    #[test_log::test(tokio::test)]
    async fn test_stalled_consumer_still_times_out() {
        let config = EngineConfig::builder()
            .execution_timeout(Duration::from_millis(200))
            .event_buffer(1)
            .build();
        let script = "echo a; echo b; echo c; echo d; exec sleep 30";
        let (pool, engine) = helper::engine(script, config);
        let (tx, _events) = engine.event_channel();

        let started = time::Instant::now();
        let result = time::timeout(
            Duration::from_secs(3),
            engine.run(&helper::request(), Some(tx), CancellationToken::new()),
        )
        .await
        .expect("run was held up by the unread event channel");

        assert!(matches!(result, Err(FaasboxError::ExecutionTimeout(_))));
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(pool.available(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_stalled_consumer_still_observes_cancellation() {
        let config = EngineConfig::builder().event_buffer(1).build();
        let script = "echo a; echo b; echo c; echo d; exec sleep 30";
        let (pool, engine) = helper::engine(script, config);
        let (tx, _events) = engine.event_channel();
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                time::sleep(Duration::from_millis(300)).await;
                cancel.cancel();
            })
        };

        let result = time::timeout(
            Duration::from_secs(3),
            engine.run(&helper::request(), Some(tx), cancel),
        )
        .await
        .expect("run was held up by the unread event channel");
        canceller.await.unwrap();

        assert!(matches!(result, Err(FaasboxError::ClientCancelled)));
        assert_eq!(pool.available(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_background_descendant_does_not_delay_exit() -> FaasboxResult<()> {
        let config = EngineConfig::builder()
            .execution_timeout(Duration::from_secs(1))
            .build();
        let (pool, engine) = helper::engine("echo done; sleep 5 &", config);

        let started = time::Instant::now();
        let outcome = engine
            .run(&helper::request(), None, CancellationToken::new())
            .await?;

        assert_eq!(outcome.get_raw(), "done");
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(pool.available(), 1);
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_failing_exit_with_background_descendant() {
        let config = EngineConfig::builder()
            .execution_timeout(Duration::from_secs(1))
            .build();
        let (_pool, engine) = helper::engine("sleep 5 & exit 4", config);

        let err = engine
            .run(&helper::request(), None, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FaasboxError::ExecutionError(ref msg) if msg.contains('4')));
    }

    #[test_log::test(tokio::test)]
    async fn test_acquisition_timeout_is_reported() {
        let config = EngineConfig::builder()
            .acquire_timeout(Duration::from_millis(50))
            .build();
        let (pool, engine) = helper::engine("echo 1", config);
        let _held = pool.acquire(Duration::from_millis(50)).await.unwrap();

        let err = engine
            .run(&helper::request(), None, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FaasboxError::AcquisitionTimeout(_)));
    }

    #[test_log::test(tokio::test)]
    async fn test_launch_failure_releases_slot() {
        let pool = Arc::new(EnvironmentPool::new(1).unwrap());
        let backend = Arc::new(helper::ShellBackend {
            program: "/nonexistent/faasbox-interpreter".into(),
            script: String::new(),
        });
        let engine = ExecutionEngine::new(Arc::clone(&pool), backend, EngineConfig::default());

        let err = engine
            .run(&helper::request(), None, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FaasboxError::SandboxLaunchFailure { .. }));
        assert_eq!(pool.state("faasbox-runtime-0").unwrap(), SlotState::Idle);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_request_rejects_blank_code() {
        assert!(matches!(
            ExecutionRequest::new("  \n", Language::Python, ""),
            Err(FaasboxError::Validation(_))
        ));
    }

    #[test_log::test(tokio::test)]
    #[ignore = "requires python3"]
    async fn test_python_wrapper_end_to_end() -> FaasboxResult<()> {
        let dir = tempfile::tempdir()?;
        crate::resource::install_wrappers(dir.path()).await?;

        let pool = Arc::new(EnvironmentPool::new(1)?);
        let backend = Arc::new(helper::DirectBackend {
            wrapper_dir: dir.path().to_path_buf(),
        });
        let engine = ExecutionEngine::new(Arc::clone(&pool), backend, EngineConfig::default());

        let code = "print('hello')\nreturn {'name': event['name']}";
        let request = ExecutionRequest::new(code, Language::Python, r#"{"name":"faas"}"#)?;
        let (tx, mut rx) = engine.event_channel();
        let outcome = engine.run(&request, Some(tx), CancellationToken::new()).await?;

        assert_eq!(helper::drain(&mut rx).await, vec!["hello"]);
        assert_eq!(outcome.get_output().data, json!({"name": "faas"}));

        let failing = ExecutionRequest::new("raise ValueError('nope')", Language::Python, "")?;
        let err = engine.run(&failing, None, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, FaasboxError::ExecutionError(ref line) if line.contains("nope")));
        Ok(())
    }

    mod helper {
        use std::path::PathBuf;

        use async_trait::async_trait;

        use super::*;
        use crate::{backend::HealthSignal, launcher::Invocation};

        /// Runs a fixed shell script regardless of the requested language.
        pub struct ShellBackend {
            pub program: String,
            pub script: String,
        }

        /// Runs the real wrapper with the host interpreter, without isolation.
        pub struct DirectBackend {
            pub wrapper_dir: PathBuf,
        }

        #[async_trait]
        impl ExecutionBackend for ShellBackend {
            fn name(&self) -> &'static str {
                "shell"
            }

            async fn initialize(&self, _slots: &[String]) -> FaasboxResult<()> {
                Ok(())
            }

            async fn is_running(&self, _slot: &str) -> FaasboxResult<bool> {
                Ok(true)
            }

            async fn health_signal(&self, _slot: &str) -> FaasboxResult<HealthSignal> {
                Ok(HealthSignal::NoHealthcheck)
            }

            async fn rebuild(&self, _slot: &str) -> FaasboxResult<()> {
                Ok(())
            }

            fn invocation(&self, _slot: &str, _language: Language) -> FaasboxResult<Invocation> {
                let mut invocation = Invocation::new(self.program.as_str());
                invocation.args(["-c", self.script.as_str()]);
                Ok(invocation)
            }

            async fn teardown(&self, _slots: &[String]) -> FaasboxResult<()> {
                Ok(())
            }
        }

        #[async_trait]
        impl ExecutionBackend for DirectBackend {
            fn name(&self) -> &'static str {
                "direct"
            }

            async fn initialize(&self, _slots: &[String]) -> FaasboxResult<()> {
                Ok(())
            }

            async fn is_running(&self, _slot: &str) -> FaasboxResult<bool> {
                Ok(true)
            }

            async fn health_signal(&self, _slot: &str) -> FaasboxResult<HealthSignal> {
                Ok(HealthSignal::NoHealthcheck)
            }

            async fn rebuild(&self, _slot: &str) -> FaasboxResult<()> {
                Ok(())
            }

            fn invocation(&self, _slot: &str, language: Language) -> FaasboxResult<Invocation> {
                let mut invocation = Invocation::new(language.interpreter());
                invocation
                    .args(language.interpreter_flags().iter().copied())
                    .arg(self.wrapper_dir.join(language.wrapper_file_name()));
                Ok(invocation)
            }

            async fn teardown(&self, _slots: &[String]) -> FaasboxResult<()> {
                Ok(())
            }
        }

        pub fn engine(script: &str, config: EngineConfig) -> (Arc<EnvironmentPool>, ExecutionEngine) {
            let pool = Arc::new(EnvironmentPool::new(1).unwrap());
            let backend = Arc::new(ShellBackend {
                program: "sh".into(),
                script: script.into(),
            });
            let engine = ExecutionEngine::new(Arc::clone(&pool), backend, config);
            (pool, engine)
        }

        pub fn request() -> ExecutionRequest {
            ExecutionRequest::new("ignored", Language::Python, "").unwrap()
        }

        pub async fn drain(rx: &mut mpsc::Receiver<ExecutionEvent>) -> Vec<String> {
            let mut lines = Vec::new();
            while let Some(ExecutionEvent::Log(line)) = rx.recv().await {
                lines.push(line);
            }
            lines
        }
    }
}
