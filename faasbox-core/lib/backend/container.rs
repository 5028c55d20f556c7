use std::{path::PathBuf, process::Output};

use async_trait::async_trait;
use faasbox_utils::{DEFAULT_CONTAINER_ENGINE, DEFAULT_RUNTIME_IMAGE};
use futures::future::join_all;
use getset::Getters;
use tokio::process::Command;
use typed_builder::TypedBuilder;

use crate::{
    config::{Language, ResourceLimits},
    launcher::Invocation,
    FaasboxError, FaasboxResult,
};

use super::{ExecutionBackend, HealthSignal};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Where the wrapper directory is mounted inside each container.
pub const CONTAINER_RUNTIME_DIR: &str = "/app/runtime";

const RUNNING_FORMAT: &str = "{{.State.Running}}";

const HEALTH_FORMAT: &str =
    "{{if .State.Health}}{{.State.Health.Status}}{{else}}no-healthcheck{{end}}";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Settings for the container backend.
#[derive(Debug, Clone, Getters, TypedBuilder)]
#[getset(get = "pub with_prefix")]
pub struct ContainerConfig {
    /// The container engine binary (`podman` or `docker`).
    #[builder(default = DEFAULT_CONTAINER_ENGINE.to_string(), setter(into))]
    engine: String,

    /// The runtime image every slot runs.
    #[builder(default = DEFAULT_RUNTIME_IMAGE.to_string(), setter(into))]
    image: String,

    /// Dockerfile to build the image from at startup. The image must already exist when unset.
    #[builder(default)]
    dockerfile: Option<PathBuf>,

    /// Host directory holding the wrapper scripts, mounted read-only into every container.
    #[builder(setter(into))]
    wrapper_dir: PathBuf,

    /// Per-container CPU and memory caps.
    #[builder(default)]
    limits: ResourceLimits,
}

/// Slots backed by long-running containers. Scripts run through `<engine> exec`.
#[derive(Debug)]
pub struct ContainerBackend {
    config: ContainerConfig,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ContainerBackend {
    /// Creates a container backend.
    pub fn new(config: ContainerConfig) -> Self {
        Self { config }
    }

    /// Arguments for `<engine> run` that start `slot`.
    pub fn run_args(&self, slot: &str) -> Vec<String> {
        let limits = &self.config.limits;
        let memory = limits.get_memory().as_container_arg();

        let mut args: Vec<String> = vec![
            "run".into(),
            "-d".into(),
            "--name".into(),
            slot.into(),
            "--cpus".into(),
            limits.get_cpus().to_string(),
            "--memory".into(),
            memory.clone(),
            "--memory-swap".into(),
            memory,
            "--network".into(),
            "none".into(),
            "-v".into(),
            format!(
                "{}:{}:ro",
                self.config.wrapper_dir.display(),
                CONTAINER_RUNTIME_DIR
            ),
        ];

        let health_cmd = format!("test -d {} || exit 1", CONTAINER_RUNTIME_DIR);
        args.extend(
            [
                "--health-cmd",
                health_cmd.as_str(),
                "--health-interval",
                "10s",
                "--health-timeout",
                "5s",
                "--health-retries",
                "3",
            ]
            .map(String::from),
        );

        args.extend([
            self.config.image.clone(),
            "sleep".into(),
            "infinity".into(),
        ]);
        args
    }

    /// Builds the runtime image from the configured Dockerfile, if any.
    pub async fn build_image(&self) -> FaasboxResult<()> {
        let Some(dockerfile) = &self.config.dockerfile else {
            return Ok(());
        };

        let context = dockerfile
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        tracing::info!(
            "building image {} from {}",
            self.config.image,
            dockerfile.display()
        );

        let output = self
            .engine(&[
                "build",
                "-t",
                &self.config.image,
                "-f",
                &dockerfile.display().to_string(),
                &context.display().to_string(),
            ])
            .await?;
        check(&output, "build image")?;

        Ok(())
    }

    async fn start(&self, slot: &str) -> FaasboxResult<()> {
        let args = self.run_args(slot);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.engine(&args).await?;
        check(&output, &format!("start container {}", slot))?;

        tracing::info!("started container {}", slot);
        Ok(())
    }

    /// Stops and removes a container, ignoring failures for containers that do not exist.
    async fn remove(&self, slot: &str) {
        for args in [["stop", slot], ["rm", slot]] {
            if let Ok(output) = self.engine(&args).await {
                if !output.status.success() {
                    tracing::debug!(
                        "{} {} {}: {}",
                        self.config.engine,
                        args[0],
                        slot,
                        String::from_utf8_lossy(&output.stderr).trim()
                    );
                }
            }
        }
    }

    async fn inspect(&self, slot: &str, format: &str) -> FaasboxResult<String> {
        let output = self.engine(&["inspect", "--format", format, slot]).await?;
        check(&output, &format!("inspect container {}", slot))?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn engine(&self, args: &[&str]) -> FaasboxResult<Output> {
        Command::new(&self.config.engine)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                FaasboxError::Backend(format!(
                    "failed to run {} {}: {}",
                    self.config.engine,
                    args.first().copied().unwrap_or_default(),
                    e
                ))
            })
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl ExecutionBackend for ContainerBackend {
    fn name(&self) -> &'static str {
        "container"
    }

    async fn initialize(&self, slots: &[String]) -> FaasboxResult<()> {
        which::which(&self.config.engine).map_err(|e| {
            FaasboxError::Backend(format!(
                "container engine {} not found: {}",
                self.config.engine, e
            ))
        })?;

        self.build_image().await?;

        let results = join_all(slots.iter().map(|slot| self.rebuild(slot))).await;
        for result in results {
            result?;
        }

        tracing::info!("started {} containers", slots.len());
        Ok(())
    }

    async fn is_running(&self, slot: &str) -> FaasboxResult<bool> {
        Ok(self.inspect(slot, RUNNING_FORMAT).await? == "true")
    }

    async fn health_signal(&self, slot: &str) -> FaasboxResult<HealthSignal> {
        let status = self.inspect(slot, HEALTH_FORMAT).await?;
        Ok(HealthSignal::from_status(&status))
    }

    async fn rebuild(&self, slot: &str) -> FaasboxResult<()> {
        self.remove(slot).await;
        self.start(slot).await
    }

    fn invocation(&self, slot: &str, language: Language) -> FaasboxResult<Invocation> {
        let mut invocation = Invocation::new(self.config.engine.as_str());
        invocation
            .args(["exec", "-i", slot, language.interpreter()])
            .args(language.interpreter_flags().iter().copied())
            .arg(format!(
                "{}/{}",
                CONTAINER_RUNTIME_DIR,
                language.wrapper_file_name()
            ));
        Ok(invocation)
    }

    async fn teardown(&self, slots: &[String]) -> FaasboxResult<()> {
        join_all(slots.iter().map(|slot| self.remove(slot))).await;
        tracing::info!("removed {} containers", slots.len());
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn check(output: &Output, action: &str) -> FaasboxResult<()> {
    if output.status.success() {
        return Ok(());
    }

    Err(FaasboxError::Backend(format!(
        "failed to {}: {}",
        action,
        String::from_utf8_lossy(&output.stderr).trim()
    )))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
