use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use faasbox_utils::SLOTS_SUBDIR;
use getset::Getters;
use tokio::fs;
use typed_builder::TypedBuilder;

use crate::{
    config::{Language, ResourceLimits},
    launcher::{self, Accounting, Invocation, SandboxLayout, BWRAP, SYSTEMD_RUN},
    resource, FaasboxError, FaasboxResult,
};

use super::{ExecutionBackend, HealthSignal};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Settings for the sandbox backend.
#[derive(Debug, Clone, Getters, TypedBuilder)]
#[getset(get = "pub with_prefix")]
pub struct SandboxConfig {
    /// Root directory; slot directories are created under `<root>/slots`.
    #[builder(setter(into))]
    root_dir: PathBuf,

    /// CPU and memory caps applied to every invocation.
    #[builder(default)]
    limits: ResourceLimits,

    /// Shared module directory for TypeScript.
    #[builder(default)]
    module_dir: Option<PathBuf>,

    /// Shared accounting slice to install and place invocations in.
    #[builder(default)]
    slice: Option<String>,

    /// Where the slice unit is written. Defaults to the user's systemd unit directory.
    #[builder(default)]
    unit_dir: Option<PathBuf>,
}

/// Slots backed by private directories; each execution spawns a fresh bubblewrap sandbox that
/// sees only its slot's wrappers.
#[derive(Debug)]
pub struct SandboxBackend {
    config: SandboxConfig,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl SandboxBackend {
    /// Creates a sandbox backend.
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    /// The private directory of `slot`.
    pub fn slot_dir(&self, slot: &str) -> PathBuf {
        self.config.root_dir.join(SLOTS_SUBDIR).join(slot)
    }

    /// The layout a sandbox for `slot` is built from.
    pub fn layout(&self, slot: &str) -> SandboxLayout {
        let accounting = match &self.config.slice {
            Some(name) => Accounting::Slice(name.clone()),
            None => Accounting::Scope,
        };

        SandboxLayout::builder()
            .wrapper_dir(self.slot_dir(slot))
            .module_dir(self.config.module_dir.clone())
            .accounting(accounting)
            .build()
    }

    async fn prepare(&self, slot: &str) -> FaasboxResult<()> {
        let dir = self.slot_dir(slot);
        remove_dir_if_exists(&dir).await?;
        resource::install_wrappers(&dir).await?;
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl ExecutionBackend for SandboxBackend {
    fn name(&self) -> &'static str {
        "sandbox"
    }

    async fn initialize(&self, slots: &[String]) -> FaasboxResult<()> {
        for binary in [BWRAP, SYSTEMD_RUN] {
            which::which(binary).map_err(|e| {
                FaasboxError::Backend(format!("{} not found on PATH: {}", binary, e))
            })?;
        }

        if let Some(slice) = &self.config.slice {
            let unit_dir = match &self.config.unit_dir {
                Some(dir) => dir.clone(),
                None => launcher::user_unit_dir()?,
            };
            launcher::install_slice(slice, &self.config.limits, &unit_dir).await?;
        }

        for slot in slots {
            self.prepare(slot).await?;
        }

        tracing::info!(
            "prepared {} sandbox slots under {}",
            slots.len(),
            self.config.root_dir.join(SLOTS_SUBDIR).display()
        );
        Ok(())
    }

    async fn is_running(&self, slot: &str) -> FaasboxResult<bool> {
        let dir_exists = fs::metadata(self.slot_dir(slot))
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);

        Ok(dir_exists && which::which(BWRAP).is_ok() && which::which(SYSTEMD_RUN).is_ok())
    }

    async fn health_signal(&self, slot: &str) -> FaasboxResult<HealthSignal> {
        if resource::wrappers_present(&self.slot_dir(slot)).await {
            Ok(HealthSignal::Healthy)
        } else {
            Ok(HealthSignal::Unhealthy("wrapper scripts missing".into()))
        }
    }

    async fn rebuild(&self, slot: &str) -> FaasboxResult<()> {
        self.prepare(slot).await?;
        tracing::info!("rebuilt sandbox slot {}", slot);
        Ok(())
    }

    fn invocation(&self, slot: &str, language: Language) -> FaasboxResult<Invocation> {
        Ok(launcher::build(
            language,
            &self.config.limits,
            &self.layout(slot),
        ))
    }

    async fn teardown(&self, slots: &[String]) -> FaasboxResult<()> {
        for slot in slots {
            if let Err(e) = remove_dir_if_exists(&self.slot_dir(slot)).await {
                tracing::warn!("failed to remove sandbox slot {}: {}", slot, e);
            }
        }
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

async fn remove_dir_if_exists(dir: &Path) -> FaasboxResult<()> {
    match fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
