use std::path::{Path, PathBuf};

use tokio::{fs, process::Command};

use crate::{config::ResourceLimits, FaasboxError, FaasboxResult};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Returns the unit name for a slice, appending `.slice` when missing.
pub fn slice_unit_name(name: &str) -> String {
    if name.ends_with(".slice") {
        name.to_string()
    } else {
        format!("{}.slice", name)
    }
}

/// Renders the unit file for a shared accounting slice.
pub fn render_slice_unit(limits: &ResourceLimits) -> String {
    format!(
        "[Unit]\nDescription=faasbox sandbox executions\n\n[Slice]\nCPUQuota={}\nMemoryMax={}\nMemorySwapMax=0\n",
        limits.cpu_quota(),
        limits.get_memory()
    )
}

/// Returns the directory systemd reads user units from.
pub fn user_unit_dir() -> FaasboxResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("systemd").join("user"))
        .ok_or_else(|| FaasboxError::Backend("cannot determine user config directory".into()))
}

/// Writes the slice unit into `unit_dir` and asks the user's systemd instance to start it.
///
/// Failing to write the unit is fatal. A failing `systemctl` call is fatal as well, since without
/// the slice every sandboxed invocation would fail to launch.
pub async fn install_slice(
    name: &str,
    limits: &ResourceLimits,
    unit_dir: &Path,
) -> FaasboxResult<PathBuf> {
    let unit_name = slice_unit_name(name);
    let unit_path = unit_dir.join(&unit_name);

    fs::create_dir_all(unit_dir).await?;
    fs::write(&unit_path, render_slice_unit(limits)).await?;
    tracing::info!("wrote slice unit {}", unit_path.display());

    systemctl(&["--user", "daemon-reload"]).await?;
    systemctl(&["--user", "start", &unit_name]).await?;
    tracing::info!("started slice {}", unit_name);

    Ok(unit_path)
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

async fn systemctl(args: &[&str]) -> FaasboxResult<()> {
    let output = Command::new("systemctl").args(args).output().await?;
    if !output.status.success() {
        return Err(FaasboxError::Backend(format!(
            "systemctl {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemorySize;

    #[test]
    fn test_slice_unit_name() {
        assert_eq!(slice_unit_name("faasbox"), "faasbox.slice");
        assert_eq!(slice_unit_name("faasbox.slice"), "faasbox.slice");
    }

    #[test]
    fn test_render_slice_unit() {
        let limits = ResourceLimits::new(0.5, MemorySize::parse("64M").unwrap()).unwrap();
        let unit = render_slice_unit(&limits);

        assert!(unit.contains("[Slice]"));
        assert!(unit.contains("CPUQuota=50%"));
        assert!(unit.contains("MemoryMax=64M"));
        assert!(unit.contains("MemorySwapMax=0"));
    }

    #[test_log::test(tokio::test)]
    #[ignore = "requires a user systemd instance"]
    async fn test_install_slice() -> FaasboxResult<()> {
        let unit_dir = user_unit_dir()?;
        let path = install_slice("faasbox-test", &ResourceLimits::default(), &unit_dir).await?;
        assert!(path.exists());

        tokio::fs::remove_file(&path).await?;
        Ok(())
    }
}
