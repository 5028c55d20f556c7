//! Wrapper scripts embedded into the binary and installed on the host at startup.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::{config::Language, FaasboxResult};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const PYTHON_WRAPPER: &str = include_str!("wrapper.py");
const JAVASCRIPT_WRAPPER: &str = include_str!("wrapper.js");
const TYPESCRIPT_WRAPPER: &str = include_str!("wrapper.ts");

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Returns the wrapper script source for `language`.
pub fn wrapper_source(language: Language) -> &'static str {
    match language {
        Language::Python => PYTHON_WRAPPER,
        Language::JavaScript => JAVASCRIPT_WRAPPER,
        Language::TypeScript => TYPESCRIPT_WRAPPER,
    }
}

/// Writes the wrapper for every language into `dir`, creating it if needed.
///
/// Existing files are overwritten so an upgraded binary always runs its own wrappers.
pub async fn install_wrappers(dir: &Path) -> FaasboxResult<Vec<PathBuf>> {
    fs::create_dir_all(dir).await?;

    let mut installed = Vec::with_capacity(Language::ALL.len());
    for language in Language::ALL {
        let path = dir.join(language.wrapper_file_name());
        fs::write(&path, wrapper_source(language)).await?;
        installed.push(path);
    }

    tracing::debug!("installed {} wrappers into {}", installed.len(), dir.display());
    Ok(installed)
}

/// Whether `dir` holds a wrapper for every language.
pub async fn wrappers_present(dir: &Path) -> bool {
    for language in Language::ALL {
        match fs::metadata(dir.join(language.wrapper_file_name())).await {
            Ok(meta) if meta.is_file() => {}
            _ => return false,
        }
    }
    true
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_install_wrappers() -> FaasboxResult<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("wrappers");

        assert!(!wrappers_present(&target).await);

        let installed = install_wrappers(&target).await?;
        assert_eq!(installed.len(), 3);
        assert!(wrappers_present(&target).await);

        let python = fs::read_to_string(target.join("wrapper.py")).await?;
        assert!(python.contains("__user_main__"));

        fs::remove_file(target.join("wrapper.ts")).await?;
        assert!(!wrappers_present(&target).await);
        Ok(())
    }
}
