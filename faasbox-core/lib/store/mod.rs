//! Versioned function storage.
//!
//! This module handles:
//! - Path normalization and validation
//! - Monotonic per-path version timestamps
//! - Binding each path to a single language
//!
//! The module provides an in-memory store for tests and ephemeral deployments, and a SQLite store
//! for persistence.

mod memory;
mod sqlite;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use memory::*;
pub use sqlite::*;

use async_trait::async_trait;
use getset::Getters;
use serde::Serialize;

use crate::{config::Language, FaasboxError, FaasboxResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// One stored version of a function.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize)]
#[getset(get = "pub with_prefix")]
pub struct FunctionRecord {
    /// Normalized path.
    path: String,

    /// Language the path is bound to.
    language: Language,

    /// Version timestamp in Unix milliseconds.
    version: i64,

    /// Script source of this version.
    #[serde(skip)]
    code: String,
}

/// Path-addressed, versioned code storage.
#[async_trait]
pub trait FunctionStore: Send + Sync {
    /// Stores a new version of `path` and returns it.
    ///
    /// Fails with [`FaasboxError::LanguageConflict`] if the path already holds another language.
    async fn put(&self, path: &str, code: &str, language: Language)
        -> FaasboxResult<FunctionRecord>;

    /// Fetches `version` of `path`, or the latest version when `version` is `None` or not
    /// positive.
    async fn get(&self, path: &str, version: Option<i64>) -> FaasboxResult<FunctionRecord>;
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl FunctionRecord {
    /// Creates a record.
    pub fn new(path: String, language: Language, version: i64, code: String) -> Self {
        Self {
            path,
            language,
            version,
            code,
        }
    }

    /// Consumes the record, returning the script source.
    pub fn into_code(self) -> String {
        self.code
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Strips leading slashes and rejects empty paths and parent-directory references.
///
/// ## Example
///
/// ```
/// use faasbox_core::store::normalize_path;
///
/// assert_eq!(normalize_path("/hello/world").unwrap(), "hello/world");
/// assert!(normalize_path("../etc/passwd").is_err());
/// ```
pub fn normalize_path(path: &str) -> FaasboxResult<String> {
    let normalized = path.trim().trim_start_matches('/');
    if normalized.is_empty() {
        return Err(FaasboxError::Validation("path must not be empty".into()));
    }
    if normalized.contains("..") {
        return Err(FaasboxError::Validation(format!(
            "path must not contain '..': {}",
            path
        )));
    }

    Ok(normalized.to_string())
}

/// Returns the version for a new upload: the current time in milliseconds, or one past `latest`
/// when the clock has not moved beyond it.
pub fn next_version(latest: Option<i64>) -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    match latest {
        Some(latest) if latest >= now => latest + 1,
        _ => now,
    }
}

/// Treats missing and non-positive versions as "latest".
pub(crate) fn requested_version(version: Option<i64>) -> Option<i64> {
    version.filter(|v| *v > 0)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("f").unwrap(), "f");
        assert_eq!(normalize_path("//f/g").unwrap(), "f/g");
        assert!(normalize_path("/").is_err());
        assert!(normalize_path("a/../b").is_err());
    }

    #[test]
    fn test_next_version_is_monotonic() {
        let first = next_version(None);
        let far_future = first + 60_000;

        assert!(next_version(Some(first)) > first);
        assert_eq!(next_version(Some(far_future)), far_future + 1);
    }

    #[test]
    fn test_requested_version() {
        assert_eq!(requested_version(None), None);
        assert_eq!(requested_version(Some(0)), None);
        assert_eq!(requested_version(Some(-4)), None);
        assert_eq!(requested_version(Some(17)), Some(17));
    }
}
