use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{config::Language, FaasboxError, FaasboxResult};

use super::{next_version, normalize_path, requested_version, FunctionRecord, FunctionStore};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A function store that lives in process memory.
#[derive(Debug, Default)]
pub struct MemoryFunctionStore {
    entries: RwLock<HashMap<String, Entry>>,
}

#[derive(Debug)]
struct Entry {
    language: Language,
    versions: BTreeMap<i64, String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MemoryFunctionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl FunctionStore for MemoryFunctionStore {
    async fn put(
        &self,
        path: &str,
        code: &str,
        language: Language,
    ) -> FaasboxResult<FunctionRecord> {
        let path = normalize_path(path)?;
        let mut entries = self.entries.write().await;

        let entry = entries.entry(path.clone()).or_insert_with(|| Entry {
            language,
            versions: BTreeMap::new(),
        });

        if entry.language != language {
            return Err(FaasboxError::LanguageConflict {
                path,
                existing: entry.language,
                requested: language,
            });
        }

        let latest = entry.versions.keys().next_back().copied();
        let version = next_version(latest);
        entry.versions.insert(version, code.to_string());

        Ok(FunctionRecord::new(path, language, version, code.to_string()))
    }

    async fn get(&self, path: &str, version: Option<i64>) -> FaasboxResult<FunctionRecord> {
        let path = normalize_path(path)?;
        let entries = self.entries.read().await;

        let entry = entries
            .get(&path)
            .ok_or_else(|| FaasboxError::StoreNotFound(format!("script not found: {}", path)))?;

        let found = match requested_version(version) {
            Some(version) => entry.versions.get_key_value(&version),
            None => entry.versions.iter().next_back(),
        };

        let (version, code) = found.ok_or_else(|| {
            FaasboxError::StoreNotFound(format!(
                "version {} of {} not found",
                version.unwrap_or_default(),
                path
            ))
        })?;

        Ok(FunctionRecord::new(
            path.clone(),
            entry.language,
            *version,
            code.clone(),
        ))
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_versions_and_latest() -> FaasboxResult<()> {
        let store = MemoryFunctionStore::new();

        let first = store.put("/f", "return 1", Language::Python).await?;
        let second = store.put("/f", "return 2", Language::Python).await?;
        assert_eq!(first.get_path(), "f");
        assert!(second.get_version() > first.get_version());

        let latest = store.get("/f", None).await?;
        assert_eq!(latest.get_code(), "return 2");
        assert_eq!(latest.get_version(), second.get_version());

        let original = store.get("f", Some(*first.get_version())).await?;
        assert_eq!(original.into_code(), "return 1");

        let zero = store.get("/f", Some(0)).await?;
        assert_eq!(zero.get_version(), second.get_version());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_path_and_version() -> FaasboxResult<()> {
        let store = MemoryFunctionStore::new();
        assert!(matches!(
            store.get("/nope", None).await,
            Err(FaasboxError::StoreNotFound(_))
        ));

        let record = store.put("/f", "x", Language::JavaScript).await?;
        assert!(matches!(
            store.get("/f", Some(record.get_version() + 1)).await,
            Err(FaasboxError::StoreNotFound(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_language_conflict() -> FaasboxResult<()> {
        let store = MemoryFunctionStore::new();
        store.put("/f", "x", Language::Python).await?;

        let err = store.put("/f", "x", Language::TypeScript).await.unwrap_err();
        assert!(matches!(
            err,
            FaasboxError::LanguageConflict {
                existing: Language::Python,
                requested: Language::TypeScript,
                ..
            }
        ));

        assert!(matches!(
            store.put("../f", "x", Language::Python).await,
            Err(FaasboxError::Validation(_))
        ));
        Ok(())
    }
}
