use std::{path::Path, str::FromStr};

use async_trait::async_trait;
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use tokio::sync::Mutex;

use crate::{config::Language, FaasboxError, FaasboxResult};

use super::{next_version, normalize_path, requested_version, FunctionRecord, FunctionStore};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Migrations for the function database.
pub static FUNCTIONS_DB_MIGRATOR: Migrator = sqlx::migrate!("lib/store/migrations");

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A function store persisted in SQLite.
#[derive(Debug)]
pub struct SqliteFunctionStore {
    pool: Pool<Sqlite>,

    /// Serializes uploads so the read of `latest` and the insert of the next version are atomic.
    write_lock: Mutex<()>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl SqliteFunctionStore {
    /// Opens (creating if needed) the database at `db_path` and applies migrations.
    pub async fn open(db_path: &Path) -> FaasboxResult<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        Self::connect_with(options).await
    }

    /// Connects to a `sqlite:` url and applies migrations.
    pub async fn connect(url: &str) -> FaasboxResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        Self::connect_with(options).await
    }

    async fn connect_with(options: SqliteConnectOptions) -> FaasboxResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        FUNCTIONS_DB_MIGRATOR
            .run(&pool)
            .await
            .map_err(sqlx::Error::from)?;

        tracing::info!("function store ready");
        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl FunctionStore for SqliteFunctionStore {
    async fn put(
        &self,
        path: &str,
        code: &str,
        language: Language,
    ) -> FaasboxResult<FunctionRecord> {
        let path = normalize_path(path)?;
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT language, latest FROM functions WHERE path = ?")
            .bind(&path)
            .fetch_optional(&mut *tx)
            .await?;

        let latest = match existing {
            Some(row) => {
                let existing: Language = row.get::<String, _>("language").parse()?;
                if existing != language {
                    return Err(FaasboxError::LanguageConflict {
                        path,
                        existing,
                        requested: language,
                    });
                }
                Some(row.get::<i64, _>("latest"))
            }
            None => None,
        };

        let version = next_version(latest);

        sqlx::query(
            r#"
            INSERT INTO functions (path, language, latest) VALUES (?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET latest = excluded.latest, modified_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&path)
        .bind(language.as_str())
        .bind(version)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO function_versions (path, version, code) VALUES (?, ?, ?)")
            .bind(&path)
            .bind(version)
            .bind(code)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!("stored {} version {}", path, version);

        Ok(FunctionRecord::new(path, language, version, code.to_string()))
    }

    async fn get(&self, path: &str, version: Option<i64>) -> FaasboxResult<FunctionRecord> {
        let path = normalize_path(path)?;

        let meta = sqlx::query("SELECT language, latest FROM functions WHERE path = ?")
            .bind(&path)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| FaasboxError::StoreNotFound(format!("script not found: {}", path)))?;

        let language: Language = meta.get::<String, _>("language").parse()?;
        let version = requested_version(version).unwrap_or_else(|| meta.get::<i64, _>("latest"));

        let code: String =
            sqlx::query("SELECT code FROM function_versions WHERE path = ? AND version = ?")
                .bind(&path)
                .bind(version)
                .fetch_optional(&self.pool)
                .await?
                .map(|row| row.get("code"))
                .ok_or_else(|| {
                    FaasboxError::StoreNotFound(format!("version {} of {} not found", version, path))
                })?;

        Ok(FunctionRecord::new(path, language, version, code))
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_upload_twice_and_fetch() -> FaasboxResult<()> {
        let dir = tempfile::tempdir()?;
        let store = SqliteFunctionStore::open(&dir.path().join("db").join("functions.db")).await?;

        let first = store.put("/f", "return 1", Language::Python).await?;
        let second = store.put("/f", "return 2", Language::Python).await?;
        assert!(second.get_version() > first.get_version());

        assert_eq!(store.get("/f", None).await?.get_code(), "return 2");
        assert_eq!(
            store.get("/f", Some(*first.get_version())).await?.get_code(),
            "return 1"
        );
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_persists_across_reopen() -> FaasboxResult<()> {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("functions.db");

        let stored = {
            let store = SqliteFunctionStore::open(&db_path).await?;
            store.put("hello", "console.log(1)", Language::JavaScript).await?
        };

        let store = SqliteFunctionStore::open(&db_path).await?;
        let fetched = store.get("/hello", None).await?;
        assert_eq!(fetched, stored);
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_conflict_and_not_found() -> FaasboxResult<()> {
        let dir = tempfile::tempdir()?;
        let url = format!("sqlite://{}", dir.path().join("functions.db").display());
        let store = SqliteFunctionStore::connect(&url).await?;
        store.put("/f", "x", Language::Python).await?;

        assert!(matches!(
            store.put("/f", "x", Language::JavaScript).await,
            Err(FaasboxError::LanguageConflict { .. })
        ));
        assert!(matches!(
            store.get("/g", None).await,
            Err(FaasboxError::StoreNotFound(_))
        ));
        assert!(matches!(
            store.get("/f", Some(1)).await,
            Err(FaasboxError::StoreNotFound(_))
        ));
        Ok(())
    }
}
