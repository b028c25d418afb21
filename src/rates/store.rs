use super::RateTable;
use crate::utils;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// The local, persistent cache of rate tables.
#[async_trait::async_trait]
pub trait RateStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<RateTable>>;
    async fn put(&self, table: &RateTable) -> anyhow::Result<()>;
}

/// Keeps each table in its own `{key}.json` file inside a directory.
#[derive(Debug, Clone)]
pub struct JsonRateStore {
    dir: PathBuf,
}

impl JsonRateStore {
    /// Uses `dir`, creating it if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        utils::make_dir(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait::async_trait]
impl RateStore for JsonRateStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<RateTable>> {
        let path = self.path(key);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        Ok(Some(utils::deserialize(&path).await?))
    }

    async fn put(&self, table: &RateTable) -> anyhow::Result<()> {
        utils::serialize(&self.path(&table.key), table).await
    }
}

/// Keeps tables in memory only.
#[derive(Debug, Default)]
pub struct MemoryRateStore {
    tables: Mutex<HashMap<String, RateTable>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RateStore for MemoryRateStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<RateTable>> {
        Ok(self
            .tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn put(&self, table: &RateTable) -> anyhow::Result<()> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table.key.clone(), table.clone());
        Ok(())
    }
}
