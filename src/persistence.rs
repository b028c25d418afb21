//! Durable storage for the store's entities.
//!
//! A `PersistenceHook` subscribes to a `Store` and forwards every change to a `Storage` from a
//! background task, in the order the changes happened.

use crate::error::Result;
use crate::model::{Entity, Snapshot};
use crate::store::{Change, Store, SubscriptionId};
use crate::utils;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

/// Bulk load and per-entity save against some durable store.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    async fn load_all(&self) -> anyhow::Result<Snapshot>;
    async fn put(&self, entity: Entity) -> anyhow::Result<()>;
    async fn clear_all(&self) -> anyhow::Result<()>;
}

/// Inserts `entity` into `snapshot`, replacing an entity of the same kind and id.
fn upsert(snapshot: &mut Snapshot, entity: Entity) {
    fn replace<T>(items: &mut Vec<T>, item: T, id: impl Fn(&T) -> &str) {
        match items.iter().position(|x| id(x) == id(&item)) {
            Some(ix) => items[ix] = item,
            None => items.push(item),
        }
    }
    match entity {
        Entity::Account(a) => replace(&mut snapshot.accounts, a, |x| &x.id),
        Entity::Category(c) => replace(&mut snapshot.categories, c, |x| &x.id),
        Entity::Operation(o) => replace(&mut snapshot.operations, o, |x| x.id()),
        Entity::Watch(w) => replace(&mut snapshot.watches, w, |x| &x.id),
    }
}

/// Keeps the whole snapshot in one JSON file, rewritten on every change.
#[derive(Debug)]
pub struct JsonStorage {
    path: PathBuf,
    snapshot: tokio::sync::Mutex<Snapshot>,
}

impl JsonStorage {
    /// Opens the file at `path`. A missing file is an empty snapshot.
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let exists = tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("Unable to check for {}", path.display()))?;
        let snapshot = if exists {
            utils::deserialize(&path).await?
        } else {
            debug!("No data file at {}, starting empty", path.display());
            Snapshot::default()
        };
        Ok(Self {
            path,
            snapshot: tokio::sync::Mutex::new(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn load_all(&self) -> anyhow::Result<Snapshot> {
        Ok(self.snapshot.lock().await.clone())
    }

    async fn put(&self, entity: Entity) -> anyhow::Result<()> {
        let mut snapshot = self.snapshot.lock().await;
        upsert(&mut snapshot, entity);
        utils::serialize(&self.path, &*snapshot).await
    }

    async fn clear_all(&self) -> anyhow::Result<()> {
        let mut snapshot = self.snapshot.lock().await;
        *snapshot = Snapshot::default();
        utils::serialize(&self.path, &*snapshot).await
    }
}

/// Keeps the snapshot in memory only.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    snapshot: std::sync::Mutex<Snapshot>,
}

impl MemoryStorage {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: std::sync::Mutex::new(snapshot),
        }
    }

    fn snapshot(&self) -> std::sync::MutexGuard<'_, Snapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn load_all(&self) -> anyhow::Result<Snapshot> {
        Ok(self.snapshot().clone())
    }

    async fn put(&self, entity: Entity) -> anyhow::Result<()> {
        upsert(&mut self.snapshot(), entity);
        Ok(())
    }

    async fn clear_all(&self) -> anyhow::Result<()> {
        *self.snapshot() = Snapshot::default();
        Ok(())
    }
}

/// Creates a store initialized from everything in `storage`.
pub async fn load_store(storage: &dyn Storage) -> Result<Store> {
    let snapshot = storage.load_all().await?;
    let mut store = Store::new();
    store.init(snapshot);
    Ok(store)
}

/// Writes store changes to a `Storage`. Must be attached from within a tokio runtime.
#[derive(Debug)]
pub struct PersistenceHook {
    subscription: SubscriptionId,
    task: JoinHandle<()>,
}

impl PersistenceHook {
    pub fn attach(store: &mut Store, storage: Arc<dyn Storage>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Change>();
        let subscription = store.subscribe(move |change| {
            if tx.send(change.clone()).is_err() {
                error!("Persistence task has stopped, dropping {change:?}");
            }
        });

        let task = tokio::spawn(async move {
            while let Some(change) = rx.recv().await {
                trace!("Persisting {change:?}");
                let result = match change {
                    Change::Put(entity) => storage.put(entity).await,
                    Change::Cleared => storage.clear_all().await,
                };
                if let Err(e) = result {
                    error!("Unable to persist change: {e:#}");
                }
            }
            debug!("Persistence task finished");
        });

        Self { subscription, task }
    }

    /// Stops listening to `store` and waits until every change seen so far has been written.
    pub async fn detach(self, store: &mut Store) -> Result<()> {
        store.unsubscribe(self.subscription);
        self.task.await.context("Persistence task failed")?;
        Ok(())
    }
}
