//! In-memory data store
//!
//! The `DataStore` holds the five collections that answer every query and
//! mirrors each of them to a key-value store:
//! - in memory: source of truth for reads
//! - key-value store: durable copy, read only by `initialize()`
//!
//! ## Mutations
//!
//! Every mutation runs against a staged copy of the collections. Changed
//! collections are written to the key-value store, and only once all writes
//! succeed is the staged copy swapped in. A failed write leaves memory as it
//! was and rewrites any key already touched by that mutation with its old
//! value.
//!
//! ## Usage
//!
//! ```ignore
//! let store = DataStore::new(Arc::new(FileStore::new(dir)), StorageKeys::default());
//! store.initialize().await;
//!
//! let count = store.read(|c| c.expenses.len()).await;
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{Error, Operation, Result};
use crate::models::{Category, Expense, QuickExpense, Session, User};
use crate::storage::{Collection, KeyValueStore, StorageError, StorageKeys, StorageResult};

/// The five collections held in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collections {
    pub users: Vec<User>,
    pub session: Option<Session>,
    pub expenses: Vec<Expense>,
    pub categories: Vec<Category>,
    pub quick_expenses: Vec<QuickExpense>,
}

impl Collections {
    fn differs(&self, other: &Collections, collection: Collection) -> bool {
        match collection {
            Collection::Users => self.users != other.users,
            Collection::Session => self.session != other.session,
            Collection::Expenses => self.expenses != other.expenses,
            Collection::Categories => self.categories != other.categories,
            Collection::QuickExpenses => self.quick_expenses != other.quick_expenses,
        }
    }

    /// Serialized form of one collection; `None` means "remove the key"
    fn encode(&self, collection: Collection, key: &str) -> StorageResult<Option<String>> {
        let encoded = match collection {
            Collection::Users => to_json(key, &self.users)?,
            Collection::Session => match &self.session {
                Some(session) => to_json(key, session)?,
                None => return Ok(None),
            },
            Collection::Expenses => to_json(key, &self.expenses)?,
            Collection::Categories => to_json(key, &self.categories)?,
            Collection::QuickExpenses => to_json(key, &self.quick_expenses)?,
        };
        Ok(Some(encoded))
    }

    fn decode(&mut self, collection: Collection, key: &str, raw: &str) -> StorageResult<()> {
        match collection {
            Collection::Users => self.users = from_json(key, raw)?,
            Collection::Session => self.session = from_json(key, raw)?,
            Collection::Expenses => self.expenses = from_json(key, raw)?,
            Collection::Categories => self.categories = from_json(key, raw)?,
            Collection::QuickExpenses => self.quick_expenses = from_json(key, raw)?,
        }
        Ok(())
    }
}

fn to_json<T: Serialize + ?Sized>(key: &str, value: &T) -> StorageResult<String> {
    serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })
}

fn from_json<T: DeserializeOwned>(key: &str, raw: &str) -> StorageResult<T> {
    serde_json::from_str(raw).map_err(|source| StorageError::InvalidFormat {
        key: key.to_string(),
        source,
    })
}

/// A collection that could not be loaded at startup
#[derive(Debug)]
pub struct HydrationFailure {
    pub collection: Collection,
    pub error: StorageError,
}

/// Outcome of `DataStore::initialize`
#[derive(Debug, Default)]
pub struct HydrationReport {
    /// Collections read from storage
    pub loaded: Vec<Collection>,
    /// Collections left empty because reading or parsing failed
    pub failures: Vec<HydrationFailure>,
}

impl HydrationReport {
    /// True when nothing failed to load
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Process-wide collection cache mirrored to a key-value store
pub struct DataStore {
    kv: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
    state: RwLock<Collections>,
    /// Serializes stage-persist-commit cycles
    writes: Mutex<()>,
}

impl DataStore {
    /// Create an empty store. Call `initialize()` before serving requests.
    pub fn new(kv: Arc<dyn KeyValueStore>, keys: StorageKeys) -> Self {
        Self {
            kv,
            keys,
            state: RwLock::new(Collections::default()),
            writes: Mutex::new(()),
        }
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Load every collection from the key-value store
    ///
    /// Missing keys yield empty collections. A key that cannot be read or
    /// parsed is logged and left empty; loading carries on with the rest.
    /// Calling this again reloads from storage, replacing memory.
    pub async fn initialize(&self) -> HydrationReport {
        let _guard = self.writes.lock().await;
        let mut report = HydrationReport::default();
        let mut loaded = Collections::default();

        for collection in Collection::ALL {
            let key = self.keys.key(collection);
            match self.kv.get(&key).await {
                Ok(None) => debug!("No stored {} under {}", collection, key),
                Ok(Some(raw)) => match loaded.decode(collection, &key, &raw) {
                    Ok(()) => report.loaded.push(collection),
                    Err(error) => {
                        warn!("Ignoring unreadable {}: {}", collection, error);
                        report.failures.push(HydrationFailure { collection, error });
                    }
                },
                Err(error) => {
                    warn!("Failed to load {}: {}", collection, error);
                    report.failures.push(HydrationFailure { collection, error });
                }
            }
        }

        info!(
            "Data loaded: {} users, {} categories, {} expenses, {} quick expenses, session={}",
            loaded.users.len(),
            loaded.categories.len(),
            loaded.expenses.len(),
            loaded.quick_expenses.len(),
            loaded.session.is_some()
        );

        *self.state.write().await = loaded;
        report
    }

    /// Run a read-only closure against the collections
    pub async fn read<R>(&self, f: impl FnOnce(&Collections) -> R) -> R {
        let state = self.state.read().await;
        f(&state)
    }

    /// Copy of all collections
    pub async fn snapshot(&self) -> Collections {
        self.state.read().await.clone()
    }

    /// Apply a mutation, persist what it changed, then commit it
    ///
    /// If `f` returns an error nothing is written. If a write fails the
    /// in-memory state is left untouched and `Error::StorageWrite` is
    /// returned, tagged with `op`.
    pub async fn mutate<T>(
        &self,
        op: Operation,
        f: impl FnOnce(&mut Collections) -> Result<T>,
    ) -> Result<T> {
        let _guard = self.writes.lock().await;

        let current = self.state.read().await.clone();
        let mut staged = current.clone();
        let value = f(&mut staged)?;

        let changed: Vec<Collection> = Collection::ALL
            .into_iter()
            .filter(|c| staged.differs(&current, *c))
            .collect();

        let mut written = Vec::with_capacity(changed.len());
        for collection in changed {
            if let Err(source) = self.persist(&staged, collection).await {
                warn!("{} failed while writing {}: {}", op, collection, source);
                self.roll_back(&current, &written).await;
                return Err(Error::StorageWrite {
                    op,
                    collection,
                    source,
                });
            }
            written.push(collection);
        }

        *self.state.write().await = staged;
        Ok(value)
    }

    /// Rewrite the stored value of `collection` from memory
    ///
    /// Replaces a stored value that memory does not reflect, such as one
    /// that failed to hydrate. An absent session removes its key.
    pub async fn resync(&self, op: Operation, collection: Collection) -> Result<()> {
        let _guard = self.writes.lock().await;
        let current = self.state.read().await.clone();
        self.persist(&current, collection)
            .await
            .map_err(|source| Error::StorageWrite {
                op,
                collection,
                source,
            })
    }

    async fn persist(&self, state: &Collections, collection: Collection) -> StorageResult<()> {
        let key = self.keys.key(collection);
        match state.encode(collection, &key)? {
            Some(value) => {
                self.kv.set(&key, &value).await?;
                debug!("Saved {} ({} bytes)", key, value.len());
            }
            None => {
                self.kv.remove(&key).await?;
                debug!("Removed {}", key);
            }
        }
        Ok(())
    }

    /// Best-effort restore of keys already written by a failed mutation
    async fn roll_back(&self, previous: &Collections, written: &[Collection]) {
        for collection in written {
            if let Err(e) = self.persist(previous, *collection).await {
                warn!(
                    "Could not restore {} after failed write; storage may be ahead of memory: {}",
                    collection, e
                );
            }
        }
    }
}
