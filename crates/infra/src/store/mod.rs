//! Transactional table store.
//!
//! All relational state lives in [`Tables`], a set of persistent `im::OrdMap`s keyed by
//! typed ids. Writers run a closure against a copy-on-write snapshot ([`Tx`]); the
//! snapshot only replaces the live state after the [`Journal`] has durably committed
//! every row the closure touched. A closure error, or a journal error, leaves the live
//! state exactly as it was.
//!
//! Writers are serialised by the store's lock, so a status check made inside a write
//! closure cannot race another writer.

mod journal;
mod postgres;
mod tables;

use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

pub use journal::{Journal, MemoryJournal};
pub use postgres::PostgresJournal;
pub use tables::{Record, Tables};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A row could not be converted to or from JSON.
    #[error("serialization failed for {table}: {message}")]
    Serialize { table: &'static str, message: String },

    /// The journal refused or failed the commit.
    #[error("journal failure: {0}")]
    Journal(String),

    /// A persisted row could not be restored.
    #[error("corrupt journal row: {0}")]
    Corrupt(String),
}

/// One persisted row change. `body: None` deletes the row.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub table: &'static str,
    pub id: Uuid,
    pub body: Option<JsonValue>,
}

/// A persisted row as loaded back from a journal.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub table: String,
    pub id: Uuid,
    pub body: JsonValue,
}

/// Write transaction over a private snapshot of the tables.
pub struct Tx {
    tables: Tables,
    changes: Vec<Change>,
}

impl Tx {
    fn new(tables: Tables) -> Self {
        Self {
            tables,
            changes: Vec::new(),
        }
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn get<R: Record>(&self, id: R::Id) -> Option<&R> {
        R::table(&self.tables).get(&id)
    }

    /// Insert or replace a row.
    pub fn put<R: Record>(&mut self, row: R) -> Result<(), StoreError> {
        let body = serde_json::to_value(&row).map_err(|e| StoreError::Serialize {
            table: R::TABLE,
            message: e.to_string(),
        })?;
        let id = row.id();
        self.changes.push(Change {
            table: R::TABLE,
            id: id.into(),
            body: Some(body),
        });
        R::table_mut(&mut self.tables).insert(id, row);
        Ok(())
    }

    pub fn delete<R: Record>(&mut self, id: R::Id) -> Option<R> {
        let removed = R::table_mut(&mut self.tables).remove(&id);
        if removed.is_some() {
            self.changes.push(Change {
                table: R::TABLE,
                id: id.into(),
                body: None,
            });
        }
        removed
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }
}

/// Shared handle to the live tables and their journal.
#[derive(Clone)]
pub struct Store {
    live: Arc<RwLock<Tables>>,
    journal: Arc<dyn Journal>,
}

impl Store {
    /// Open a store, restoring every row the journal holds.
    pub async fn open(journal: Arc<dyn Journal>) -> Result<Self, StoreError> {
        let rows = journal.load().await?;
        let count = rows.len();
        let tables = Tables::restore(rows)?;
        debug!(rows = count, "store restored from journal");
        Ok(Self {
            live: Arc::new(RwLock::new(tables)),
            journal,
        })
    }

    /// In-memory store with no durability.
    pub fn in_memory() -> Self {
        Self {
            live: Arc::new(RwLock::new(Tables::default())),
            journal: Arc::new(MemoryJournal::default()),
        }
    }

    /// Cheap structural clone of the current state.
    pub async fn snapshot(&self) -> Tables {
        self.live.read().await.clone()
    }

    pub async fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let guard = self.live.read().await;
        f(&guard)
    }

    /// Run `f` as one all-or-nothing write.
    pub async fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Tx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut live = self.live.write().await;
        let mut tx = Tx::new(live.clone());
        let out = f(&mut tx)?;

        let Tx { tables, changes } = tx;
        if !changes.is_empty() {
            self.journal.commit(&changes).await?;
        }
        *live = tables;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kopontren_core::{DomainError, Entity};
    use kopontren_suppliers::{Supplier, SupplierInput};

    #[derive(Debug)]
    enum TestError {
        Domain,
        Store,
    }

    impl From<StoreError> for TestError {
        fn from(_: StoreError) -> Self {
            TestError::Store
        }
    }

    impl From<DomainError> for TestError {
        fn from(_: DomainError) -> Self {
            TestError::Domain
        }
    }

    fn supplier(name: &str) -> Supplier {
        Supplier::create(
            SupplierInput {
                name: name.into(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn committed_writes_are_visible_and_journaled() {
        let journal = Arc::new(MemoryJournal::default());
        let store = Store::open(journal.clone()).await.unwrap();
        let s = supplier("TB Abadi");
        let id = s.id();

        store
            .write(|tx| -> Result<(), TestError> {
                tx.put(s.clone())?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(store.read(|t| t.suppliers.contains_key(&id)).await);
        assert_eq!(journal.row_count(), 1);

        let reopened = Store::open(journal).await.unwrap();
        let restored = reopened.read(|t| t.suppliers.get(&id).cloned()).await;
        assert_eq!(restored, Some(s));
    }

    #[tokio::test]
    async fn failed_closure_discards_every_change() {
        let store = Store::in_memory();
        let result = store
            .write(|tx| -> Result<(), TestError> {
                tx.put(supplier("TB Abadi"))?;
                tx.put(supplier("CV Bangun"))?;
                Err(DomainError::validation("boom").into())
            })
            .await;

        assert!(matches!(result, Err(TestError::Domain)));
        assert!(store.read(|t| t.suppliers.is_empty()).await);
    }

    #[tokio::test]
    async fn delete_is_journaled_as_tombstone() {
        let journal = Arc::new(MemoryJournal::default());
        let store = Store::open(journal.clone()).await.unwrap();
        let s = supplier("TB Abadi");
        let id = s.id();
        store
            .write(|tx| -> Result<(), TestError> { Ok(tx.put(s)?) })
            .await
            .unwrap();
        store
            .write(|tx| -> Result<(), TestError> {
                assert!(tx.delete::<Supplier>(id).is_some());
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(journal.row_count(), 0);
    }
}
