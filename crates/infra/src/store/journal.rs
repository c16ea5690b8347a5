use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::{Change, StoreError, StoredRow};

/// Durable log of row changes behind a [`super::Store`].
#[async_trait]
pub trait Journal: Send + Sync {
    /// Every live row, used to rebuild the tables at startup.
    async fn load(&self) -> Result<Vec<StoredRow>, StoreError>;

    /// Persist `changes` atomically: all of them or none.
    async fn commit(&self, changes: &[Change]) -> Result<(), StoreError>;
}

/// Journal that keeps rows in process memory only.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    rows: Mutex<BTreeMap<(String, Uuid), JsonValue>>,
}

impl MemoryJournal {
    pub fn row_count(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Journal for MemoryJournal {
    async fn load(&self) -> Result<Vec<StoredRow>, StoreError> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| StoreError::Journal("memory journal poisoned".into()))?;
        Ok(rows
            .iter()
            .map(|((table, id), body)| StoredRow {
                table: table.clone(),
                id: *id,
                body: body.clone(),
            })
            .collect())
    }

    async fn commit(&self, changes: &[Change]) -> Result<(), StoreError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| StoreError::Journal("memory journal poisoned".into()))?;
        for change in changes {
            let key = (change.table.to_string(), change.id);
            match &change.body {
                Some(body) => {
                    rows.insert(key, body.clone());
                }
                None => {
                    rows.remove(&key);
                }
            }
        }
        Ok(())
    }
}
