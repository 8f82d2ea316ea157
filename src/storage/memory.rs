//! In-memory decision log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use crate::domain::OpportunityRecord;
use crate::storage::{OpportunityLog, StorageError};

/// MemoryLog keeps every record for the life of the process.
#[derive(Default)]
pub struct MemoryLog {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    rows: Vec<OpportunityRecord>,
    ids: HashSet<String>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OpportunityLog for MemoryLog {
    async fn append(&self, records: &[OpportunityRecord]) -> Result<usize, StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let mut written = 0;
        for record in records {
            if inner.ids.insert(record.id.clone()) {
                inner.rows.push(record.clone());
                written += 1;
            }
        }
        Ok(written)
    }

    async fn history(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<OpportunityRecord>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let mut rows: Vec<OpportunityRecord> = inner
            .rows
            .iter()
            .filter(|r| since.is_none_or(|s| r.timestamp >= s))
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.timestamp);
        Ok(rows)
    }

    async fn record_outcome(
        &self,
        id: &str,
        realized_net_percent: Decimal,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let row = inner
            .rows
            .iter_mut()
            .find(|r| r.id == id && r.is_emitted())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        row.realized_net_percent = Some(realized_net_percent);
        Ok(())
    }

    async fn count(&self) -> Result<i64, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.rows.len() as i64)
    }

    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
