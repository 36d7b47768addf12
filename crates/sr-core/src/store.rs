//! Tabular store port and the shared handle that serializes access to it.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{domain::Record, Result};

/// Hexagonal port for the append-only record store (a spreadsheet).
///
/// Implementations return data rows only (no header) in sheet order. Errors
/// reaching the store should be reported as `Error::StoreUnavailable`.
#[async_trait]
pub trait TabularStore: Send {
    async fn read_all(&mut self) -> Result<Vec<Record>>;

    async fn append(&mut self, record: &Record) -> Result<()>;

    /// Re-establish the connection (fresh credentials, re-resolved sheet).
    async fn reconnect(&mut self) -> Result<()>;
}

/// Single owner of the store client.
///
/// The command path and the poller share one client; every call goes through
/// this lock and the lock is released as soon as the call returns.
pub struct StoreHandle {
    inner: Mutex<Box<dyn TabularStore>>,
}

impl StoreHandle {
    pub fn new(store: impl TabularStore + 'static) -> Self {
        Self {
            inner: Mutex::new(Box::new(store)),
        }
    }

    pub async fn read_all(&self) -> Result<Vec<Record>> {
        self.inner.lock().await.read_all().await
    }

    pub async fn append(&self, record: &Record) -> Result<()> {
        self.inner.lock().await.append(record).await
    }

    pub async fn reconnect(&self) -> Result<()> {
        self.inner.lock().await.reconnect().await
    }

    /// Most recent `n` records, oldest first.
    pub async fn recent(&self, n: usize) -> Result<Vec<Record>> {
        let mut rows = self.read_all().await?;
        let start = rows.len().saturating_sub(n);
        Ok(rows.split_off(start))
    }

    /// Records matching `query` (case-insensitive), newest first, at most `limit`.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Record>> {
        let needle = query.trim().to_lowercase();
        let rows = self.read_all().await?;
        Ok(rows
            .into_iter()
            .rev()
            .filter(|r| r.matches(&needle))
            .take(limit)
            .collect())
    }
}
