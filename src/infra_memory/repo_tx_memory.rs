use crate::domain_model::*;
use crate::domain_port::{StorageTx, TxManager};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone)]
pub struct AccountRow {
    pub account: Account,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct RequestRow {
    pub id: RequestId,
    pub from: UserId,
    pub to: UserId,
    pub created_at: DateTime<Utc>,
}

/// The three tables, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub accounts: Vec<AccountRow>,
    pub requests: Vec<RequestRow>,
    pub friendships: Vec<Friendship>,
}

impl MemoryState {
    pub fn account(&self, user_id: UserId) -> Option<&Account> {
        self.accounts
            .iter()
            .map(|row| &row.account)
            .find(|account| account.id == user_id)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryTxManager {
    store: MemoryStore,
}

impl MemoryTxManager {
    pub fn new(store: MemoryStore) -> Self {
        MemoryTxManager { store }
    }
}

#[async_trait::async_trait]
impl TxManager for MemoryTxManager {
    async fn begin<'t>(&'t self) -> anyhow::Result<Box<dyn StorageTx<'t> + 't>> {
        let guard = self.store.state.clone().lock_owned().await;
        Ok(Box::new(MemoryTx::new(guard)))
    }
}

/// Holds the store lock for its whole lifetime. The state as of `begin` is
/// kept aside and put back unless the transaction commits.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    snapshot: Option<MemoryState>,
}

impl MemoryTx {
    fn new(guard: OwnedMutexGuard<MemoryState>) -> Self {
        let snapshot = Some(guard.clone());
        MemoryTx { guard, snapshot }
    }

    pub fn state(&mut self) -> &mut MemoryState {
        &mut self.guard
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait::async_trait]
impl<'t> StorageTx<'t> for MemoryTx {
    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        let mut this = self;
        this.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        drop(self);
        Ok(())
    }
}
