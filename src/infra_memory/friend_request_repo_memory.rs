use super::repo_tx_memory::{MemoryState, RequestRow};
use super::util::downcast;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;

#[derive(Debug, Default)]
pub struct MemoryFriendRequestRepo;

impl MemoryFriendRequestRepo {
    pub fn new() -> Self {
        MemoryFriendRequestRepo
    }

    fn to_request(state: &MemoryState, row: &RequestRow) -> Result<FriendRequest, RelationError> {
        // rows never outlive their accounts
        let from = state.account(row.from).ok_or_else(|| {
            RelationError::Store(format!("dangling friend request sender {}", row.from))
        })?;
        let to = state.account(row.to).ok_or_else(|| {
            RelationError::Store(format!("dangling friend request receiver {}", row.to))
        })?;

        Ok(FriendRequest {
            id: row.id,
            from: from.clone(),
            to: to.clone(),
            created_at: row.created_at,
        })
    }
}

#[async_trait::async_trait]
impl FriendRequestRepo for MemoryFriendRequestRepo {
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        id: RequestId,
        from: UserId,
        to: UserId,
    ) -> Result<(), RelationError> {
        let state = downcast(tx).state();

        if state
            .requests
            .iter()
            .any(|row| row.from == from && row.to == to)
        {
            return Err(RelationError::DuplicateRequest);
        }

        state.requests.push(RequestRow {
            id,
            from,
            to,
            created_at: Utc::now(),
        });

        Ok(())
    }

    async fn find_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<Vec<FriendRequest>, RelationError> {
        let state = &*downcast(tx).state();

        state
            .requests
            .iter()
            .filter(|row| filter.matches(row.from, row.to))
            .map(|row| Self::to_request(state, row))
            .collect()
    }

    async fn find_for_update_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<Vec<FriendRequest>, RelationError> {
        // the transaction already sees the latest state
        self.find_in_tx(tx, filter).await
    }

    async fn exists_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        from: UserId,
        to: UserId,
    ) -> Result<bool, RelationError> {
        Ok(downcast(tx)
            .state()
            .requests
            .iter()
            .any(|row| row.from == from && row.to == to))
    }

    async fn delete_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<u64, RelationError> {
        let requests = &mut downcast(tx).state().requests;

        let before = requests.len();
        requests.retain(|row| !filter.matches(row.from, row.to));

        Ok((before - requests.len()) as u64)
    }
}
