use crate::application_port::RelationError;
use crate::domain_model::*;
use crate::domain_port::{FriendRequestRepo, FriendshipRepo, StorageTx};
use std::sync::Arc;

/// Accepted friendships, kept as two directed rows per pair. Every method
/// works inside the caller's transaction.
#[derive(Clone)]
pub struct FriendshipLedger {
    friendships: Arc<dyn FriendshipRepo>,
    requests: Arc<dyn FriendRequestRepo>,
}

impl FriendshipLedger {
    pub fn new(friendships: Arc<dyn FriendshipRepo>, requests: Arc<dyn FriendRequestRepo>) -> Self {
        Self {
            friendships,
            requests,
        }
    }

    /// Inserts `(a, b)` and `(b, a)`. There is no duplicate check: callers
    /// must have ruled out an existing friendship under the pair lock.
    pub async fn create_pair(
        &self,
        tx: &mut dyn StorageTx<'_>,
        a: UserId,
        b: UserId,
    ) -> Result<(), RelationError> {
        self.friendships
            .insert_in_tx(&mut *tx, FriendshipId::new(), a, b)
            .await?;
        self.friendships
            .insert_in_tx(&mut *tx, FriendshipId::new(), b, a)
            .await?;
        Ok(())
    }

    /// Turns each request into a friendship pair and deletes the request.
    pub async fn create_all_pairs(
        &self,
        tx: &mut dyn StorageTx<'_>,
        requests: &[FriendRequest],
    ) -> Result<u64, RelationError> {
        let mut accepted = 0;
        for request in requests {
            self.create_pair(&mut *tx, request.from.id, request.to.id)
                .await?;
            accepted += self
                .requests
                .delete_in_tx(
                    &mut *tx,
                    RequestFilter::pair(request.from.id, request.to.id),
                )
                .await?;
        }
        Ok(accepted)
    }

    /// Deletes both directions; absent rows are not an error.
    pub async fn remove_pair(
        &self,
        tx: &mut dyn StorageTx<'_>,
        a: UserId,
        b: UserId,
    ) -> Result<u64, RelationError> {
        let forward = self
            .friendships
            .delete_in_tx(&mut *tx, RequestFilter::pair(a, b))
            .await?;
        let backward = self
            .friendships
            .delete_in_tx(&mut *tx, RequestFilter::pair(b, a))
            .await?;
        Ok(forward + backward)
    }

    pub async fn remove_all_for(
        &self,
        tx: &mut dyn StorageTx<'_>,
        user_id: UserId,
    ) -> Result<u64, RelationError> {
        let outgoing = self
            .friendships
            .delete_in_tx(&mut *tx, RequestFilter::from_user(user_id))
            .await?;
        let incoming = self
            .friendships
            .delete_in_tx(&mut *tx, RequestFilter::to_user(user_id))
            .await?;
        Ok(outgoing + incoming)
    }

    /// Looks at `(a, b)` only; pairs are always written together.
    pub async fn are_friends(
        &self,
        tx: &mut dyn StorageTx<'_>,
        a: UserId,
        b: UserId,
    ) -> Result<bool, RelationError> {
        self.friendships.exists_in_tx(tx, a, b).await
    }

    pub async fn list_friends_of(
        &self,
        tx: &mut dyn StorageTx<'_>,
        user_id: UserId,
    ) -> Result<Vec<Account>, RelationError> {
        self.friendships.list_friends_of_in_tx(tx, user_id).await
    }

    pub async fn filter(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<Vec<Friendship>, RelationError> {
        self.friendships.find_in_tx(tx, filter).await
    }
}
