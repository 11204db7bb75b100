use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;

#[async_trait::async_trait]
pub trait FriendRequestRepo: Send + Sync {
    /// Fails with `DuplicateRequest` if `(from, to)` is already pending.
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        id: RequestId,
        from: UserId,
        to: UserId,
    ) -> Result<(), RelationError>;

    /// Matching requests, oldest first.
    async fn find_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<Vec<FriendRequest>, RelationError>;

    /// Like `find_in_tx`, but a locking read: it sees the latest committed
    /// rows rather than the transaction's snapshot, and holds the matched
    /// rows until the transaction ends.
    async fn find_for_update_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<Vec<FriendRequest>, RelationError>;

    async fn exists_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        from: UserId,
        to: UserId,
    ) -> Result<bool, RelationError>;

    /// Returns the number of deleted rows.
    async fn delete_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<u64, RelationError>;
}
