use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;

/// Stores directed friendship rows. Pairing is the ledger's job; the repo
/// never inserts or deletes the reverse row on its own.
#[async_trait::async_trait]
pub trait FriendshipRepo: Send + Sync {
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        id: FriendshipId,
        from: UserId,
        to: UserId,
    ) -> Result<(), RelationError>;

    async fn exists_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        from: UserId,
        to: UserId,
    ) -> Result<bool, RelationError>;

    async fn find_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<Vec<Friendship>, RelationError>;

    async fn delete_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<u64, RelationError>;

    /// Accounts `x` with a row `(x, user_id)`, ordered by username.
    async fn list_friends_of_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        user_id: UserId,
    ) -> Result<Vec<Account>, RelationError>;
}
