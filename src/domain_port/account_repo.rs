use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;

#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub account: Account,
    pub password_hash: String,
}

#[async_trait::async_trait]
pub trait AccountRepo: Send + Sync {
    /// Fails with `DuplicateUsername` when the username is taken.
    async fn create_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        username: &str,
        password_hash: &str,
    ) -> Result<Account, AuthError>;

    async fn get_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
    ) -> Result<Option<Account>, AuthError>;

    async fn get_by_username_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        username: &str,
    ) -> Result<Option<Account>, AuthError>;

    /// Fetch credentials by username (for login).
    async fn get_credentials_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        username: &str,
    ) -> Result<Option<AccountCredentials>, AuthError>;

    /// Locks both account rows, `min` first, until the transaction ends.
    /// Returns how many of the two accounts exist.
    async fn lock_pair_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        pair: UserPair,
    ) -> Result<u64, AuthError>;

    /// Locks every listed account row in ascending id order, the same order
    /// `lock_pair_in_tx` uses. Duplicates are ignored. Returns how many of
    /// the distinct accounts exist.
    async fn lock_accounts_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_ids: &[UserId],
    ) -> Result<u64, AuthError>;
}
