use super::repo_tx_memory::AccountRow;
use super::util::downcast;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;

#[derive(Debug, Default)]
pub struct MemoryAccountRepo;

impl MemoryAccountRepo {
    pub fn new() -> Self {
        MemoryAccountRepo
    }
}

#[async_trait::async_trait]
impl AccountRepo for MemoryAccountRepo {
    async fn create_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        username: &str,
        password_hash: &str,
    ) -> Result<Account, AuthError> {
        let state = downcast(tx).state();

        if state
            .accounts
            .iter()
            .any(|row| row.account.username == username)
        {
            return Err(AuthError::DuplicateUsername);
        }

        let account = Account {
            id: user_id,
            username: username.to_owned(),
            created_at: Utc::now(),
        };
        state.accounts.push(AccountRow {
            account: account.clone(),
            password_hash: password_hash.to_owned(),
        });

        Ok(account)
    }

    async fn get_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
    ) -> Result<Option<Account>, AuthError> {
        Ok(downcast(tx).state().account(user_id).cloned())
    }

    async fn get_by_username_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        username: &str,
    ) -> Result<Option<Account>, AuthError> {
        Ok(downcast(tx)
            .state()
            .accounts
            .iter()
            .find(|row| row.account.username == username)
            .map(|row| row.account.clone()))
    }

    async fn get_credentials_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        username: &str,
    ) -> Result<Option<AccountCredentials>, AuthError> {
        Ok(downcast(tx)
            .state()
            .accounts
            .iter()
            .find(|row| row.account.username == username)
            .map(|row| AccountCredentials {
                account: row.account.clone(),
                password_hash: row.password_hash.clone(),
            }))
    }

    async fn lock_pair_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        pair: UserPair,
    ) -> Result<u64, AuthError> {
        // the transaction already holds the whole store
        let state = downcast(tx).state();
        let mut found = 0;
        if state.account(pair.min()).is_some() {
            found += 1;
        }
        if !pair.is_same() && state.account(pair.max()).is_some() {
            found += 1;
        }
        Ok(found)
    }

    async fn lock_accounts_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_ids: &[UserId],
    ) -> Result<u64, AuthError> {
        let state = downcast(tx).state();
        let mut user_ids = user_ids.to_vec();
        user_ids.sort();
        user_ids.dedup();

        Ok(user_ids
            .into_iter()
            .filter(|user_id| state.account(*user_id).is_some())
            .count() as u64)
    }
}
