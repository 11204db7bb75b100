use crate::application_port::{AuthError, UserService};
use crate::domain_model::{Account, UserId};
use crate::domain_port::{AccountRepo, TxManager};
use std::sync::Arc;

pub struct RealUserService {
    accounts: Arc<dyn AccountRepo>,
    tx_manager: Arc<dyn TxManager>,
}

impl RealUserService {
    pub fn new(accounts: Arc<dyn AccountRepo>, tx_manager: Arc<dyn TxManager>) -> RealUserService {
        RealUserService {
            accounts,
            tx_manager,
        }
    }
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    async fn resolve_username(&self, username: &str) -> Result<UserId, AuthError> {
        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        let account = self
            .accounts
            .get_by_username_in_tx(&mut *tx, username)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        tx.commit()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(account.id)
    }

    async fn get_account(&self, user_id: UserId) -> Result<Account, AuthError> {
        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        let account = self
            .accounts
            .get_in_tx(&mut *tx, user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        tx.commit()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(account)
    }
}
