use crate::application_port::AuthError;
use crate::domain_model::{Account, UserId};

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn resolve_username(&self, username: &str) -> Result<UserId, AuthError>;
    async fn get_account(&self, user_id: UserId) -> Result<Account, AuthError>;
}
