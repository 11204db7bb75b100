use crate::application_port::*;
use crate::domain_model::*;

/// Live refresh-token ids. A refresh token is only honored while its `jti`
/// is present here.
#[async_trait::async_trait]
pub trait AuthSessionStore: Send + Sync {
    async fn save_refresh_jti(
        &self,
        user_id: UserId,
        jti: &str,
        ttl_secs: u64,
    ) -> Result<(), AuthError>;

    /// Removes the `jti` and returns its owner, or `None` if it was unknown
    /// or already expired.
    async fn consume_refresh_jti(&self, jti: &str) -> Result<Option<UserId>, AuthError>;
}
