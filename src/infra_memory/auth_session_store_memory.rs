use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct MemoryAuthSessionStore {
    sessions: DashMap<String, (UserId, DateTime<Utc>)>,
}

impl MemoryAuthSessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl AuthSessionStore for MemoryAuthSessionStore {
    async fn save_refresh_jti(
        &self,
        user_id: UserId,
        jti: &str,
        ttl_secs: u64,
    ) -> Result<(), AuthError> {
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        let now = Utc::now();
        let expire_at = now
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        // expired entries are only dropped lazily, so sweep on write
        self.sessions.retain(|_, (_, until)| *until > now);

        self.sessions.insert(jti.to_owned(), (user_id, expire_at));
        Ok(())
    }

    async fn consume_refresh_jti(&self, jti: &str) -> Result<Option<UserId>, AuthError> {
        Ok(self
            .sessions
            .remove(jti)
            .filter(|(_, (_, until))| *until > Utc::now())
            .map(|(_, (user_id, _))| user_id))
    }
}
