use super::util::{downcast, is_dup_key};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::mysql::MySqlRow;

#[derive(Debug, Default)]
pub struct MySqlAccountRepo;

impl MySqlAccountRepo {
    pub fn new() -> Self {
        MySqlAccountRepo
    }

    fn row_to_account(row: &MySqlRow) -> Result<Account, AuthError> {
        let id: UserId = row
            .try_get("id")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let username: String = row
            .try_get("username")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(Account {
            id,
            username,
            created_at,
        })
    }
}

#[async_trait::async_trait]
impl AccountRepo for MySqlAccountRepo {
    async fn create_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        username: &str,
        password_hash: &str,
    ) -> Result<Account, AuthError> {
        let tx = downcast(tx);
        let created_at = Utc::now();

        sqlx::query(
            r#"
INSERT INTO account (id, username, password_hash, created_at)
VALUES (?, ?, ?, ?)
"#,
        )
        .bind(user_id)
        .bind(username)
        .bind(password_hash)
        .bind(created_at)
        .execute(tx.conn())
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                AuthError::DuplicateUsername
            } else {
                AuthError::Store(format!("insert account: {e}"))
            }
        })?;

        Ok(Account {
            id: user_id,
            username: username.to_owned(),
            created_at,
        })
    }

    async fn get_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
    ) -> Result<Option<Account>, AuthError> {
        let tx = downcast(tx);

        let row = sqlx::query("SELECT id, username, created_at FROM account WHERE id = ?")
            .bind(user_id)
            .fetch_optional(tx.conn())
            .await
            .map_err(|e| AuthError::Store(format!("query account: {e}")))?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    async fn get_by_username_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        username: &str,
    ) -> Result<Option<Account>, AuthError> {
        let tx = downcast(tx);

        let row = sqlx::query("SELECT id, username, created_at FROM account WHERE username = ?")
            .bind(username)
            .fetch_optional(tx.conn())
            .await
            .map_err(|e| AuthError::Store(format!("query account by username: {e}")))?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    async fn get_credentials_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        username: &str,
    ) -> Result<Option<AccountCredentials>, AuthError> {
        let tx = downcast(tx);

        let row = sqlx::query(
            r#"
SELECT id, username, password_hash, created_at
FROM account
WHERE username = ?
"#,
        )
        .bind(username)
        .fetch_optional(tx.conn())
        .await
        .map_err(|e| AuthError::Store(format!("query credentials: {e}")))?;

        row.map(|row| {
            let account = Self::row_to_account(&row)?;
            let password_hash: String = row
                .try_get("password_hash")
                .map_err(|e| AuthError::Store(e.to_string()))?;
            Ok(AccountCredentials {
                account,
                password_hash,
            })
        })
        .transpose()
    }

    async fn lock_pair_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        pair: UserPair,
    ) -> Result<u64, AuthError> {
        let tx = downcast(tx);

        // primary-key scan in ascending order takes the min row lock first
        let rows = sqlx::query("SELECT id FROM account WHERE id IN (?, ?) ORDER BY id FOR UPDATE")
            .bind(pair.min())
            .bind(pair.max())
            .fetch_all(tx.conn())
            .await
            .map_err(|e| AuthError::Store(format!("lock account pair: {e}")))?;

        Ok(rows.len() as u64)
    }

    async fn lock_accounts_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_ids: &[UserId],
    ) -> Result<u64, AuthError> {
        let tx = downcast(tx);
        let mut user_ids = user_ids.to_vec();
        user_ids.sort();
        user_ids.dedup();
        if user_ids.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "SELECT id FROM account WHERE id IN ({}) ORDER BY id FOR UPDATE",
            vec!["?"; user_ids.len()].join(", ")
        );
        let rows = user_ids
            .iter()
            .fold(sqlx::query(&sql), |query, user_id| query.bind(*user_id))
            .fetch_all(tx.conn())
            .await
            .map_err(|e| AuthError::Store(format!("lock accounts: {e}")))?;

        Ok(rows.len() as u64)
    }
}
