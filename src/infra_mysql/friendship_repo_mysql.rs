use super::util::{bind_filter, downcast, filter_clause};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use sqlx::Row;

#[derive(Debug, Default)]
pub struct MySqlFriendshipRepo;

impl MySqlFriendshipRepo {
    pub fn new() -> Self {
        MySqlFriendshipRepo
    }
}

#[async_trait::async_trait]
impl FriendshipRepo for MySqlFriendshipRepo {
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        id: FriendshipId,
        from: UserId,
        to: UserId,
    ) -> Result<(), RelationError> {
        let tx = downcast(tx);

        sqlx::query("INSERT INTO friendship (id, from_id, to_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(Utc::now())
            .execute(tx.conn())
            .await
            .map_err(|e| RelationError::Store(format!("insert friendship: {e}")))?;

        Ok(())
    }

    async fn exists_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        from: UserId,
        to: UserId,
    ) -> Result<bool, RelationError> {
        let tx = downcast(tx);

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM friendship WHERE from_id = ? AND to_id = ?")
                .bind(from)
                .bind(to)
                .fetch_one(tx.conn())
                .await
                .map_err(|e| RelationError::Store(format!("count friendships: {e}")))?;

        Ok(count > 0)
    }

    async fn find_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<Vec<Friendship>, RelationError> {
        let tx = downcast(tx);

        let sql = format!(
            "SELECT id, from_id, to_id, created_at FROM friendship WHERE {} ORDER BY created_at ASC, id ASC",
            filter_clause(&filter, "")
        );
        let rows = bind_filter(sqlx::query(&sql), &filter)
            .fetch_all(tx.conn())
            .await
            .map_err(|e| RelationError::Store(format!("select friendships: {e}")))?;

        rows.iter()
            .map(|row| -> Result<Friendship, sqlx::Error> {
                Ok(Friendship {
                    id: row.try_get("id")?,
                    from: row.try_get("from_id")?,
                    to: row.try_get("to_id")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| RelationError::Store(format!("decode friendship: {e}")))
    }

    async fn delete_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<u64, RelationError> {
        let tx = downcast(tx);

        let sql = format!("DELETE FROM friendship WHERE {}", filter_clause(&filter, ""));
        let res = bind_filter(sqlx::query(&sql), &filter)
            .execute(tx.conn())
            .await
            .map_err(|e| RelationError::Store(format!("delete friendships: {e}")))?;

        Ok(res.rows_affected())
    }

    async fn list_friends_of_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        user_id: UserId,
    ) -> Result<Vec<Account>, RelationError> {
        let tx = downcast(tx);

        let rows = sqlx::query(
            r#"
SELECT a.id, a.username, a.created_at
FROM friendship fr
JOIN account a ON a.id = fr.from_id
WHERE fr.to_id = ?
ORDER BY a.username ASC
"#,
        )
        .bind(user_id)
        .fetch_all(tx.conn())
        .await
        .map_err(|e| RelationError::Store(format!("list friends: {e}")))?;

        rows.iter()
            .map(|row| -> Result<Account, sqlx::Error> {
                Ok(Account {
                    id: row.try_get("id")?,
                    username: row.try_get("username")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| RelationError::Store(format!("decode friend: {e}")))
    }
}
