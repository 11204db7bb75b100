use super::repo_tx_mysql::MySqlTx;
use super::util::{bind_filter, downcast, filter_clause, is_dup_key};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::mysql::MySqlRow;

#[derive(Debug, Default)]
pub struct MySqlFriendRequestRepo;

impl MySqlFriendRequestRepo {
    pub fn new() -> Self {
        MySqlFriendRequestRepo
    }

    fn account_from(row: &MySqlRow, side: &str) -> Result<Account, sqlx::Error> {
        Ok(Account {
            id: row.try_get::<UserId, _>(format!("{side}_id").as_str())?,
            username: row.try_get(format!("{side}_username").as_str())?,
            created_at: row.try_get(format!("{side}_created_at").as_str())?,
        })
    }

    fn row_to_request(row: &MySqlRow) -> Result<FriendRequest, RelationError> {
        let decode = |e: sqlx::Error| RelationError::Store(format!("decode friend request: {e}"));

        let id: RequestId = row.try_get("id").map_err(decode)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;
        let from = Self::account_from(row, "from").map_err(decode)?;
        let to = Self::account_from(row, "to").map_err(decode)?;

        Ok(FriendRequest {
            id,
            from,
            to,
            created_at,
        })
    }

    async fn select(
        tx: &mut MySqlTx<'_>,
        filter: &RequestFilter,
        locking: &str,
    ) -> Result<Vec<FriendRequest>, RelationError> {
        let sql = format!(
            r#"
SELECT
    r.id         AS id,
    r.created_at AS created_at,
    f.id         AS from_id,
    f.username   AS from_username,
    f.created_at AS from_created_at,
    t.id         AS to_id,
    t.username   AS to_username,
    t.created_at AS to_created_at
FROM friend_request r
JOIN account f ON f.id = r.from_id
JOIN account t ON t.id = r.to_id
WHERE {}
ORDER BY r.created_at ASC, r.id ASC
{locking}
"#,
            filter_clause(filter, "r.")
        );

        let rows = bind_filter(sqlx::query(&sql), filter)
            .fetch_all(tx.conn())
            .await
            .map_err(|e| RelationError::Store(format!("select friend requests: {e}")))?;

        rows.iter().map(Self::row_to_request).collect()
    }
}

#[async_trait::async_trait]
impl FriendRequestRepo for MySqlFriendRequestRepo {
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        id: RequestId,
        from: UserId,
        to: UserId,
    ) -> Result<(), RelationError> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
INSERT INTO friend_request (id, from_id, to_id, created_at)
VALUES (?, ?, ?, ?)
"#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(Utc::now())
        .execute(tx.conn())
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                RelationError::DuplicateRequest
            } else {
                RelationError::Store(format!("insert friend request: {e}"))
            }
        })?;

        Ok(())
    }

    async fn find_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<Vec<FriendRequest>, RelationError> {
        Self::select(downcast(tx), &filter, "").await
    }

    async fn find_for_update_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<Vec<FriendRequest>, RelationError> {
        // only the request rows; the joined accounts stay unlocked
        Self::select(downcast(tx), &filter, "FOR UPDATE OF r").await
    }

    async fn exists_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        from: UserId,
        to: UserId,
    ) -> Result<bool, RelationError> {
        let tx = downcast(tx);

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM friend_request WHERE from_id = ? AND to_id = ?")
                .bind(from)
                .bind(to)
                .fetch_one(tx.conn())
                .await
                .map_err(|e| RelationError::Store(format!("count friend requests: {e}")))?;

        Ok(count > 0)
    }

    async fn delete_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<u64, RelationError> {
        let tx = downcast(tx);

        let sql = format!(
            "DELETE FROM friend_request WHERE {}",
            filter_clause(&filter, "")
        );
        let res = bind_filter(sqlx::query(&sql), &filter)
            .execute(tx.conn())
            .await
            .map_err(|e| RelationError::Store(format!("delete friend requests: {e}")))?;

        Ok(res.rows_affected())
    }
}
