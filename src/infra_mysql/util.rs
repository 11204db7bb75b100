use super::repo_tx_mysql::MySqlTx;
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::MySql;
use sqlx::mysql::{MySqlArguments, MySqlDatabaseError};
use sqlx::query::Query;

pub fn downcast<'a, 't>(tx: &'a mut dyn StorageTx<'t>) -> &'a mut MySqlTx<'t> {
    unsafe {
        let p = tx as *mut dyn StorageTx<'t>;
        let p = p as *mut MySqlTx<'t>;
        &mut *p
    }
}

pub fn is_dup_key(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            return mysql_err.number() == 1062; // ER_DUP_ENTRY
        }
    }

    false
}

/// WHERE predicate over `from_id` / `to_id`. `prefix` is a table alias with
/// its dot (`"r."`) or empty. Bind with [`bind_filter`] in the same order.
pub fn filter_clause(filter: &RequestFilter, prefix: &str) -> String {
    match (filter.from, filter.to) {
        (Some(_), Some(_)) => format!("{prefix}from_id = ? AND {prefix}to_id = ?"),
        (Some(_), None) => format!("{prefix}from_id = ?"),
        (None, Some(_)) => format!("{prefix}to_id = ?"),
        (None, None) => "1 = 1".to_owned(),
    }
}

/// Values for the placeholders of [`filter_clause`], in bind order.
pub fn filter_binds(filter: &RequestFilter) -> Vec<UserId> {
    filter.from.into_iter().chain(filter.to).collect()
}

pub fn bind_filter<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    filter: &RequestFilter,
) -> Query<'q, MySql, MySqlArguments> {
    filter_binds(filter)
        .into_iter()
        .fold(query, |query, user_id| query.bind(user_id))
}
