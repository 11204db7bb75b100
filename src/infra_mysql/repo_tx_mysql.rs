use crate::domain_port::{StorageTx, TxManager};
use anyhow::anyhow;
use sqlx::{MySql, MySqlConnection, MySqlPool, Transaction};

pub struct MySqlTxManager {
    pool: MySqlPool,
    lock_wait_timeout_secs: Option<u32>,
}

impl MySqlTxManager {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlTxManager {
            pool,
            lock_wait_timeout_secs: None,
        }
    }

    /// Bounds how long a transaction queues behind another one's pair lock
    /// before InnoDB gives up with an error.
    pub fn with_lock_wait_timeout(mut self, secs: Option<u32>) -> Self {
        self.lock_wait_timeout_secs = secs;
        self
    }
}

#[async_trait::async_trait]
impl TxManager for MySqlTxManager {
    async fn begin<'t>(&'t self) -> anyhow::Result<Box<dyn StorageTx<'t> + 't>> {
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        if let Some(secs) = self.lock_wait_timeout_secs {
            sqlx::query("SET SESSION innodb_lock_wait_timeout = ?")
                .bind(secs)
                .execute(tx.as_mut())
                .await
                .map_err(|e| anyhow!("set lock wait timeout: {e}"))?;
        }
        Ok(Box::new(MySqlTx::new(tx)))
    }
}

pub struct MySqlTx<'t> {
    inner: Transaction<'t, MySql>,
}

impl<'t> MySqlTx<'t> {
    pub fn new(inner: Transaction<'t, MySql>) -> Self {
        MySqlTx { inner }
    }

    pub fn conn(&mut self) -> &mut MySqlConnection {
        self.inner.as_mut()
    }
}

#[async_trait::async_trait]
impl<'t> StorageTx<'t> for MySqlTx<'t> {
    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        self.inner.commit().await.map_err(|e| anyhow!(e))?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        self.inner.rollback().await.map_err(|e| anyhow!(e))?;
        Ok(())
    }
}
