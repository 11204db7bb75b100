/// Hands out storage transactions. Every service operation runs on exactly one.
#[async_trait::async_trait]
pub trait TxManager: Send + Sync {
    async fn begin<'t>(&'t self) -> anyhow::Result<Box<dyn StorageTx<'t> + 't>>;
}

/// An open transaction. Dropping it without `commit` rolls it back.
///
/// Repositories receive it as `&mut dyn StorageTx` and downcast to the
/// backend's concrete type, so a repo must only ever see transactions from
/// the `TxManager` of its own backend.
#[async_trait::async_trait]
pub trait StorageTx<'t>: Send {
    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
    async fn rollback(self: Box<Self>) -> anyhow::Result<()>;
}
