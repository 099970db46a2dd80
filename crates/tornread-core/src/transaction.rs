//! Scoped unit of work over a store transaction
//!
//! [`interactive`] opens a transaction, hands the caller's block a
//! transaction-scoped handle, and settles it from the block's result:
//! commit on `Ok`, rollback on `Err`. The block's value becomes the
//! transaction's value.

use crate::error::GatewayError;
use crate::gateway::{release, IsolationLevel, StorageGateway, Transaction};
use futures::future::BoxFuture;

/// Run `work` inside a transaction opened at `isolation`
///
/// # Errors
/// Whatever `begin` or `work` returned, or the commit failure. When `work`
/// fails the transaction is rolled back and `work`'s error is returned.
///
/// # Example
///
/// ```rust,ignore
/// let view = interactive(&store, IsolationLevel::RepeatableRead, |tx| {
///     Box::pin(async move { tx.find_nested("Python").await })
/// })
/// .await?;
/// ```
pub async fn interactive<G, T, F>(
    gateway: &G,
    isolation: IsolationLevel,
    work: F,
) -> Result<T, GatewayError>
where
    G: StorageGateway + ?Sized,
    T: Send,
    F: for<'t> FnOnce(&'t mut dyn Transaction) -> BoxFuture<'t, Result<T, GatewayError>> + Send,
{
    let mut tx = gateway.begin(isolation).await?;
    match work(tx.as_mut()).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            tracing::debug!(error = %e, %isolation, "unit of work failed, rolling back");
            release(tx).await;
            Err(e)
        }
    }
}
