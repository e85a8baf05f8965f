use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;

use sqlx::{Database, Transaction};
use wayfare_core::{CoreError, ErrorCode};

use crate::error::SqlxErrorExt;
use crate::pool::DbPool;

/// A transaction handle. `Deref`/`DerefMut` expose the inner
/// `sqlx::Transaction` so callers can run queries against it exactly as
/// they would against a pool.
pub struct Tx<'a, DB: Database>(pub Transaction<'a, DB>);

impl<'a, DB: Database> Deref for Tx<'a, DB> {
    type Target = Transaction<'a, DB>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a, DB: Database> DerefMut for Tx<'a, DB> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<'a, DB: Database> Tx<'a, DB> {
    pub fn into_inner(self) -> Transaction<'a, DB> {
        self.0
    }

    pub fn as_mut(&mut self) -> &mut <DB as Database>::Connection {
        &mut self.0
    }
}

/// A boxed future borrowed from a `&'c mut Tx`, the same callback shape
/// `sea_orm::TransactionTrait::transaction` uses — necessary until async
/// closures can borrow their argument across an `.await` without naming a
/// concrete future type.
type TxFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T, CoreError>> + Send + 'c>>;

/// Runs `f` inside a transaction: commits on `Ok`, rolls back on `Err`.
///
/// If the callback fails and the rollback itself also fails, the returned
/// error composes both messages rather than silently dropping the rollback
/// failure.
pub async fn with_transaction<DB, F>(pool: &DbPool<DB>, f: F) -> Result<(), CoreError>
where
    DB: Database,
    F: for<'c> FnOnce(&'c mut Tx<'_, DB>) -> TxFuture<'c, ()>,
{
    with_transaction_result(pool, f).await
}

/// Like [`with_transaction`] but threads a value of type `T` out of the
/// callback alongside the commit.
pub async fn with_transaction_result<DB, T, F>(pool: &DbPool<DB>, f: F) -> Result<T, CoreError>
where
    DB: Database,
    F: for<'c> FnOnce(&'c mut Tx<'_, DB>) -> TxFuture<'c, T>,
{
    let mut tx = pool.begin_tx().await?;
    match f(&mut tx).await {
        Ok(value) => match tx.into_inner().commit().await {
            Ok(()) => Ok(value),
            Err(commit_err) => Err(commit_err.into_core_error()),
        },
        Err(callback_err) => match tx.into_inner().rollback().await {
            Ok(()) => Err(callback_err),
            Err(rollback_err) => Err(CoreError::wrap(
                callback_err,
                ErrorCode::Internal,
                format!("transaction failed, and rollback also failed: {rollback_err}"),
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolConfig;

    #[tokio::test]
    async fn with_transaction_commits_on_success() {
        let pool = DbPool::<sqlx::Sqlite>::connect("sqlite::memory:", &PoolConfig::default())
            .await
            .unwrap();
        sqlx::query("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .execute(pool.pool())
            .await
            .unwrap();

        with_transaction(&pool, |tx| {
            Box::pin(async move {
                sqlx::query("INSERT INTO t (id) VALUES (1)")
                    .execute(tx.as_mut())
                    .await
                    .map(|_| ())
                    .map_err(SqlxErrorExt::into_core_error)
            })
        })
        .await
        .unwrap();

        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM t")
            .fetch_one(pool.pool())
            .await
            .unwrap();
        assert_eq!(row.0, 1);
    }

    #[tokio::test]
    async fn with_transaction_rolls_back_on_failure() {
        let pool = DbPool::<sqlx::Sqlite>::connect("sqlite::memory:", &PoolConfig::default())
            .await
            .unwrap();
        sqlx::query("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .execute(pool.pool())
            .await
            .unwrap();

        let result = with_transaction(&pool, |tx| {
            Box::pin(async move {
                sqlx::query("INSERT INTO t (id) VALUES (1)")
                    .execute(tx.as_mut())
                    .await
                    .map_err(SqlxErrorExt::into_core_error)?;
                Err(CoreError::new(ErrorCode::Internal, "forced failure"))
            })
        })
        .await;
        assert!(result.is_err());

        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM t")
            .fetch_one(pool.pool())
            .await
            .unwrap();
        assert_eq!(row.0, 0);
    }
}
