use std::ops::Deref;
use std::time::Duration;

use sqlx::pool::PoolOptions;
use sqlx::{Database, Pool};
use wayfare_core::CoreError;

use crate::error::SqlxErrorExt;
use crate::tx::Tx;

/// Pool sizing and lifetime knobs, mirroring `wayfare_core::DatabaseSection`.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_open: u32,
    pub min_idle: u32,
    pub max_lifetime: Duration,
    pub max_idle_time: Duration,
    pub connect_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_open: 10,
            min_idle: 0,
            max_lifetime: Duration::from_secs(1800),
            max_idle_time: Duration::from_secs(600),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// A connection pool envelope over `sqlx::Pool<DB>`.
///
/// `exec`/`query`/`query_row` are deliberately not re-wrapped here: `Deref`
/// exposes the underlying `Pool<DB>` directly, so callers use sqlx's own
/// `Executor` methods (`execute`/`fetch_all`/`fetch_one`/...) the same way
/// they would against a bare pool. What this type adds on top is lifecycle:
/// sized construction from [`PoolConfig`], `ping`, `close`, and transactions.
#[derive(Clone)]
pub struct DbPool<DB: Database> {
    pool: Pool<DB>,
}

impl<DB: Database> DbPool<DB> {
    /// Opens a pool against `url` with the given sizing configuration.
    pub async fn connect(url: &str, config: &PoolConfig) -> Result<Self, CoreError> {
        let pool = PoolOptions::<DB>::new()
            .max_connections(config.max_open)
            .min_connections(config.min_idle)
            .max_lifetime(config.max_lifetime)
            .idle_timeout(config.max_idle_time)
            .acquire_timeout(config.connect_timeout)
            .connect(url)
            .await
            .map_err(SqlxErrorExt::into_core_error)?;
        Ok(Self { pool })
    }

    /// Wraps an already-open pool, e.g. one assembled by a test harness.
    pub fn from_pool(pool: Pool<DB>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<DB> {
        &self.pool
    }

    /// Verifies connectivity by acquiring and immediately releasing a
    /// connection.
    pub async fn ping(&self) -> Result<(), CoreError> {
        self.pool
            .acquire()
            .await
            .map(|_conn| ())
            .map_err(SqlxErrorExt::into_core_error)
    }

    /// Closes the pool, waiting for in-flight connections to be released.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Begins a new transaction.
    pub async fn begin_tx(&self) -> Result<Tx<'_, DB>, CoreError> {
        let tx = self.pool.begin().await.map_err(SqlxErrorExt::into_core_error)?;
        Ok(Tx(tx))
    }
}

impl<DB: Database> Deref for DbPool<DB> {
    type Target = Pool<DB>;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pool_config_has_sane_sizing() {
        let config = PoolConfig::default();
        assert_eq!(config.max_open, 10);
        assert_eq!(config.min_idle, 0);
    }

    #[tokio::test]
    async fn connect_and_ping_sqlite_in_memory() {
        let config = PoolConfig::default();
        let pool = DbPool::<sqlx::Sqlite>::connect("sqlite::memory:", &config)
            .await
            .unwrap();
        pool.ping().await.unwrap();
        pool.close().await;
    }
}
