//! Database connection pool, transaction envelope, and migration runner
//! shared by every Wayfare service.
//!
//! # Feature flags
//!
//! Enable exactly one database driver:
//!
//! | Feature    | Driver |
//! |------------|--------|
//! | `sqlite`   | SQLite via `sqlx/sqlite` |
//! | `postgres` | PostgreSQL via `sqlx/postgres` |
//! | `mysql`    | MySQL via `sqlx/mysql` |

pub mod error;
pub mod migration;
pub mod pool;
pub mod tx;

pub use error::{DbResult, SqlxErrorExt};
pub use migration::{run_migrations, Dialect};
pub use pool::{DbPool, PoolConfig};
pub use tx::{with_transaction, with_transaction_result, Tx};
