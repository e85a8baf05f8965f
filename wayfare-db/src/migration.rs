//! Idempotent SQL migration runner.
//!
//! Migrations are embedded into the binary with [`include_dir::include_dir!`]
//! at the call site and handed to [`run_migrations`] as a `Dir`. Each file's
//! name is the migration's identity; files are applied in name order and
//! recorded in a tracking table so re-running is a no-op.

use include_dir::Dir;
use sqlx::Database;
use wayfare_core::{CoreError, ErrorCode};

use crate::error::SqlxErrorExt;
use crate::pool::DbPool;

/// Identifies the SQL dialect a migration set targets, purely for logging
/// and for the `CREATE TABLE IF NOT EXISTS` tracking statement — the
/// migration files themselves are expected to already be dialect-correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
    MySql,
}

const TRACKING_TABLE: &str = "_wayfare_migrations";

/// Applies every `*.sql` file in `migrations`, in name order, that hasn't
/// already been recorded in the tracking table. Returns the names of the
/// migrations actually applied.
pub async fn run_migrations<DB: Database>(
    pool: &DbPool<DB>,
    dialect: Dialect,
    migrations: &Dir<'_>,
) -> Result<Vec<String>, CoreError> {
    ensure_tracking_table(pool, dialect).await?;
    let applied = applied_migration_names(pool).await?;

    let mut files: Vec<_> = migrations
        .files()
        .filter(|f| f.path().extension().is_some_and(|ext| ext == "sql"))
        .collect();
    files.sort_by_key(|f| f.path().to_path_buf());

    let mut newly_applied = Vec::new();
    for file in files {
        let name = file.path().to_string_lossy().to_string();
        if applied.contains(&name) {
            continue;
        }
        apply_migration(pool, dialect, &name, file.contents_utf8().ok_or_else(|| {
            CoreError::new(ErrorCode::Internal, format!("migration {name} is not valid UTF-8"))
        })?)
        .await?;
        tracing::info!(migration = %name, "applied migration");
        newly_applied.push(name);
    }
    Ok(newly_applied)
}

async fn ensure_tracking_table<DB: Database>(pool: &DbPool<DB>, _dialect: Dialect) -> Result<(), CoreError> {
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {TRACKING_TABLE} (name VARCHAR(255) PRIMARY KEY)"
    ))
    .execute(pool.pool())
    .await
    .map_err(SqlxErrorExt::into_core_error)?;
    Ok(())
}

async fn applied_migration_names<DB: Database>(pool: &DbPool<DB>) -> Result<Vec<String>, CoreError> {
    let rows: Vec<(String,)> = sqlx::query_as(&format!("SELECT name FROM {TRACKING_TABLE}"))
        .fetch_all(pool.pool())
        .await
        .map_err(SqlxErrorExt::into_core_error)?;
    Ok(rows.into_iter().map(|(name,)| name).collect())
}

async fn apply_migration<DB: Database>(
    pool: &DbPool<DB>,
    dialect: Dialect,
    name: &str,
    sql: &str,
) -> Result<(), CoreError> {
    let placeholder = match dialect {
        Dialect::Postgres => "$1",
        Dialect::Sqlite | Dialect::MySql => "?",
    };
    let insert_sql = format!("INSERT INTO {TRACKING_TABLE} (name) VALUES ({placeholder})");

    let sql = sql.to_string();
    let name = name.to_string();
    crate::tx::with_transaction(pool, move |tx| {
        Box::pin(async move {
            for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                sqlx::query(statement)
                    .execute(tx.as_mut())
                    .await
                    .map_err(SqlxErrorExt::into_core_error)?;
            }
            sqlx::query(&insert_sql)
                .bind(&name)
                .execute(tx.as_mut())
                .await
                .map_err(SqlxErrorExt::into_core_error)?;
            Ok(())
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolConfig;
    use include_dir::include_dir;

    static EMPTY_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/src");

    #[tokio::test]
    async fn ensure_tracking_table_is_idempotent() {
        let pool = DbPool::<sqlx::Sqlite>::connect("sqlite::memory:", &PoolConfig::default())
            .await
            .unwrap();
        ensure_tracking_table(&pool, Dialect::Sqlite).await.unwrap();
        ensure_tracking_table(&pool, Dialect::Sqlite).await.unwrap();
    }

    #[tokio::test]
    async fn run_migrations_on_a_dir_with_no_sql_files_applies_nothing() {
        let pool = DbPool::<sqlx::Sqlite>::connect("sqlite::memory:", &PoolConfig::default())
            .await
            .unwrap();
        let applied = run_migrations(&pool, Dialect::Sqlite, &EMPTY_DIR).await.unwrap();
        assert!(applied.is_empty());
    }
}
