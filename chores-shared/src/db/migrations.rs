/// Schema migrations
///
/// The SQL files under the workspace `migrations/` directory are compiled into
/// the binary, so a deployed server carries its own schema.
///
/// # Example
///
/// ```no_run
/// use chores_shared::db::migrations::{get_migration_status, run_migrations};
/// use chores_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::in_memory()).await?;
/// run_migrations(&pool).await?;
///
/// let status = get_migration_status(&pool).await?;
/// assert_eq!(status.pending, 0);
/// # Ok(())
/// # }
/// ```

use sqlx::migrate::{MigrateDatabase, MigrateError, Migrator};
use sqlx::Sqlite;
use tracing::{debug, error, info};

use super::pool::DbPool;

static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Successfully applied migrations recorded in `_sqlx_migrations`
    pub applied: usize,

    /// Embedded migrations not yet applied
    pub pending: usize,

    /// Highest applied version
    pub latest_version: Option<i64>,

    pub is_up_to_date: bool,
}

/// Applies every pending migration, each in its own transaction
pub async fn run_migrations(pool: &DbPool) -> Result<(), MigrateError> {
    let embedded = MIGRATOR.iter().count();
    info!(embedded, "Applying schema migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        error!(error = %e, "Schema migration failed");
        e
    })?;

    info!("Schema is current");
    Ok(())
}

/// Compares the bookkeeping table with the embedded migrations
pub async fn get_migration_status(pool: &DbPool) -> Result<MigrationStatus, sqlx::Error> {
    let embedded = MIGRATOR.iter().count();

    let has_table: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations')",
    )
    .fetch_one(pool)
    .await?;

    let (applied, latest_version) = if has_table {
        let (count, latest): (i64, Option<i64>) = sqlx::query_as(
            "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = 1",
        )
        .fetch_one(pool)
        .await?;
        (count as usize, latest)
    } else {
        (0, None)
    };

    let pending = embedded.saturating_sub(applied);
    debug!(applied, pending, ?latest_version, "Migration status");

    Ok(MigrationStatus {
        applied,
        pending,
        latest_version,
        is_up_to_date: pending == 0,
    })
}

/// Creates the SQLite file behind `database_url` when it is missing
///
/// `:memory:` URLs are left alone.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if database_url.contains(":memory:") {
        return Ok(());
    }

    if Sqlite::database_exists(database_url).await? {
        debug!(url = database_url, "Database file present");
    } else {
        Sqlite::create_database(database_url).await?;
        info!(url = database_url, "Created database file");
    }

    Ok(())
}
