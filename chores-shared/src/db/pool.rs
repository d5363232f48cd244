/// SQLite connection pool
///
/// Repositories borrow a connection per call and return it when the borrow
/// ends, whether the statement succeeded or not. There is no global handle;
/// the pool travels in the API state.
///
/// # Example
///
/// ```no_run
/// use chores_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), sqlx::Error> {
/// let pool = create_pool(DatabaseConfig {
///     url: "sqlite://chores.db".to_string(),
///     ..Default::default()
/// })
/// .await?;
///
/// let (members,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM members")
///     .fetch_one(&pool)
///     .await?;
/// # Ok(())
/// # }
/// ```

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pool type shared by repositories and the API state
pub type DbPool = SqlitePool;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `sqlite://path/to/file.db` or `sqlite::memory:`
    pub url: String,

    pub max_connections: u32,
    pub min_connections: u32,

    /// How long a caller waits for a free connection
    pub acquire_timeout: Duration,

    /// `None` keeps idle connections open indefinitely
    pub idle_timeout: Option<Duration>,

    /// `None` never recycles a connection
    pub max_lifetime: Option<Duration>,

    /// Ping each connection as it leaves the pool
    pub test_before_acquire: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://chores.db".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
            test_before_acquire: true,
        }
    }
}

impl DatabaseConfig {
    /// A private in-memory database
    ///
    /// Each in-memory SQLite connection is a separate database, so the pool
    /// holds exactly one connection and never recycles it.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: None,
            max_lifetime: None,
            test_before_acquire: false,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

/// Opens the pool and proves it answers
///
/// The database file is created if missing and foreign keys are enforced on
/// every connection. Fails on a malformed URL, an unopenable file, or a
/// failed `SELECT 1`.
pub async fn create_pool(config: DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let mut max_connections = config.max_connections;
    let mut min_connections = config.min_connections;
    if config.is_in_memory() && max_connections > 1 {
        warn!(
            requested = max_connections,
            "In-memory database pinned to a single connection"
        );
        max_connections = 1;
        min_connections = 1;
    }

    info!(
        max_connections,
        min_connections,
        acquire_timeout_ms = config.acquire_timeout.as_millis() as u64,
        "Opening SQLite pool"
    );

    let connect_options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .min_connections(min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .test_before_acquire(config.test_before_acquire)
        .connect_with(connect_options)
        .await?;

    health_check(&pool).await?;

    info!(size = pool.size(), "SQLite pool ready");
    Ok(pool)
}

/// Round-trips `SELECT 1` through the pool
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    let (one,): (i64,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;

    if one != 1 {
        warn!(value = one, "SELECT 1 answered something else");
        return Err(sqlx::Error::Protocol(format!(
            "health check answered {}",
            one
        )));
    }

    debug!("Database answered health check");
    Ok(())
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Open connections
    pub size: u32,
    pub idle: u32,
    pub in_use: u32,
}

pub fn get_pool_stats(pool: &DbPool) -> PoolStats {
    let size = pool.size();
    let idle = pool.num_idle() as u32;

    PoolStats {
        size,
        idle,
        in_use: size.saturating_sub(idle),
    }
}

/// Waits for borrowed connections to come back, then closes them all
pub async fn close_pool(pool: DbPool) {
    let stats = get_pool_stats(&pool);
    pool.close().await;
    info!(size = stats.size, "SQLite pool closed");
}
