//! SQLite pool factory and schema bootstrap for bookshelf.
//!
//! The [`Database`] handle is created once at process start, handed to every
//! module through the kernel's init context, and closed at process stop.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, Transaction};

/// Transaction scoped to a single unit of work.
///
/// Dropping it without calling `commit` rolls every statement back.
pub type Tx = Transaction<'static, Sqlite>;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_url")]
    pub url: String,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "DatabaseSettings::default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// How long a statement waits on another connection's write lock.
    #[serde(default = "DatabaseSettings::default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl DatabaseSettings {
    fn default_url() -> String {
        "sqlite://bookshelf.db".to_string()
    }

    fn default_max_connections() -> u32 {
        5
    }

    fn default_acquire_timeout_ms() -> u64 {
        30000
    }

    fn default_busy_timeout_ms() -> u64 {
        5000
    }

    /// Settings for a private in-memory database, used by tests.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            ..Self::default()
        }
    }

    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            max_connections: Self::default_max_connections(),
            acquire_timeout_ms: Self::default_acquire_timeout_ms(),
            busy_timeout_ms: Self::default_busy_timeout_ms(),
        }
    }
}

/// Table definition contributed by a module.
///
/// `ddl` must be idempotent (`CREATE ... IF NOT EXISTS`); it may hold
/// several statements.
#[derive(Debug, Clone)]
pub struct TableDef {
    pub name: &'static str,
    pub ddl: &'static str,
}

/// Explicitly constructed persistence handle wrapping the connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the pool described by `settings`, creating the database file if missing.
    ///
    /// File databases run in WAL mode so readers never block the single writer;
    /// writers queue on the lock for up to `busy_timeout_ms`.
    pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let mut options = SqliteConnectOptions::from_str(&settings.url)
            .with_context(|| format!("invalid database url '{}'", settings.url))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_millis(settings.busy_timeout_ms));

        if !settings.is_in_memory() {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        // Every connection to `:memory:` is its own database, so keep exactly one alive.
        let pool_options = if settings.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(settings.max_connections)
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms))
            .connect_with(options)
            .await
            .with_context(|| format!("failed to connect to '{}'", settings.url))?;

        tracing::info!(
            target: "bookshelf-db",
            url = %settings.url,
            max_connections = pool.options().get_max_connections(),
            "database pool opened"
        );

        Ok(Self { pool })
    }

    /// Create every table that does not exist yet, all in one transaction.
    pub async fn ensure_schema(&self, tables: &[TableDef]) -> anyhow::Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin schema transaction")?;

        for table in tables {
            tracing::debug!(target: "bookshelf-db", table = table.name, "ensuring table");
            sqlx::raw_sql(table.ddl)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("failed to create table '{}'", table.name))?;
        }

        tx.commit()
            .await
            .context("failed to commit schema transaction")?;

        tracing::info!(target: "bookshelf-db", tables = tables.len(), "schema ready");
        Ok(())
    }

    /// Start a unit of work on a freshly acquired connection.
    pub async fn begin(&self) -> Result<Tx, sqlx::Error> {
        self.pool.begin().await
    }

    /// Round-trip a trivial query to prove the pool can serve requests.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!(target: "bookshelf-db", "database pool closed");
    }
}
