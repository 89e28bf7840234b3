//! SQLite Backend with Connection Pooling
//!
//! One row per (run_id, phase); writes use `INSERT OR REPLACE` so each key is
//! replaced atomically.

use std::path::Path;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};

use crate::types::{Result, RunId, StorageResultExt};
use crate::workflow::Phase;

use super::CheckpointBackend;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS checkpoints (
    run_id   TEXT NOT NULL,
    phase    TEXT NOT NULL,
    record   TEXT NOT NULL,
    saved_at TEXT NOT NULL,
    PRIMARY KEY (run_id, phase)
);
"#;

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,
    /// Timeout for acquiring a connection (seconds)
    pub connection_timeout_secs: u64,
}

impl PoolConfig {
    const MIN_POOL_SIZE: u32 = 2;
    const MAX_POOL_SIZE: u32 = 8;

    /// Pool size derived from available cores, clamped
    pub fn auto() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);
        Self {
            max_size: cores.clamp(Self::MIN_POOL_SIZE, Self::MAX_POOL_SIZE),
            connection_timeout_secs: 30,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::auto()
    }
}

pub struct SqliteBackend {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, PoolConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(path: P, config: PoolConfig) -> Result<Self> {
        let manager =
            SqliteConnectionManager::file(path.as_ref()).with_init(Self::configure_connection);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .build(manager)
            .storage_context("create connection pool")?;

        Ok(Self { pool })
    }

    /// Single-connection in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let pool = Pool::builder()
            .max_size(1)
            .build(SqliteConnectionManager::memory())
            .storage_context("create in-memory pool")?;
        Ok(Self { pool })
    }

    fn configure_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().storage_context("acquire connection")
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn()?
            .execute_batch(SCHEMA)
            .storage_context("initialize schema")
    }
}

impl CheckpointBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn write(&self, run: &RunId, phase: Phase, record: &str) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO checkpoints (run_id, phase, record, saved_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![run.as_str(), phase.key(), record, chrono::Utc::now().to_rfc3339()],
            )
            .storage_context("write checkpoint")?;
        Ok(())
    }

    fn read(&self, run: &RunId, phase: Phase) -> Result<Option<String>> {
        self.conn()?
            .query_row(
                "SELECT record FROM checkpoints WHERE run_id = ?1 AND phase = ?2",
                params![run.as_str(), phase.key()],
                |row| row.get(0),
            )
            .optional()
            .storage_context("read checkpoint")
    }

    fn contains(&self, run: &RunId, phase: Phase) -> Result<bool> {
        let count: i64 = self
            .conn()?
            .query_row(
                "SELECT COUNT(*) FROM checkpoints WHERE run_id = ?1 AND phase = ?2",
                params![run.as_str(), phase.key()],
                |row| row.get(0),
            )
            .storage_context("stat checkpoint")?;
        Ok(count > 0)
    }

    fn remove(&self, run: &RunId, phase: Phase) -> Result<bool> {
        let changed = self
            .conn()?
            .execute(
                "DELETE FROM checkpoints WHERE run_id = ?1 AND phase = ?2",
                params![run.as_str(), phase.key()],
            )
            .storage_context("remove checkpoint")?;
        Ok(changed > 0)
    }

    fn remove_run(&self, run: &RunId) -> Result<usize> {
        self.conn()?
            .execute(
                "DELETE FROM checkpoints WHERE run_id = ?1",
                params![run.as_str()],
            )
            .storage_context("remove run")
    }

    fn phases(&self, run: &RunId) -> Result<Vec<Phase>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT phase FROM checkpoints WHERE run_id = ?1")
            .storage_context("list checkpoints")?;
        let keys = stmt
            .query_map(params![run.as_str()], |row| row.get::<_, String>(0))
            .storage_context("list checkpoints")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .storage_context("list checkpoints")?;

        Ok(keys.iter().filter_map(|k| k.parse().ok()).collect())
    }

    fn runs(&self) -> Result<Vec<RunId>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT run_id FROM checkpoints ORDER BY run_id")
            .storage_context("list runs")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .storage_context("list runs")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .storage_context("list runs")?;

        Ok(ids.iter().filter_map(|id| RunId::parse(id)).collect())
    }
}
