use crate::error::LedgerResult;
use crate::schema::{BOOTSTRAP, MIGRATIONS};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use swarm_core::config::DatabaseConfig;
use tracing::debug;

/// One SQLite connection to the ledger database.
///
/// A `Db` is used from one thread at a time; concurrent callers each open
/// their own on the same file.
pub struct Db {
    pub(crate) conn: Connection,
}

impl Db {
    pub fn open_or_create(path: impl AsRef<Path>) -> LedgerResult<Self> {
        Self::open_with(&DatabaseConfig { path: path.as_ref().to_path_buf(), ..DatabaseConfig::default() })
    }

    pub fn open_with(cfg: &DatabaseConfig) -> LedgerResult<Self> {
        let conn = Connection::open(&cfg.path)?;
        conn.busy_timeout(Duration::from_millis(cfg.busy_timeout_ms))?;
        apply_pragmas(&conn)?;
        migrate(&conn)?;
        debug!(path = %cfg.path.display(), "ledger database opened");
        Ok(Db { conn })
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        debug!("in-memory ledger database opened");
        Ok(Db { conn })
    }

    /// Begin an immediate (write-locking) transaction on this connection.
    pub(crate) fn begin_write(&self) -> LedgerResult<Transaction<'_>> {
        Ok(Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?)
    }
}

fn apply_pragmas(conn: &Connection) -> LedgerResult<()> {
    let mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |r| r.get(0))?;
    debug!(%mode, "journal mode");
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "cache_size", -65536i64)?; // 64 MiB
    Ok(())
}

fn migrate(conn: &Connection) -> LedgerResult<()> {
    conn.execute_batch(BOOTSTRAP)?;
    for &(version, sql) in MIGRATIONS {
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        let applied = tx
            .query_row("SELECT 1 FROM schema_migrations WHERE version=?", [version], |r| r.get::<_, i64>(0))
            .optional()?
            .is_some();
        if applied {
            continue;
        }
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT INTO schema_migrations(version, applied_at) VALUES (?,?)",
            params![version, swarm_core::now_ms()],
        )?;
        tx.commit()?;
        debug!(version, "applied migration");
    }
    Ok(())
}
