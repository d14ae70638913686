//! Error types for the swarm ledger.

use rusqlite::ErrorCode;
use swarm_core::ParseEnumError;
use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Every variant except `Storage`, `Io`, `Export` and `UpdateTimeOverflow`
/// is a precondition the caller can resolve by re-reading state and retrying.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("duplicate data_id: {0}")]
    DuplicateId(String),

    #[error("host {0} is already a swarm member")]
    AlreadyMember(String),

    #[error("host {0} is not a swarm member")]
    NotAMember(String),

    #[error("swarm already running on host {0}")]
    AlreadyRunning(String),

    #[error("swarm not running on host {0}")]
    NotRunning(String),

    #[error("concurrent modification of host {host_ip} after {attempts} attempts")]
    ConcurrentModification { host_ip: String, attempts: u32 },

    #[error("update_time of host {0} cannot advance past i64::MAX")]
    UpdateTimeOverflow(String),

    #[error("invalid stored value: {0}")]
    InvalidValue(#[from] ParseEnumError),

    #[error("unsupported table: {0}")]
    UnsupportedTable(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("export error: {0}")]
    Export(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    /// Transient lock contention that a fresh transaction may get past.
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Storage(rusqlite::Error::SqliteFailure(e, _)) => {
                matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
            }
            _ => false,
        }
    }

    /// Map a primary-key violation on insert to `DuplicateId`.
    pub(crate) fn on_insert(err: rusqlite::Error, data_id: &str) -> Self {
        if is_primary_key_violation(&err) {
            LedgerError::DuplicateId(data_id.to_string())
        } else {
            LedgerError::Storage(err)
        }
    }
}

pub(crate) fn is_primary_key_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}

impl From<arrow::error::ArrowError> for LedgerError {
    fn from(e: arrow::error::ArrowError) -> Self {
        LedgerError::Export(e.to_string())
    }
}

impl From<parquet::errors::ParquetError> for LedgerError {
    fn from(e: parquet::errors::ParquetError) -> Self {
        LedgerError::Export(e.to_string())
    }
}
