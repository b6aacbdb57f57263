// src/error.rs
//! Error kinds surfaced by every ledger operation.
//!
//! Each variant carries a human-readable message that is returned verbatim to
//! the caller. Nothing here is retried; the host's all-or-nothing commit is the
//! only recovery mechanism.

use thiserror::Error;

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    Unauthorized,
    InvalidState,
    InsufficientBalance,
    TransferFailed,
    StorageFailure,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("transfer failed: {0}")]
    TransferFailed(String),

    #[error("storage failure: {0}")]
    StorageFailure(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            LedgerError::Unauthorized(_) => ErrorKind::Unauthorized,
            LedgerError::InvalidState(_) => ErrorKind::InvalidState,
            LedgerError::InsufficientBalance(_) => ErrorKind::InsufficientBalance,
            LedgerError::TransferFailed(_) => ErrorKind::TransferFailed,
            LedgerError::StorageFailure(_) => ErrorKind::StorageFailure,
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        LedgerError::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        LedgerError::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        LedgerError::Unauthorized(msg.into())
    }
}

// Records that fail to (de)serialize are treated as a store fault: the core
// never repairs malformed prior state.
impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::StorageFailure(format!("record codec: {e}"))
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::StorageFailure(format!("sqlite: {e}"))
    }
}
