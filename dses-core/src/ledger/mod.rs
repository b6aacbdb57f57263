// src/ledger/mod.rs
//! Narrow interface to the external ledger.
//!
//! The accounting core never owns storage, balances, identity or time. A host
//! hands each command an [`Invocation`]: a snapshot of the store with
//! read-your-writes semantics, the attested caller address, the transaction
//! timestamp and the token transfer primitive. The host commits every write and
//! transfer of that invocation together, or none of them.

use chrono::{DateTime, Utc};

use crate::amount::Amount;
use crate::error::{LedgerError, Result};

pub mod keys;
pub mod memory;
pub mod sqlite;

pub use memory::{MemoryInvocation, MemoryLedger};
pub use sqlite::{SqliteInvocation, SqliteLedger};

/// Separator used by composite keys. Segments may not contain it.
pub const COMPOSITE_SEP: char = '\u{0}';

/// One `(key, value)` pair returned by an enumeration.
pub type KeyValue = (String, Vec<u8>);

pub trait RecordStore {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<()>;

    fn del_state(&mut self, key: &str) -> Result<()>;

    /// Ordered scan of every key that starts with `prefix`.
    fn state_by_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>>;

    /// `namespace` + each segment, every part terminated by [`COMPOSITE_SEP`].
    fn create_composite_key(&self, namespace: &str, segments: &[&str]) -> Result<String> {
        keys::composite(namespace, segments)
    }

    /// Ordered scan of a composite namespace narrowed by leading segments.
    fn state_by_partial_composite_key(
        &self,
        namespace: &str,
        segments: &[&str],
    ) -> Result<Vec<KeyValue>> {
        let prefix = self.create_composite_key(namespace, segments)?;
        self.state_by_prefix(&prefix)
    }
}

pub trait CallerIdentity {
    /// Verified address of whoever submitted the current request.
    fn sender(&self) -> Result<String>;
}

pub trait TxClock {
    /// Same value for every call within one invocation.
    fn tx_timestamp(&self) -> Result<DateTime<Utc>>;
}

pub trait TokenTransfer {
    /// Move `amount` of `token` from the invocation sender to `to`.
    fn transfer(&mut self, to: &str, token: &str, amount: &Amount) -> Result<()>;
}

/// Everything a command needs from the host for one invocation.
pub trait Invocation: RecordStore + CallerIdentity + TxClock + TokenTransfer {}

impl<T> Invocation for T where T: RecordStore + CallerIdentity + TxClock + TokenTransfer {}

/// A completed value movement, as journaled by the reference hosts.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransferRecord {
    pub from: String,
    pub to: String,
    pub token: String,
    pub amount: Amount,
    pub ts: DateTime<Utc>,
}

/// Read a JSON record, `Ok(None)` when the key is absent.
pub fn get_json<T, S>(stub: &S, key: &str) -> Result<Option<T>>
where
    T: serde::de::DeserializeOwned,
    S: RecordStore + ?Sized,
{
    match stub.get_state(key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

pub fn put_json<T, S>(stub: &mut S, key: &str, value: &T) -> Result<()>
where
    T: serde::Serialize,
    S: RecordStore + ?Sized,
{
    let bytes = serde_json::to_vec(value)?;
    stub.put_state(key, bytes)
}

pub(crate) fn transfer_error(reason: impl std::fmt::Display) -> LedgerError {
    LedgerError::TransferFailed(reason.to_string())
}
