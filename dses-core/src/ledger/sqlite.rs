// src/ledger/sqlite.rs
//! Durable reference host backed by a single SQLite connection.
//!
//! - One SQL transaction per invocation: commit on `Ok`, rollback on `Err`.
//! - Keys are stored as BLOBs so composite-key separators survive and prefix
//!   scans compare bytewise.
//! - Balances and the transfer journal live next to the state table and move
//!   inside the same transaction.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::amount::Amount;
use crate::error::{LedgerError, Result};
use crate::ledger::{
    transfer_error, CallerIdentity, KeyValue, RecordStore, TokenTransfer, TransferRecord, TxClock,
};

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS state (
  key    BLOB PRIMARY KEY,   -- prefix + segments (composite keys are NUL separated)
  value  BLOB NOT NULL       -- JSON record
);

CREATE TABLE IF NOT EXISTS balances (
  address  TEXT NOT NULL,
  token    TEXT NOT NULL,
  amount   TEXT NOT NULL,     -- exact decimal
  PRIMARY KEY (address, token)
);

CREATE TABLE IF NOT EXISTS transfers (
  id         INTEGER PRIMARY KEY AUTOINCREMENT,
  ts         TEXT NOT NULL,   -- RFC3339 UTC
  sender     TEXT NOT NULL,
  recipient  TEXT NOT NULL,
  token      TEXT NOT NULL,
  amount     TEXT NOT NULL
);
"#;

pub struct SqliteLedger {
    conn: Connection,
    last_ts: Option<DateTime<Utc>>,
}

impl SqliteLedger {
    /// Open/create the ledger file and ensure schema.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create_dir_all({:?})", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open sqlite at {:?}", path))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch(SCHEMA).context("create ledger schema")?;
        Ok(Self { conn, last_ts: None })
    }

    /// Run one invocation as `caller` inside a single SQL transaction.
    pub fn invoke<T, F>(&mut self, caller: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteInvocation<'_>) -> Result<T>,
    {
        let ts = self.next_timestamp();
        let tx = self.conn.transaction()?;
        let outcome = {
            let mut inv = SqliteInvocation {
                conn: &tx,
                caller: caller.to_string(),
                ts,
            };
            f(&mut inv)
        };
        match outcome {
            Ok(v) => {
                tx.commit()?;
                self.last_ts = Some(ts);
                Ok(v)
            }
            Err(e) => {
                if let Err(rb) = tx.rollback() {
                    warn!(error = %rb, "rollback failed; invocation error kept");
                }
                Err(e)
            }
        }
    }

    // Wall clock, forced strictly forward so audit keys stay ordered.
    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.last_ts {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        }
    }

    /// Seed a balance (dev host only; the real token ledger is external).
    pub fn fund(&mut self, address: &str, token: &str, amount: &Amount) -> Result<Amount> {
        let tx = self.conn.transaction()?;
        let updated = &read_balance(&tx, address, token)? + amount;
        write_balance(&tx, address, token, &updated)?;
        tx.commit()?;
        Ok(updated)
    }

    pub fn balance(&self, address: &str, token: &str) -> Result<Amount> {
        read_balance(&self.conn, address, token)
    }

    pub fn transfers(&self) -> Result<Vec<TransferRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT ts, sender, recipient, token, amount FROM transfers ORDER BY id",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (ts, from, to, token, amount) = row?;
            let ts = DateTime::parse_from_rfc3339(&ts)
                .map_err(|e| LedgerError::StorageFailure(format!("transfer ts: {e}")))?
                .with_timezone(&Utc);
            out.push(TransferRecord {
                from,
                to,
                token,
                amount: Amount::parse(&amount, "stored amount")?,
                ts,
            });
        }
        Ok(out)
    }
}

pub struct SqliteInvocation<'a> {
    conn: &'a Connection,
    caller: String,
    ts: DateTime<Utc>,
}

impl RecordStore for SqliteInvocation<'_> {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let v = self
            .conn
            .query_row(
                "SELECT value FROM state WHERE key = ?1",
                [key.as_bytes()],
                |r| r.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(v)
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO state(key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key.as_bytes(), value],
        )?;
        Ok(())
    }

    fn del_state(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM state WHERE key = ?1", [key.as_bytes()])?;
        Ok(())
    }

    fn state_by_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, value FROM state
             WHERE key >= ?1 AND substr(key, 1, ?2) = ?1
             ORDER BY key",
        )?;
        let len = i64::try_from(prefix.len())
            .map_err(|_| LedgerError::invalid("prefix too long"))?;
        let rows = stmt.query_map(params![prefix.as_bytes(), len], |r| {
            Ok((r.get::<_, Vec<u8>>(0)?, r.get::<_, Vec<u8>>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (k, v) = row?;
            let k = String::from_utf8(k)
                .map_err(|e| LedgerError::StorageFailure(format!("non UTF-8 key: {e}")))?;
            out.push((k, v));
        }
        Ok(out)
    }
}

impl CallerIdentity for SqliteInvocation<'_> {
    fn sender(&self) -> Result<String> {
        Ok(self.caller.clone())
    }
}

impl TxClock for SqliteInvocation<'_> {
    fn tx_timestamp(&self) -> Result<DateTime<Utc>> {
        Ok(self.ts)
    }
}

impl TokenTransfer for SqliteInvocation<'_> {
    fn transfer(&mut self, to: &str, token: &str, amount: &Amount) -> Result<()> {
        if to.is_empty() {
            return Err(transfer_error("empty recipient address"));
        }
        let held = read_balance(self.conn, &self.caller, token)?;
        let left = held.checked_sub(amount).ok_or_else(|| {
            transfer_error(format!(
                "{} holds {held} {token}, needs {amount}",
                self.caller
            ))
        })?;
        write_balance(self.conn, &self.caller, token, &left)?;
        let credited = &read_balance(self.conn, to, token)? + amount;
        write_balance(self.conn, to, token, &credited)?;
        self.conn.execute(
            "INSERT INTO transfers(ts, sender, recipient, token, amount)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                self.ts.to_rfc3339(),
                self.caller,
                to,
                token,
                amount.to_string()
            ],
        )?;
        Ok(())
    }
}

fn read_balance(conn: &Connection, address: &str, token: &str) -> Result<Amount> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT amount FROM balances WHERE address = ?1 AND token = ?2",
            [address, token],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Amount::parse(&s, "stored balance"),
        None => Ok(Amount::zero()),
    }
}

fn write_balance(conn: &Connection, address: &str, token: &str, amount: &Amount) -> Result<()> {
    conn.execute(
        "INSERT INTO balances(address, token, amount) VALUES (?1, ?2, ?3)
         ON CONFLICT(address, token) DO UPDATE SET amount = excluded.amount",
        params![address, token, amount.to_string()],
    )?;
    Ok(())
}
