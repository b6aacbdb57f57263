// src/ledger/memory.rs
//! In-process reference host.
//!
//! - Committed state is a `BTreeMap`, so prefix scans come back in key order.
//! - Each invocation writes into an overlay; reads see the overlay first.
//! - Transfers draw on a strict balance book: the sender must hold the amount.
//! - The clock is deterministic and advances one second per invocation.
//!
//! Used by tests and the bench; the SQLite host is the durable variant.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::amount::Amount;
use crate::error::Result;
use crate::ledger::{
    transfer_error, CallerIdentity, KeyValue, RecordStore, TokenTransfer, TransferRecord, TxClock,
};

type BalanceKey = (String, String); // (address, token)

#[derive(Debug, Clone)]
pub struct MemoryLedger {
    state: BTreeMap<String, Vec<u8>>,
    balances: BTreeMap<BalanceKey, Amount>,
    journal: Vec<TransferRecord>,
    now: DateTime<Utc>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            state: BTreeMap::new(),
            balances: BTreeMap::new(),
            journal: Vec::new(),
            // 2018-01-01T00:00:00Z; fixed so audit keys are reproducible.
            now: Utc.timestamp_opt(1_514_764_800, 0).single().unwrap_or_else(Utc::now),
        }
    }

    /// Run one invocation as `caller`. Writes and transfers land only when `f`
    /// returns `Ok`.
    pub fn invoke<T, F>(&mut self, caller: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut MemoryInvocation<'_>) -> Result<T>,
    {
        self.now = self.now + Duration::seconds(1);
        let mut inv = MemoryInvocation {
            base: &self.state,
            base_balances: &self.balances,
            writes: BTreeMap::new(),
            balance_writes: BTreeMap::new(),
            transfers: Vec::new(),
            caller: caller.to_string(),
            ts: self.now,
        };
        let out = f(&mut inv)?;
        let MemoryInvocation { writes, balance_writes, transfers, .. } = inv;
        for (k, v) in writes {
            match v {
                Some(bytes) => {
                    self.state.insert(k, bytes);
                }
                None => {
                    self.state.remove(&k);
                }
            }
        }
        self.balances.extend(balance_writes);
        self.journal.extend(transfers);
        Ok(out)
    }

    /// Seed a balance (outside any invocation).
    pub fn fund(&mut self, address: &str, token: &str, amount: Amount) {
        let key = (address.to_string(), token.to_string());
        let cur = self.balances.get(&key).cloned().unwrap_or_default();
        self.balances.insert(key, &cur + &amount);
    }

    pub fn balance(&self, address: &str, token: &str) -> Amount {
        self.balances
            .get(&(address.to_string(), token.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Every committed transfer, oldest first.
    pub fn transfers(&self) -> &[TransferRecord] {
        &self.journal
    }

    /// Raw committed value; handy for asserting on audit records.
    pub fn raw(&self, key: &str) -> Option<&[u8]> {
        self.state.get(key).map(|v| v.as_slice())
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.state
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

pub struct MemoryInvocation<'a> {
    base: &'a BTreeMap<String, Vec<u8>>,
    base_balances: &'a BTreeMap<BalanceKey, Amount>,
    writes: BTreeMap<String, Option<Vec<u8>>>,
    balance_writes: BTreeMap<BalanceKey, Amount>,
    transfers: Vec<TransferRecord>,
    caller: String,
    ts: DateTime<Utc>,
}

impl MemoryInvocation<'_> {
    fn balance_of(&self, key: &BalanceKey) -> Amount {
        self.balance_writes
            .get(key)
            .or_else(|| self.base_balances.get(key))
            .cloned()
            .unwrap_or_default()
    }
}

impl RecordStore for MemoryInvocation<'_> {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(staged) = self.writes.get(key) {
            return Ok(staged.clone());
        }
        Ok(self.base.get(key).cloned())
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        self.writes.insert(key.to_string(), Some(value));
        Ok(())
    }

    fn del_state(&mut self, key: &str) -> Result<()> {
        self.writes.insert(key.to_string(), None);
        Ok(())
    }

    fn state_by_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>> {
        let mut merged: BTreeMap<&str, &[u8]> = self
            .base
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_slice()))
            .collect();
        let staged = self
            .writes
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix));
        for (k, v) in staged {
            match v {
                Some(bytes) => {
                    merged.insert(k.as_str(), bytes.as_slice());
                }
                None => {
                    merged.remove(k.as_str());
                }
            }
        }
        Ok(merged
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_vec()))
            .collect())
    }
}

impl CallerIdentity for MemoryInvocation<'_> {
    fn sender(&self) -> Result<String> {
        Ok(self.caller.clone())
    }
}

impl TxClock for MemoryInvocation<'_> {
    fn tx_timestamp(&self) -> Result<DateTime<Utc>> {
        Ok(self.ts)
    }
}

impl TokenTransfer for MemoryInvocation<'_> {
    fn transfer(&mut self, to: &str, token: &str, amount: &Amount) -> Result<()> {
        if to.is_empty() {
            return Err(transfer_error("empty recipient address"));
        }
        let from_key = (self.caller.clone(), token.to_string());
        let held = self.balance_of(&from_key);
        let left = held.checked_sub(amount).ok_or_else(|| {
            transfer_error(format!(
                "{} holds {held} {token}, needs {amount}",
                self.caller
            ))
        })?;
        self.balance_writes.insert(from_key, left);

        let to_key = (to.to_string(), token.to_string());
        let credited = &self.balance_of(&to_key) + amount;
        self.balance_writes.insert(to_key, credited);

        self.transfers.push(TransferRecord {
            from: self.caller.clone(),
            to: to.to_string(),
            token: token.to_string(),
            amount: amount.clone(),
            ts: self.ts,
        });
        Ok(())
    }
}
