//! Ledger accounting engine for a decentralized service marketplace.
//!
//! Users register services, compose them into mashups, sell prepaid call-time
//! and receive incentives. All state lives in an external key-value ledger
//! reached through [`ledger::Invocation`]; [`commands::Commands`] is the entry
//! point a host drives once per request.

pub mod amount;
pub mod commands;
pub mod config;
pub mod error;
pub mod ledger;
pub mod services;
pub mod types;
pub mod utils;

pub use amount::Amount;
pub use commands::Commands;
pub use config::{CoreConfig, EconomyPolicy};
pub use error::{ErrorKind, LedgerError, Result};
pub use types::{BuyRecord, CallTimeAccount, ReduceRecord, Service, ServiceStatus, User};
