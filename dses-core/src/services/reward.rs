// src/services/reward.rs
//! Open reward surface: anyone may send tokens to a service's developer.
//! The transfer primitive is the only gate.

use tracing::info;

use crate::amount::Amount;
use crate::error::{LedgerError, Result};
use crate::ledger::{Invocation, TransferRecord};
use crate::services::{catalog, identity};

pub fn reward<S: Invocation + ?Sized>(
    stub: &mut S,
    service_name: &str,
    token: &str,
    amount: &str,
) -> Result<TransferRecord> {
    if service_name.is_empty() {
        return Err(LedgerError::invalid("service name must not be empty"));
    }
    if token.is_empty() {
        return Err(LedgerError::invalid("token type must not be empty"));
    }
    let amount = Amount::parse(amount, "reward amount")?;
    let service = catalog::load(stub, service_name)?;
    let developer = identity::load(stub, &service.developer)?;
    stub.transfer(&developer.address, token, &amount)?;

    let record = TransferRecord {
        from: stub.sender()?,
        to: developer.address,
        token: token.to_string(),
        amount,
        ts: stub.tx_timestamp()?,
    };
    info!(
        service = %service.name,
        developer = %developer.name,
        amount = %record.amount,
        token = %record.token,
        "service rewarded"
    );
    Ok(record)
}
