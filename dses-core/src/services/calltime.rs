// src/services/calltime.rs
//! Prepaid call-time: buyers purchase units of an available service, the
//! service's developer reduces them as calls are served. Every movement leaves
//! an immutable audit record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::amount::Amount;
use crate::config::EconomyPolicy;
use crate::error::{LedgerError, Result};
use crate::ledger::keys::{buy_record_key, call_time_key, reduce_record_key};
use crate::ledger::{get_json, put_json, Invocation, RecordStore};
use crate::services::{catalog, identity, index};
use crate::types::{BuyRecord, CallTimeAccount, ReduceRecord, ServiceStatus};

/// Audit keys are bounded per second; past this many we give up.
const MAX_AUDIT_SEQ: u32 = 1024;

pub fn purchase<S: Invocation + ?Sized>(
    stub: &mut S,
    policy: &EconomyPolicy,
    service_name: &str,
    units: &str,
) -> Result<CallTimeAccount> {
    require(service_name, "service name")?;
    let mut buyer = identity::caller(stub)?;
    let service = catalog::load(stub, service_name)?;
    if service.status != ServiceStatus::Available {
        return Err(LedgerError::InvalidState(format!(
            "service {service_name} is {}, not available",
            service.status.as_str()
        )));
    }
    let units = Amount::parse_positive(units, "call time")?;
    let cost = &service.price * &units;

    let now = stub.tx_timestamp()?;
    let account_key = call_time_key(&service.name, &buyer.name)?;
    let mut account = match get_json::<CallTimeAccount, _>(stub, &account_key)? {
        Some(mut acct) => {
            acct.call_times = &acct.call_times + &units;
            acct.total = &acct.total + &cost;
            acct.update_time = now;
            acct
        }
        None => CallTimeAccount {
            service_name: service.name.clone(),
            user_name: buyer.name.clone(),
            user_address: buyer.address.clone(),
            call_times: units.clone(),
            total: cost.clone(),
            create_time: now,
            update_time: now,
        },
    };
    // Address may have changed if the name was re-registered.
    account.user_address = buyer.address.clone();

    // The fee is one unit price, whatever the quantity.
    let developer = identity::load(stub, &service.developer)?;
    stub.transfer(&developer.address, &policy.fee_token, &service.price)?;

    put_json(stub, &account_key, &account)?;
    let record = BuyRecord {
        service_call_time_key: account_key.clone(),
        service_name: service.name.clone(),
        user_name: buyer.name.clone(),
        call_time: units.clone(),
        total: cost,
        create_time: now,
    };
    append_audit(stub, &record, &now, |seq| {
        buy_record_key(&service.name, &buyer.name, &now, seq)
    })?;
    index::link_account(stub, &account, &account_key)?;

    buyer.total_call_times = &buyer.total_call_times + &units;
    identity::save(stub, &buyer)?;
    info!(
        service = %service.name,
        buyer = %buyer.name,
        units = %units,
        remaining = %account.call_times,
        "call time purchased"
    );
    Ok(account)
}

pub fn reduce<S: Invocation + ?Sized>(
    stub: &mut S,
    service_name: &str,
    user_name: &str,
    units: &str,
) -> Result<CallTimeAccount> {
    require(service_name, "service name")?;
    require(user_name, "user name")?;
    let mut dev = identity::caller(stub)?;
    let service = catalog::load(stub, service_name)?;
    if service.developer != dev.name {
        return Err(LedgerError::unauthorized(format!(
            "{} is not the developer of {service_name}",
            dev.name
        )));
    }
    let account_key = call_time_key(&service.name, user_name)?;
    let mut account: CallTimeAccount = get_json(stub, &account_key)?.ok_or_else(|| {
        LedgerError::not_found(format!("no call time for {user_name} on {service_name}"))
    })?;
    let units = Amount::parse_positive(units, "call time")?;
    account.call_times = account.call_times.checked_sub(&units).ok_or_else(|| {
        LedgerError::InsufficientBalance(format!(
            "{user_name} has {} call time left on {service_name}, {units} requested",
            account.call_times
        ))
    })?;

    let now = stub.tx_timestamp()?;
    account.update_time = now;
    put_json(stub, &account_key, &account)?;
    index::link_account(stub, &account, &account_key)?;
    let record = ReduceRecord {
        service_name: service.name.clone(),
        service_call_time_key: account_key.clone(),
        user_name: dev.name.clone(),
        reduce_time: units.clone(),
        create_time: now,
    };
    append_audit(stub, &record, &now, |seq| {
        reduce_record_key(&service.name, user_name, &now, seq)
    })?;

    dev.total_invoke_times = &dev.total_invoke_times + &units;
    identity::save(stub, &dev)?;
    info!(
        service = %service.name,
        user = %user_name,
        units = %units,
        remaining = %account.call_times,
        "call time reduced"
    );
    Ok(account)
}

pub fn get_account<S: RecordStore + ?Sized>(
    stub: &S,
    service_name: &str,
    user_name: &str,
) -> Result<CallTimeAccount> {
    require(service_name, "service name")?;
    require(user_name, "user name")?;
    let key = call_time_key(service_name, user_name)?;
    let account: CallTimeAccount = get_json(stub, &key)?.ok_or_else(|| {
        LedgerError::not_found(format!("no call time for {user_name} on {service_name}"))
    })?;
    debug!(service = %service_name, user = %user_name, remaining = %account.call_times, "call time queried");
    Ok(account)
}

pub fn list_accounts<S: RecordStore + ?Sized>(
    stub: &S,
    service_name: &str,
) -> Result<Vec<CallTimeAccount>> {
    require(service_name, "service name")?;
    index::list_accounts_for_service(stub, service_name)
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        return Err(LedgerError::invalid(format!("{what} must not be empty")));
    }
    Ok(())
}

// Audit records are never overwritten: take the first free key for this second.
fn append_audit<S, T, F>(stub: &mut S, record: &T, ts: &DateTime<Utc>, key_for: F) -> Result<String>
where
    S: RecordStore + ?Sized,
    T: Serialize,
    F: Fn(u32) -> Result<String>,
{
    for seq in 0..MAX_AUDIT_SEQ {
        let key = key_for(seq)?;
        if stub.get_state(&key)?.is_none() {
            put_json(stub, &key, record)?;
            return Ok(key);
        }
    }
    Err(LedgerError::StorageFailure(format!(
        "no free audit key left for second {}",
        ts.timestamp()
    )))
}
