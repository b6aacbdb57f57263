// src/services/identity.rs
//! Users: one canonical record per name plus an address -> name index.

use tracing::{debug, info};

use crate::config::EconomyPolicy;
use crate::error::{LedgerError, Result};
use crate::ledger::keys::{user_address_key, user_key};
use crate::ledger::{get_json, put_json, Invocation, RecordStore};
use crate::types::User;

pub fn register<S: Invocation + ?Sized>(
    stub: &mut S,
    policy: &EconomyPolicy,
    name: &str,
    introduction: &str,
) -> Result<User> {
    if name.is_empty() {
        return Err(LedgerError::invalid("user name must not be empty"));
    }
    let address = stub.sender()?;
    if stub.get_state(&user_key(name))?.is_some() {
        return Err(LedgerError::AlreadyExists(format!("user {name}")));
    }
    if let Some(bound) = get_json::<String, _>(stub, &user_address_key(&address))? {
        return Err(LedgerError::AlreadyExists(format!(
            "address {address} is already registered as {bound}"
        )));
    }

    let user = User {
        name: name.to_string(),
        introduction: introduction.to_string(),
        address: address.clone(),
        contribution: policy.baseline_contribution,
        total_service: 0,
        total_call_times: Default::default(),
        total_invoke_times: Default::default(),
    };
    put_json(stub, &user_key(name), &user)?;
    put_json(stub, &user_address_key(&address), &user.name)?;
    info!(user = %name, %address, "user registered");
    Ok(user)
}

pub fn remove<S: Invocation + ?Sized>(stub: &mut S, name: &str) -> Result<()> {
    let user = load(stub, name)?;
    let address = stub.sender()?;
    if user.address != address {
        return Err(LedgerError::unauthorized(format!(
            "{address} may not remove {name}"
        )));
    }
    stub.del_state(&user_key(name))?;
    stub.del_state(&user_address_key(&address))?;
    info!(user = %name, %address, "user removed");
    Ok(())
}

/// The user record with its contribution freshly computed.
pub fn query<S: RecordStore + ?Sized>(
    stub: &S,
    policy: &EconomyPolicy,
    name: &str,
) -> Result<User> {
    let mut user = load(stub, name)?;
    user.contribution = contribution(&user, policy);
    debug!(user = %name, contribution = user.contribution, "user queried");
    Ok(user)
}

pub fn query_by_address<S: RecordStore + ?Sized>(
    stub: &S,
    policy: &EconomyPolicy,
    address: &str,
) -> Result<User> {
    let mut user = load_by_address(stub, address)?;
    user.contribution = contribution(&user, policy);
    Ok(user)
}

/// `ln(s + 1) + L*v/s + R*c/s`, and `ln(1) = 0` for a user with no services.
pub fn contribution(user: &User, policy: &EconomyPolicy) -> f64 {
    let s = user.total_service as f64;
    if user.total_service == 0 {
        return 0.0;
    }
    let v = user.total_invoke_times.to_f64();
    let c = user.total_call_times.to_f64();
    (s + 1.0).ln() + policy.invoke_weight * v / s + policy.sales_weight * c / s
}

pub(crate) fn load<S: RecordStore + ?Sized>(stub: &S, name: &str) -> Result<User> {
    get_json(stub, &user_key(name))?
        .ok_or_else(|| LedgerError::not_found(format!("user {name}")))
}

pub(crate) fn load_by_address<S: RecordStore + ?Sized>(stub: &S, address: &str) -> Result<User> {
    let name: String = get_json(stub, &user_address_key(address))?
        .ok_or_else(|| LedgerError::not_found(format!("no user registered for {address}")))?;
    load(stub, &name)
}

/// The registered user behind the current sender.
pub(crate) fn caller<S: Invocation + ?Sized>(stub: &S) -> Result<User> {
    let address = stub.sender()?;
    load_by_address(stub, &address)
}

pub(crate) fn save<S: RecordStore + ?Sized>(stub: &mut S, user: &User) -> Result<()> {
    put_json(stub, &user_key(&user.name), user)
}
