// src/services/mashup.rs
//! Mashups: services composed from existing ones. Every distinct developer of
//! a referenced service is paid the configured incentive, once, before the
//! mashup is written.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::amount::Amount;
use crate::config::EconomyPolicy;
use crate::error::{LedgerError, Result};
use crate::ledger::Invocation;
use crate::services::{catalog, identity};
use crate::types::{Service, ServiceStatus};

#[derive(Debug, Clone)]
pub struct NewMashup<'a> {
    pub name: &'a str,
    pub service_type: &'a str,
    pub description: &'a str,
    pub developer: &'a str,
    pub price: &'a str,
}

pub fn create<S: Invocation + ?Sized>(
    stub: &mut S,
    policy: &EconomyPolicy,
    req: NewMashup<'_>,
    refs: &[&str],
) -> Result<Service> {
    if req.name.is_empty() {
        return Err(LedgerError::invalid("mashup name must not be empty"));
    }
    let mut developer = catalog::authorize(stub, req.developer)?;
    catalog::ensure_unique(stub, req.name)?;
    if refs.is_empty() {
        return Err(LedgerError::invalid(
            "a mashup must reference at least one service",
        ));
    }
    let price = Amount::parse(req.price, "price")?;

    let mut composition = BTreeMap::new();
    let mut upstream = BTreeSet::new();
    for &name in refs {
        let service = catalog::load(stub, name)?;
        composition.insert(service.name, 1u8);
        upstream.insert(service.developer);
    }

    // Pay out first: a failed transfer must leave no mashup behind.
    for dev_name in &upstream {
        let dev = identity::load(stub, dev_name)?;
        stub.transfer(&dev.address, &policy.fee_token, &policy.incentive_amount)?;
        info!(
            mashup = %req.name,
            developer = %dev.name,
            amount = %policy.incentive_amount,
            token = %policy.fee_token,
            "incentive paid"
        );
    }

    let now = stub.tx_timestamp()?;
    let mashup = Service {
        name: req.name.to_string(),
        service_type: req.service_type.to_string(),
        developer: developer.name.clone(),
        description: req.description.to_string(),
        resource: String::new(),
        price,
        created_time: now,
        updated_time: now,
        status: ServiceStatus::Created,
        is_mashup: true,
        composition,
    };
    catalog::save(stub, &mashup)?;
    developer.total_service += 1;
    identity::save(stub, &developer)?;
    info!(
        mashup = %mashup.name,
        developer = %developer.name,
        refs = mashup.composition.len(),
        payouts = upstream.len(),
        "mashup created"
    );
    Ok(mashup)
}
