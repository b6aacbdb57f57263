// src/services/catalog.rs
//! Service records and their lifecycle: created -> available -> invalid.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::amount::Amount;
use crate::error::{LedgerError, Result};
use crate::ledger::keys::service_key;
use crate::ledger::{get_json, put_json, Invocation, RecordStore};
use crate::services::{identity, index};
use crate::types::{Service, ServiceStatus, User};

/// Caller-supplied fields of a new plain service.
#[derive(Debug, Clone)]
pub struct NewService<'a> {
    pub name: &'a str,
    pub service_type: &'a str,
    pub description: &'a str,
    pub developer: &'a str,
    pub resource: &'a str,
    pub price: &'a str,
}

/// Fields `edit` may replace.
#[derive(Debug, Clone)]
pub struct ServiceEdit<'a> {
    pub service_type: &'a str,
    pub description: &'a str,
    pub resource: &'a str,
    pub price: &'a str,
}

pub fn register<S: Invocation + ?Sized>(stub: &mut S, req: NewService<'_>) -> Result<Service> {
    if req.name.is_empty() {
        return Err(LedgerError::invalid("service name must not be empty"));
    }
    let mut developer = authorize(stub, req.developer)?;
    ensure_unique(stub, req.name)?;
    let price = Amount::parse(req.price, "price")?;

    let now = stub.tx_timestamp()?;
    let service = Service {
        name: req.name.to_string(),
        service_type: req.service_type.to_string(),
        developer: developer.name.clone(),
        description: req.description.to_string(),
        resource: req.resource.to_string(),
        price,
        created_time: now,
        updated_time: now,
        status: ServiceStatus::Created,
        is_mashup: false,
        composition: BTreeMap::new(),
    };
    save(stub, &service)?;
    developer.total_service += 1;
    identity::save(stub, &developer)?;
    info!(service = %service.name, developer = %developer.name, price = %service.price, "service registered");
    Ok(service)
}

pub fn edit<S: Invocation + ?Sized>(
    stub: &mut S,
    name: &str,
    changes: ServiceEdit<'_>,
) -> Result<Service> {
    let mut service = load(stub, name)?;
    authorize(stub, &service.developer)?;
    let price = Amount::parse(changes.price, "price")?;

    service.service_type = changes.service_type.to_string();
    service.description = changes.description.to_string();
    service.resource = changes.resource.to_string();
    service.price = price;
    service.updated_time = stub.tx_timestamp()?;
    save(stub, &service)?;
    info!(service = %name, "service edited");
    Ok(service)
}

pub fn publish<S: Invocation + ?Sized>(stub: &mut S, name: &str) -> Result<Service> {
    let mut service = load(stub, name)?;
    authorize(stub, &service.developer)?;
    if service.status != ServiceStatus::Created {
        return Err(LedgerError::InvalidState(format!(
            "service {name} is {}, only created services can be published",
            service.status.as_str()
        )));
    }
    service.status = ServiceStatus::Available;
    save(stub, &service)?;
    info!(service = %name, "service published");
    Ok(service)
}

pub fn invalidate<S: Invocation + ?Sized>(stub: &mut S, name: &str) -> Result<Service> {
    let mut service = load(stub, name)?;
    authorize(stub, &service.developer)?;
    if service.status == ServiceStatus::Invalid {
        return Err(LedgerError::InvalidState(format!(
            "service {name} is already invalid"
        )));
    }
    service.status = ServiceStatus::Invalid;
    save(stub, &service)?;
    info!(service = %name, "service invalidated");
    Ok(service)
}

pub fn query<S: RecordStore + ?Sized>(stub: &S, name: &str) -> Result<Service> {
    let service = load(stub, name)?;
    debug!(service = %name, status = service.status.as_str(), "service queried");
    Ok(service)
}

/// Resolve `developer` and require the sender to be its bound address.
pub(crate) fn authorize<S: Invocation + ?Sized>(stub: &S, developer: &str) -> Result<User> {
    let user = identity::load(stub, developer)?;
    let sender = stub.sender()?;
    if user.address != sender {
        return Err(LedgerError::unauthorized(format!(
            "{sender} may not act for developer {developer}"
        )));
    }
    Ok(user)
}

pub(crate) fn ensure_unique<S: RecordStore + ?Sized>(stub: &S, name: &str) -> Result<()> {
    if stub.get_state(&service_key(name))?.is_some() {
        return Err(LedgerError::AlreadyExists(format!("service {name}")));
    }
    Ok(())
}

pub(crate) fn load<S: RecordStore + ?Sized>(stub: &S, name: &str) -> Result<Service> {
    get_json(stub, &service_key(name))?
        .ok_or_else(|| LedgerError::not_found(format!("service {name}")))
}

/// Primary record and its `userServicesKey` entry, always together.
pub(crate) fn save<S: RecordStore + ?Sized>(stub: &mut S, service: &Service) -> Result<()> {
    put_json(stub, &service_key(&service.name), service)?;
    index::link_service(stub, service)
}
