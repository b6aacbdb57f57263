// src/services/index.rs
//! Composite-key projections used for enumeration.
//!
//! Entries hold only the primary key of the record they point at; listing
//! fetches the primary record. Pagination is a linear walk in key order.

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{LedgerError, Result};
use crate::ledger::keys::{service_key, split_composite, CALL_TIME_KEY, USER_SERVICES_KEY};
use crate::ledger::{get_json, put_json, KeyValue, RecordStore};
use crate::types::{CallTimeAccount, Service};

/// Normalized pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    /// `page <= 0` becomes 1; `size == 0` falls back to `default_size`.
    pub fn normalize(page: i64, size: i64, default_size: u64) -> Result<Self> {
        if size < 0 {
            return Err(LedgerError::invalid(format!(
                "page size must not be negative, got {size}"
            )));
        }
        let page = page.max(1) as u64;
        let size = if size == 0 { default_size } else { size as u64 };
        let offset = (page - 1).saturating_mul(size);
        Ok(Page {
            offset: usize::try_from(offset).unwrap_or(usize::MAX),
            limit: usize::try_from(size).unwrap_or(usize::MAX),
        })
    }

    pub fn parse(page: &str, size: &str, default_size: u64) -> Result<Self> {
        let page: i64 = page
            .parse()
            .map_err(|_| LedgerError::invalid(format!("page must be an integer, got {page:?}")))?;
        let size: i64 = size
            .parse()
            .map_err(|_| LedgerError::invalid(format!("size must be an integer, got {size:?}")))?;
        Self::normalize(page, size, default_size)
    }
}

/// Point `userServicesKey[developer, service]` at the service record.
pub fn link_service<S: RecordStore + ?Sized>(stub: &mut S, service: &Service) -> Result<()> {
    let key = stub.create_composite_key(
        USER_SERVICES_KEY,
        &[service.developer.as_str(), service.name.as_str()],
    )?;
    put_json(stub, &key, &service_key(&service.name))
}

/// Point `callTimeKey[service, user]` at the call-time account.
pub fn link_account<S: RecordStore + ?Sized>(
    stub: &mut S,
    account: &CallTimeAccount,
    account_key: &str,
) -> Result<()> {
    let key = stub.create_composite_key(
        CALL_TIME_KEY,
        &[account.service_name.as_str(), account.user_name.as_str()],
    )?;
    put_json(stub, &key, &account_key)
}

pub fn list_services_by_user<S: RecordStore + ?Sized>(
    stub: &S,
    user: &str,
    page: Page,
) -> Result<Vec<Service>> {
    let entries = stub.state_by_partial_composite_key(USER_SERVICES_KEY, &[user])?;
    resolve(stub, entries, Some(page))
}

/// Every indexed service across all developers.
pub fn list_all_services<S: RecordStore + ?Sized>(stub: &S, page: Page) -> Result<Vec<Service>> {
    let entries = stub.state_by_partial_composite_key(USER_SERVICES_KEY, &[])?;
    resolve(stub, entries, Some(page))
}

/// Unbounded: every account held against `service`.
pub fn list_accounts_for_service<S: RecordStore + ?Sized>(
    stub: &S,
    service: &str,
) -> Result<Vec<CallTimeAccount>> {
    let entries = stub.state_by_partial_composite_key(CALL_TIME_KEY, &[service])?;
    resolve(stub, entries, None)
}

fn resolve<T, S>(stub: &S, entries: Vec<KeyValue>, page: Option<Page>) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    S: RecordStore + ?Sized,
{
    let (mut skip, limit) = match page {
        Some(p) => (p.offset, p.limit),
        None => (0, usize::MAX),
    };
    let mut out = Vec::new();
    for (index_key, value) in entries {
        if out.len() >= limit {
            break;
        }
        let primary: String = serde_json::from_slice(&value)?;
        let Some(record) = get_json::<T, _>(stub, &primary)? else {
            let index = match split_composite(&index_key) {
                Some((ns, segs)) => format!("{ns}[{}]", segs.join(", ")),
                None => index_key.clone(),
            };
            warn!(
                %index,
                %primary,
                "index entry points at a missing record; skipped"
            );
            continue;
        };
        if skip > 0 {
            skip -= 1;
            continue;
        }
        out.push(record);
    }
    Ok(out)
}
