use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::Amount;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub introduction: String,
    /// The one address this name is bound to; incentives and fees land here.
    pub address: String,
    /// Derived; recomputed on every read.
    pub contribution: f64,
    pub total_service: u64,
    /// Call-time units this user has purchased.
    pub total_call_times: Amount,
    /// Call-time units reduced (consumed) by this user as a developer.
    pub total_invoke_times: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Created,
    Available,
    Invalid,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Created => "created",
            ServiceStatus::Available => "available",
            ServiceStatus::Invalid => "invalid",
        }
    }
}

/// A plain service or, with `is_mashup`, a composition of other services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    /// User name (not address) of the developer.
    pub developer: String,
    pub description: String,
    /// Endpoint locator; empty for mashups.
    pub resource: String,
    pub price: Amount,
    pub created_time: DateTime<Utc>,
    pub updated_time: DateTime<Utc>,
    pub status: ServiceStatus,
    pub is_mashup: bool,
    /// For mashups: referenced service name -> 1. Always empty for plain services.
    #[serde(default)]
    pub composition: BTreeMap<String, u8>,
}

/// Prepaid call-time held by one user for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTimeAccount {
    pub service_name: String,
    pub user_name: String,
    pub user_address: String,
    /// Remaining units.
    pub call_times: Amount,
    /// Cumulative amount paid (price x units, summed over purchases).
    pub total: Amount,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyRecord {
    pub service_call_time_key: String,
    pub service_name: String,
    pub user_name: String,
    pub call_time: Amount,
    pub total: Amount,
    pub create_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceRecord {
    pub service_name: String,
    pub service_call_time_key: String,
    /// Developer who performed the reduction.
    pub user_name: String,
    pub reduce_time: Amount,
    pub create_time: DateTime<Utc>,
}
