// src/commands/api.rs
use serde::Serialize;
use tracing::debug;

use crate::config::EconomyPolicy;
use crate::error::{LedgerError, Result};
use crate::ledger::Invocation;
use crate::services::{
    calltime, catalog, identity, index, mashup, reward, NewMashup, NewService, Page, ServiceEdit,
};

/// Function names accepted by [`Commands::invoke`].
pub mod function {
    pub const REGISTER_USER: &str = "registerUser";
    pub const REMOVE_USER: &str = "removeUser";
    pub const QUERY_USER: &str = "queryUser";
    pub const REGISTER_SERVICE: &str = "registerService";
    pub const INVALIDATE_SERVICE: &str = "invalidateService";
    pub const PUBLISH_SERVICE: &str = "publishService";
    pub const QUERY_SERVICE: &str = "queryService";
    pub const EDIT_SERVICE: &str = "editService";
    pub const CREATE_MASHUP: &str = "createMashup";
    pub const QUERY_SERVICE_BY_RANGE: &str = "queryServiceByRange";
    pub const QUERY_SERVICE_BY_USER: &str = "queryServiceByUser";
    pub const REWARD_SERVICE: &str = "rewardService";
    pub const CALL_SERVICE: &str = "callService";
    pub const GET_CALL_TIME: &str = "getCallTime";
    pub const GET_CALL_TIMES: &str = "getCallTimes";
    pub const REDUCE_CALL_TIME: &str = "reduceCallTime";

    pub const ALL: &[&str] = &[
        REGISTER_USER,
        REMOVE_USER,
        QUERY_USER,
        REGISTER_SERVICE,
        INVALIDATE_SERVICE,
        PUBLISH_SERVICE,
        QUERY_SERVICE,
        EDIT_SERVICE,
        CREATE_MASHUP,
        QUERY_SERVICE_BY_RANGE,
        QUERY_SERVICE_BY_USER,
        REWARD_SERVICE,
        CALL_SERVICE,
        GET_CALL_TIME,
        GET_CALL_TIMES,
        REDUCE_CALL_TIME,
    ];
}

/// Leading fixed arguments of `createMashup`; referenced services follow.
const MASHUP_FIXED_ARGS: usize = 5;

#[derive(Debug, Clone, Copy)]
enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

fn arity(function: &str) -> Option<Arity> {
    use function::*;
    let a = match function {
        REMOVE_USER | QUERY_USER | INVALIDATE_SERVICE | PUBLISH_SERVICE | QUERY_SERVICE
        | GET_CALL_TIMES => Arity::Exactly(1),
        REGISTER_USER | QUERY_SERVICE_BY_RANGE | CALL_SERVICE | GET_CALL_TIME => Arity::Exactly(2),
        QUERY_SERVICE_BY_USER | REWARD_SERVICE | REDUCE_CALL_TIME => Arity::Exactly(3),
        EDIT_SERVICE => Arity::Exactly(5),
        REGISTER_SERVICE => Arity::Exactly(6),
        CREATE_MASHUP => Arity::AtLeast(MASHUP_FIXED_ARGS + 1),
        _ => return None,
    };
    Some(a)
}

/// Command front door: one function name plus positional string arguments,
/// run against a single host invocation.
pub struct Commands {
    policy: EconomyPolicy,
}

impl Default for Commands {
    fn default() -> Self {
        Self::new(EconomyPolicy::default())
    }
}

impl Commands {
    pub fn new(policy: EconomyPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &EconomyPolicy {
        &self.policy
    }

    /// Dispatch `function` with `args`. Returns the JSON encoding of the
    /// affected record(s), or a short confirmation message.
    ///
    /// Any error leaves the invocation to be discarded by the host.
    pub fn invoke<S: Invocation + ?Sized>(
        &self,
        stub: &mut S,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        let expected = arity(function).ok_or_else(|| {
            LedgerError::invalid(format!("unknown function {function:?}"))
        })?;
        let ok = match expected {
            Arity::Exactly(n) => args.len() == n,
            Arity::AtLeast(n) => args.len() >= n,
        };
        if !ok {
            let want = match expected {
                Arity::Exactly(n) => format!("{n}"),
                Arity::AtLeast(n) => format!("at least {n}"),
            };
            return Err(LedgerError::invalid(format!(
                "{function} expects {want} arguments, got {}",
                args.len()
            )));
        }
        let a: Vec<&str> = args.iter().map(|s| s.trim()).collect();
        debug!(%function, args = a.len(), "dispatching");

        use function::*;
        match function {
            REGISTER_USER => json(&identity::register(stub, &self.policy, a[0], a[1])?),
            REMOVE_USER => {
                identity::remove(stub, a[0])?;
                Ok(format!("user {} removed", a[0]).into_bytes())
            }
            QUERY_USER => json(&identity::query(stub, &self.policy, a[0])?),
            REGISTER_SERVICE => json(&catalog::register(
                stub,
                NewService {
                    name: a[0],
                    service_type: a[1],
                    description: a[2],
                    developer: a[3],
                    resource: a[4],
                    price: a[5],
                },
            )?),
            INVALIDATE_SERVICE => json(&catalog::invalidate(stub, a[0])?),
            PUBLISH_SERVICE => json(&catalog::publish(stub, a[0])?),
            QUERY_SERVICE => json(&catalog::query(stub, a[0])?),
            EDIT_SERVICE => json(&catalog::edit(
                stub,
                a[0],
                ServiceEdit {
                    service_type: a[1],
                    description: a[2],
                    resource: a[3],
                    price: a[4],
                },
            )?),
            CREATE_MASHUP => json(&mashup::create(
                stub,
                &self.policy,
                NewMashup {
                    name: a[0],
                    service_type: a[1],
                    description: a[2],
                    developer: a[3],
                    price: a[4],
                },
                &a[MASHUP_FIXED_ARGS..],
            )?),
            QUERY_SERVICE_BY_RANGE => {
                let page = Page::parse(a[0], a[1], self.policy.default_page_size)?;
                json(&index::list_all_services(stub, page)?)
            }
            QUERY_SERVICE_BY_USER => {
                let page = Page::parse(a[0], a[1], self.policy.default_page_size)?;
                json(&index::list_services_by_user(stub, a[2], page)?)
            }
            REWARD_SERVICE => json(&reward::reward(stub, a[0], a[1], a[2])?),
            CALL_SERVICE => json(&calltime::purchase(stub, &self.policy, a[0], a[1])?),
            GET_CALL_TIME => json(&calltime::get_account(stub, a[0], a[1])?),
            GET_CALL_TIMES => json(&calltime::list_accounts(stub, a[0])?),
            REDUCE_CALL_TIME => json(&calltime::reduce(stub, a[0], a[1], a[2])?),
            _ => Err(LedgerError::invalid(format!("unknown function {function:?}"))),
        }
    }
}

fn json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}
