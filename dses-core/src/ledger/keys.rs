// src/ledger/keys.rs
//! Key layout: fixed ASCII prefixes joined with semantic segments.

use chrono::{DateTime, Utc};

use crate::error::{LedgerError, Result};
use crate::ledger::COMPOSITE_SEP;

pub const USER_PREFIX: &str = "USER_";
/// Address index: address -> user name. Must not share a prefix with `USER_`.
pub const USER_ADDRESS_PREFIX: &str = "ADDR_";
pub const SERVICE_PREFIX: &str = "SER_";
pub const CALL_TIMES_PREFIX: &str = "CALL_TIMES_";
pub const BUY_RECORD_PREFIX: &str = "BUY_";
pub const REDUCE_RECORD_PREFIX: &str = "REDUCE_";

/// Composite namespace: (user, service) -> service key.
pub const USER_SERVICES_KEY: &str = "userServicesKey";
/// Composite namespace: (service, user) -> call-time account key.
pub const CALL_TIME_KEY: &str = "callTimeKey";

pub fn composite(namespace: &str, segments: &[&str]) -> Result<String> {
    let mut key = String::with_capacity(
        namespace.len() + segments.iter().map(|s| s.len() + 1).sum::<usize>() + 1,
    );
    push_segment(&mut key, namespace)?;
    for seg in segments {
        push_segment(&mut key, seg)?;
    }
    Ok(key)
}

fn push_segment(key: &mut String, seg: &str) -> Result<()> {
    if seg.contains(COMPOSITE_SEP) {
        return Err(LedgerError::invalid(format!(
            "key segment {seg:?} contains a reserved separator"
        )));
    }
    key.push_str(seg);
    key.push(COMPOSITE_SEP);
    Ok(())
}

/// Split a composite key back into `(namespace, segments)`.
pub fn split_composite(key: &str) -> Option<(&str, Vec<&str>)> {
    let body = key.strip_suffix(COMPOSITE_SEP)?;
    let mut parts = body.split(COMPOSITE_SEP);
    let ns = parts.next()?;
    Some((ns, parts.collect()))
}

pub fn user_key(name: &str) -> String {
    format!("{USER_PREFIX}{name}")
}

pub fn user_address_key(address: &str) -> String {
    format!("{USER_ADDRESS_PREFIX}{address}")
}

pub fn service_key(name: &str) -> String {
    format!("{SERVICE_PREFIX}{name}")
}

pub fn call_time_key(service: &str, user: &str) -> Result<String> {
    composite(CALL_TIMES_PREFIX, &[service, user])
}

/// `seq` disambiguates several records written in the same second; the first
/// record of a second uses the bare seconds value.
pub fn buy_record_key(service: &str, user: &str, ts: &DateTime<Utc>, seq: u32) -> Result<String> {
    composite(BUY_RECORD_PREFIX, &[service, user, stamp(ts, seq).as_str()])
}

pub fn reduce_record_key(
    service: &str,
    user: &str,
    ts: &DateTime<Utc>,
    seq: u32,
) -> Result<String> {
    composite(REDUCE_RECORD_PREFIX, &[service, user, stamp(ts, seq).as_str()])
}

fn stamp(ts: &DateTime<Utc>, seq: u32) -> String {
    match seq {
        0 => ts.timestamp().to_string(),
        n => format!("{}-{n}", ts.timestamp()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_keys_are_unambiguous() {
        // Plain concatenation would collide here ("ab"+"c" == "a"+"bc").
        let a = call_time_key("ab", "c").unwrap();
        let b = call_time_key("a", "bc").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn partial_key_is_prefix_of_full_key() {
        let full = composite(USER_SERVICES_KEY, &["alice", "weatherApi"]).unwrap();
        let partial = composite(USER_SERVICES_KEY, &["alice"]).unwrap();
        assert!(full.starts_with(&partial));
        // "alice" must not match "alicia"'s entries.
        let other = composite(USER_SERVICES_KEY, &["alicia", "x"]).unwrap();
        assert!(!other.starts_with(&partial));
    }

    #[test]
    fn split_roundtrips_segments() {
        let key = composite(CALL_TIME_KEY, &["svc", "acct"]).unwrap();
        let (ns, segs) = split_composite(&key).unwrap();
        assert_eq!(ns, CALL_TIME_KEY);
        assert_eq!(segs, vec!["svc", "acct"]);
    }

    #[test]
    fn user_and_address_keys_never_alias() {
        assert_ne!(user_key("ADDR_x"), user_address_key("x"));
        assert!(!user_address_key("x").starts_with(USER_PREFIX));
    }

    #[test]
    fn audit_keys_carry_seconds_and_sequence() {
        let ts = DateTime::parse_from_rfc3339("2018-01-01T00:00:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let first = buy_record_key("svc", "bob", &ts, 0).unwrap();
        let (_, segs) = split_composite(&first).unwrap();
        assert_eq!(segs, vec!["svc", "bob", "1514764805"]);
        let second = reduce_record_key("svc", "bob", &ts, 2).unwrap();
        assert!(second.ends_with("1514764805-2\u{0}"));
    }

    #[test]
    fn separator_in_segment_is_rejected() {
        assert!(composite(USER_SERVICES_KEY, &["bad\u{0}name"]).is_err());
    }
}
