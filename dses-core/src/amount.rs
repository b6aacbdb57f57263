// src/amount.rs
//! Exact, non-negative, arbitrary-precision quantities (prices, call-time units,
//! token amounts).
//!
//! Stored as decimal strings so records stay readable and no JSON number
//! precision is lost.

use std::fmt;
use std::ops::{Add, Mul};
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigUint);

impl Amount {
    pub fn zero() -> Self {
        Amount(BigUint::zero())
    }

    /// Parse a base-10 integer argument. `what` names the argument in the error.
    pub fn parse(raw: &str, what: &str) -> Result<Self> {
        let s = raw.trim();
        let digits = s.strip_prefix('+').unwrap_or(s);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LedgerError::invalid(format!(
                "{what} must be a non-negative integer, got {raw:?}"
            )));
        }
        BigUint::from_str(digits)
            .map(Amount)
            .map_err(|e| LedgerError::invalid(format!("{what}: {e}")))
    }

    /// Like [`Amount::parse`] but rejects zero.
    pub fn parse_positive(raw: &str, what: &str) -> Result<Self> {
        let a = Self::parse(raw, what)?;
        if a.is_zero() {
            return Err(LedgerError::invalid(format!("{what} must be positive")));
        }
        Ok(a)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `None` when `rhs > self`; balances never go negative.
    pub fn checked_sub(&self, rhs: &Amount) -> Option<Amount> {
        if rhs.0 > self.0 {
            None
        } else {
            Some(Amount(&self.0 - &rhs.0))
        }
    }

    /// Lossy view used only for the contribution score.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::INFINITY)
    }
}

impl From<u64> for Amount {
    fn from(v: u64) -> Self {
        Amount(BigUint::from(v))
    }
}

impl<'a> Add<&'a Amount> for &'a Amount {
    type Output = Amount;
    fn add(self, rhs: &'a Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl<'a> Mul<&'a Amount> for &'a Amount {
    type Output = Amount;
    fn mul(self, rhs: &'a Amount) -> Amount {
        Amount(&self.0 * &rhs.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_str_radix(10))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Amount::parse(&s, "amount").map_err(serde::de::Error::custom)
    }
}
