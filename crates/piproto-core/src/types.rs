use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{DIRECT_INVITER, MAX_USER_ID_CHARS, MICROS_PER_UNIT};
use crate::error::PiprotoError;

/// Unix timestamp in milliseconds (UTC).
pub type TimestampMs = i64;

/// Current wall-clock time in milliseconds.
pub fn now_ms() -> TimestampMs {
    chrono::Utc::now().timestamp_millis()
}

/// Validate an opaque identifier (user id, inviter code, task id).
/// Must be non-empty after trimming, bounded, and free of control characters.
pub fn validate_id<'a>(field: &'static str, id: &'a str) -> Result<&'a str, PiprotoError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(PiprotoError::MissingField(field));
    }
    if id.chars().count() > MAX_USER_ID_CHARS || id.chars().any(char::is_control) {
        return Err(PiprotoError::Validation(format!("invalid {field}")));
    }
    Ok(id)
}

/// [`validate_id`] for an account holder. The inviter sentinel names no
/// account and can never become one.
pub fn validate_user_id(id: &str) -> Result<&str, PiprotoError> {
    let id = validate_id("userId", id)?;
    if id == DIRECT_INVITER {
        return Err(PiprotoError::Validation(format!("{DIRECT_INVITER:?} is a reserved user id")));
    }
    Ok(id)
}

// ── Amount ───────────────────────────────────────────────────────────────────

/// Non-negative fixed-point quantity of any denomination, stored in micros
/// (1 unit = 1_000_000 micros). Negative values are unrepresentable, so a
/// debit that would go below zero surfaces as a failed `checked_sub`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub const fn micros(&self) -> u64 {
        self.0
    }

    /// Whole units. Panics on overflow; test and constant helper only.
    pub const fn units(units: u64) -> Self {
        Self(units * MICROS_PER_UNIT)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Convert a decimal value, rounding to the nearest micro.
    pub fn from_f64(value: f64) -> Result<Self, PiprotoError> {
        if !value.is_finite() {
            return Err(PiprotoError::InvalidAmount(format!("{value} is not a finite number")));
        }
        if value < 0.0 {
            return Err(PiprotoError::InvalidAmount(format!("{value} is negative")));
        }
        let micros = (value * MICROS_PER_UNIT as f64).round();
        if micros > u64::MAX as f64 {
            return Err(PiprotoError::InvalidAmount(format!("{value} is too large")));
        }
        Ok(Self(micros as u64))
    }

    /// Parse a decimal string such as `"2.5"`.
    pub fn parse_str(s: &str) -> Result<Self, PiprotoError> {
        let trimmed = s.trim();
        let value: f64 = trimmed
            .parse()
            .map_err(|_| PiprotoError::InvalidAmount(format!("{s:?} is not numeric")))?;
        Self::from_f64(value)
    }

    /// Accept a JSON number or a numeric string.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, PiprotoError> {
        match value {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => Self::from_f64(f),
                None => Err(PiprotoError::InvalidAmount(n.to_string())),
            },
            serde_json::Value::String(s) => Self::parse_str(s),
            other => Err(PiprotoError::InvalidAmount(format!("{other} is not numeric"))),
        }
    }

    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / MICROS_PER_UNIT as f64
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    /// `self / rate`, where `rate` is the price of one target unit in source units.
    pub fn checked_div_rate(self, rate: Amount) -> Option<Amount> {
        if rate.0 == 0 {
            return None;
        }
        let micros = self.0 as u128 * MICROS_PER_UNIT as u128 / rate.0 as u128;
        u64::try_from(micros).ok().map(Amount)
    }

    /// Render with exactly two decimals, rounding half up.
    pub fn to_fixed2(&self) -> String {
        let cents = (self.0 as u128 + 5_000) / 10_000;
        format!("{}.{:02}", cents / 100, cents % 100)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / MICROS_PER_UNIT;
        let frac = self.0 % MICROS_PER_UNIT;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{frac:06}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({self})")
    }
}

// ── Asset ────────────────────────────────────────────────────────────────────

/// The three denominations an account holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    Coins,
    Pi,
    Usdt,
}

impl Asset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Asset::Coins => "coins",
            Asset::Pi => "pi",
            Asset::Usdt => "usdt",
        }
    }

    /// Ticker used in human-readable ledger notes.
    pub fn ticker(&self) -> &'static str {
        match self {
            Asset::Coins => "COINS",
            Asset::Pi => "PI",
            Asset::Usdt => "USDT",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Asset {
    type Err = PiprotoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coins" | "coin" => Ok(Asset::Coins),
            "pi" => Ok(Asset::Pi),
            "usdt" => Ok(Asset::Usdt),
            _ => Err(PiprotoError::UnsupportedAsset(s.to_string())),
        }
    }
}
