use thiserror::Error;

use crate::types::{Amount, Asset};

#[derive(Debug, Error)]
pub enum PiprotoError {
    // ── Request validation ───────────────────────────────────────────────────
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("unsupported asset: {0}")]
    UnsupportedAsset(String),

    #[error("unsupported conversion: {from} → {to}")]
    UnsupportedConversion { from: Asset, to: Asset },

    // ── Ledger errors ────────────────────────────────────────────────────────
    #[error("not enough {asset}: need {need}, have {have}")]
    InsufficientBalance { asset: Asset, need: Amount, have: Amount },

    #[error("cooldown active: {remaining_ms} ms remaining")]
    CooldownActive { remaining_ms: i64 },

    #[error("balance overflow on {0}")]
    BalanceOverflow(Asset),

    // ── Referral errors ──────────────────────────────────────────────────────
    #[error("cannot refer yourself")]
    SelfReferral,

    #[error("inviter not found: {0}")]
    InviterNotFound(String),

    #[error("referral not found for user: {0}")]
    ReferralNotFound(String),

    // ── Lookup ───────────────────────────────────────────────────────────────
    #[error("user not found: {0}")]
    UnknownAccount(String),

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl PiprotoError {
    /// True for failures caused by the caller rather than the backend.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            PiprotoError::Serialization(_) | PiprotoError::Storage(_)
        )
    }
}
