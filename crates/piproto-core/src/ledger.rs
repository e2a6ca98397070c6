use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Amount, TimestampMs};

// ── EntryId ──────────────────────────────────────────────────────────────────

/// 32-byte ledger entry identifier:
/// BLAKE3(user_id || entry_seq || kind || timestamp).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub [u8; 32]);

impl EntryId {
    pub fn derive(user_id: &str, seq: u64, kind: EntryKind, timestamp: TimestampMs) -> Self {
        let mut h = blake3::Hasher::new();
        h.update(user_id.as_bytes());
        h.update(&seq.to_le_bytes());
        h.update(&[kind as u8]);
        h.update(&timestamp.to_le_bytes());
        Self(*h.finalize().as_bytes())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({}…)", &self.to_hex()[..16])
    }
}

// ── EntryKind ────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Coins credited (mining session, manual mining, task reward).
    Earn = 0,
    /// One denomination converted into another.
    Swap = 1,
    /// Advisory withdrawal request; balances are not moved.
    Withdraw = 2,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Earn => "earn",
            EntryKind::Swap => "swap",
            EntryKind::Withdraw => "withdraw",
        }
    }
}

// ── LedgerEntry ──────────────────────────────────────────────────────────────

/// Immutable audit record of one balance-changing event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Position in the owner's ledger, counting from 0.
    pub seq: u64,
    pub id: EntryId,
    pub kind: EntryKind,
    pub amount: Amount,
    pub note: String,
    pub timestamp: TimestampMs,
}
