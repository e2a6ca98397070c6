use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use piproto_core::account::Account;
use piproto_core::error::PiprotoError;
use piproto_core::ledger::LedgerEntry;
use piproto_core::referral::ReferralEdge;
use piproto_core::types::TimestampMs;

/// Storage seam for the engines. Implementations only need to persist whole
/// records; engines do their own read-modify-write under per-key locks.
pub trait StateStore: Send + Sync {
    // ── Accounts ─────────────────────────────────────────────────────────────

    fn get_account(&self, user_id: &str) -> Result<Option<Account>, PiprotoError>;

    fn put_account(&self, account: &Account) -> Result<(), PiprotoError>;

    fn account_exists(&self, user_id: &str) -> Result<bool, PiprotoError> {
        Ok(self.get_account(user_id)?.is_some())
    }

    /// Load an account, creating a zero-balance record on first access.
    /// The new record is not persisted until the caller saves it.
    fn get_or_create(&self, user_id: &str, now: TimestampMs) -> Result<Account, PiprotoError> {
        Ok(self
            .get_account(user_id)?
            .unwrap_or_else(|| Account::new(user_id, now)))
    }

    // ── Ledger ───────────────────────────────────────────────────────────────

    /// Store `entry` at (`user_id`, `entry.seq`), replacing whatever is there.
    fn put_entry(&self, user_id: &str, entry: &LedgerEntry) -> Result<(), PiprotoError>;

    /// Every stored entry for `user_id`, newest first.
    fn entries(&self, user_id: &str) -> Result<Vec<LedgerEntry>, PiprotoError>;

    // ── Referral edges ───────────────────────────────────────────────────────

    /// Edge keyed by invitee (at most one per invitee).
    fn get_referral(&self, invitee_id: &str) -> Result<Option<ReferralEdge>, PiprotoError>;

    /// Insert or overwrite an edge and index it under its inviter.
    fn put_referral(&self, edge: &ReferralEdge) -> Result<(), PiprotoError>;

    /// All edges whose inviter is `inviter_id`, in no particular order.
    fn referrals_by_inviter(&self, inviter_id: &str) -> Result<Vec<ReferralEdge>, PiprotoError>;

    /// Flush pending writes to durable storage, if any.
    fn flush(&self) -> Result<(), PiprotoError> {
        Ok(())
    }
}

// ── MemoryStore ───────────────────────────────────────────────────────────────

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<String, Account>>,
    ledger: RwLock<HashMap<String, BTreeMap<u64, LedgerEntry>>>,
    referrals: RwLock<HashMap<String, ReferralEdge>>,
    by_inviter: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> PiprotoError {
    PiprotoError::Storage("memory store lock poisoned".into())
}

impl StateStore for MemoryStore {
    fn get_account(&self, user_id: &str) -> Result<Option<Account>, PiprotoError> {
        Ok(self.accounts.read().map_err(poisoned)?.get(user_id).cloned())
    }

    fn put_account(&self, account: &Account) -> Result<(), PiprotoError> {
        self.accounts
            .write()
            .map_err(poisoned)?
            .insert(account.user_id.clone(), account.clone());
        Ok(())
    }

    fn account_exists(&self, user_id: &str) -> Result<bool, PiprotoError> {
        Ok(self.accounts.read().map_err(poisoned)?.contains_key(user_id))
    }

    fn put_entry(&self, user_id: &str, entry: &LedgerEntry) -> Result<(), PiprotoError> {
        self.ledger
            .write()
            .map_err(poisoned)?
            .entry(user_id.to_string())
            .or_default()
            .insert(entry.seq, entry.clone());
        Ok(())
    }

    fn entries(&self, user_id: &str) -> Result<Vec<LedgerEntry>, PiprotoError> {
        let ledger = self.ledger.read().map_err(poisoned)?;
        Ok(ledger
            .get(user_id)
            .map(|entries| entries.values().rev().cloned().collect())
            .unwrap_or_default())
    }

    fn get_referral(&self, invitee_id: &str) -> Result<Option<ReferralEdge>, PiprotoError> {
        Ok(self.referrals.read().map_err(poisoned)?.get(invitee_id).cloned())
    }

    fn put_referral(&self, edge: &ReferralEdge) -> Result<(), PiprotoError> {
        self.referrals
            .write()
            .map_err(poisoned)?
            .insert(edge.invitee_id.clone(), edge.clone());
        self.by_inviter
            .write()
            .map_err(poisoned)?
            .entry(edge.inviter_id.clone())
            .or_default()
            .insert(edge.invitee_id.clone());
        Ok(())
    }

    fn referrals_by_inviter(&self, inviter_id: &str) -> Result<Vec<ReferralEdge>, PiprotoError> {
        let index = self.by_inviter.read().map_err(poisoned)?;
        let Some(invitees) = index.get(inviter_id) else {
            return Ok(Vec::new());
        };
        let referrals = self.referrals.read().map_err(poisoned)?;
        Ok(invitees
            .iter()
            .filter_map(|id| referrals.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_does_not_persist() {
        let store = MemoryStore::new();
        let acc = store.get_or_create("u1", 5).unwrap();
        assert_eq!(acc.joined_at, 5);
        assert!(!store.account_exists("u1").unwrap());
        store.put_account(&acc).unwrap();
        assert!(store.account_exists("u1").unwrap());
    }

    #[test]
    fn ledger_is_per_user_and_newest_first() {
        use piproto_core::ledger::EntryKind;
        use piproto_core::types::Amount;

        let store = MemoryStore::new();
        let mut acc = Account::new("u1", 0);
        for i in 0..3 {
            let entry = acc.push_entry(EntryKind::Earn, Amount::units(1), format!("e{i}"), i);
            store.put_entry("u1", entry).unwrap();
        }
        let notes: Vec<_> = store.entries("u1").unwrap().into_iter().map(|e| e.note).collect();
        assert_eq!(notes, vec!["e2", "e1", "e0"]);
        assert!(store.entries("u2").unwrap().is_empty());
    }

    #[test]
    fn referrals_indexed_by_inviter() {
        let store = MemoryStore::new();
        store.put_referral(&ReferralEdge::new("a", "b", 1)).unwrap();
        store.put_referral(&ReferralEdge::new("a", "c", 2)).unwrap();
        store.put_referral(&ReferralEdge::new("x", "y", 3)).unwrap();
        let mut ids: Vec<_> = store
            .referrals_by_inviter("a")
            .unwrap()
            .into_iter()
            .map(|e| e.invitee_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["b", "c"]);
        assert!(store.referrals_by_inviter("nobody").unwrap().is_empty());
    }
}
