use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::constants::{
    DEFAULT_MINING_RATE_MICROS, MAX_PROFILE_NAME_CHARS, RECENT_TRANSACTIONS_LIMIT,
};
use crate::error::PiprotoError;
use crate::ledger::{EntryId, EntryKind, LedgerEntry};
use crate::types::{Amount, Asset, TimestampMs};

// ── Profile ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
}

/// The only profile fields a client may change. Unset fields are left alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ProfileUpdate {
    pub fn apply(&self, profile: &mut Profile) -> Result<(), PiprotoError> {
        if let Some(first) = &self.first_name {
            profile.first_name = checked_name("first", first)?;
        }
        if let Some(last) = &self.last_name {
            profile.last_name = checked_name("last", last)?;
        }
        Ok(())
    }
}

fn checked_name(field: &str, value: &str) -> Result<String, PiprotoError> {
    let trimmed = value.trim();
    if trimmed.chars().count() > MAX_PROFILE_NAME_CHARS {
        return Err(PiprotoError::Validation(format!(
            "{field} name exceeds {MAX_PROFILE_NAME_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

// ── TaskStatus ────────────────────────────────────────────────────────────────

/// UI-tracking state of a task. Independent of whether its reward was paid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Completed,
}

// ── Account ───────────────────────────────────────────────────────────────────

/// Full per-user state as stored in the account store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    pub coins: Amount,
    pub pi: Amount,
    pub usdt: Amount,
    /// Start of the open timed-mining session, if any.
    pub mining_start: Option<TimestampMs>,
    pub last_manual_mining_at: Option<TimestampMs>,
    /// Inviter code recorded at referral registration. Set once.
    pub referred_by: Option<String>,
    /// Tasks whose reward has been paid.
    pub completed_tasks: BTreeSet<String>,
    pub task_statuses: BTreeMap<String, TaskStatus>,
    /// Most recent ledger entries, newest first. A saved account holds at
    /// most `RECENT_TRANSACTIONS_LIMIT`; the full ledger is kept by the store.
    pub transactions: Vec<LedgerEntry>,
    /// Number of ledger entries ever created for this account. Stored
    /// entries with a `seq` at or past this value were never committed.
    pub entry_seq: u64,
    /// Cached count of referral edges with this user as inviter.
    pub friends_invited: u32,
    /// Cached count of those edges in `active` state.
    pub friends_active: u32,
    pub profile: Profile,
    pub mining_rate: Amount,
    pub joined_at: TimestampMs,
    pub last_active_at: Option<TimestampMs>,
}

impl Account {
    pub fn new(user_id: impl Into<String>, now: TimestampMs) -> Self {
        Self {
            user_id: user_id.into(),
            coins: Amount::ZERO,
            pi: Amount::ZERO,
            usdt: Amount::ZERO,
            mining_start: None,
            last_manual_mining_at: None,
            referred_by: None,
            completed_tasks: BTreeSet::new(),
            task_statuses: BTreeMap::new(),
            transactions: Vec::new(),
            entry_seq: 0,
            friends_invited: 0,
            friends_active: 0,
            profile: Profile::default(),
            mining_rate: Amount::from_micros(DEFAULT_MINING_RATE_MICROS),
            joined_at: now,
            last_active_at: None,
        }
    }

    pub fn balance(&self, asset: Asset) -> Amount {
        match asset {
            Asset::Coins => self.coins,
            Asset::Pi => self.pi,
            Asset::Usdt => self.usdt,
        }
    }

    fn balance_mut(&mut self, asset: Asset) -> &mut Amount {
        match asset {
            Asset::Coins => &mut self.coins,
            Asset::Pi => &mut self.pi,
            Asset::Usdt => &mut self.usdt,
        }
    }

    pub fn credit(&mut self, asset: Asset, amount: Amount) -> Result<(), PiprotoError> {
        let bal = self.balance_mut(asset);
        *bal = bal
            .checked_add(amount)
            .ok_or(PiprotoError::BalanceOverflow(asset))?;
        Ok(())
    }

    pub fn debit(&mut self, asset: Asset, amount: Amount) -> Result<(), PiprotoError> {
        let have = self.balance(asset);
        let rest = have
            .checked_sub(amount)
            .ok_or(PiprotoError::InsufficientBalance { asset, need: amount, have })?;
        *self.balance_mut(asset) = rest;
        Ok(())
    }

    /// Prepend a new ledger entry and return it.
    pub fn push_entry(
        &mut self,
        kind: EntryKind,
        amount: Amount,
        note: String,
        now: TimestampMs,
    ) -> &LedgerEntry {
        let seq = self.entry_seq;
        let id = EntryId::derive(&self.user_id, seq, kind, now);
        self.entry_seq += 1;
        self.transactions.insert(
            0,
            LedgerEntry { seq, id, kind, amount, note, timestamp: now },
        );
        &self.transactions[0]
    }

    /// Entries pushed since the ledger stood at `seq`, newest first.
    pub fn entries_since(&self, seq: u64) -> &[LedgerEntry] {
        let n = self.transactions.iter().take_while(|e| e.seq >= seq).count();
        &self.transactions[..n]
    }

    /// Drop everything but the recent window before the record is saved.
    pub fn trim_recent(&mut self) {
        self.transactions.truncate(RECENT_TRANSACTIONS_LIMIT);
    }

    /// The most recent ledger entries exposed to clients.
    pub fn recent_transactions(&self) -> &[LedgerEntry] {
        let n = self.transactions.len().min(RECENT_TRANSACTIONS_LIMIT);
        &self.transactions[..n]
    }

    pub fn touch(&mut self, now: TimestampMs) {
        self.last_active_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_rejects_overdraw_without_mutating() {
        let mut acc = Account::new("u1", 0);
        acc.credit(Asset::Coins, Amount::units(3)).unwrap();
        let err = acc.debit(Asset::Coins, Amount::units(4)).unwrap_err();
        assert!(matches!(err, PiprotoError::InsufficientBalance { asset: Asset::Coins, .. }));
        assert_eq!(acc.coins, Amount::units(3));
    }

    #[test]
    fn entries_are_prepended_with_distinct_ids() {
        let mut acc = Account::new("u1", 0);
        for i in 0..12 {
            acc.push_entry(EntryKind::Earn, Amount::units(1), format!("e{i}"), 1_000);
        }
        assert_eq!(acc.transactions.len(), 12);
        assert_eq!(acc.recent_transactions().len(), RECENT_TRANSACTIONS_LIMIT);
        assert_eq!(acc.transactions[0].note, "e11");
        assert_ne!(acc.transactions[0].id, acc.transactions[1].id);
        assert_eq!(acc.transactions[0].seq, 11);
        assert_eq!(acc.entry_seq, 12);
    }

    #[test]
    fn new_entries_and_trim() {
        let mut acc = Account::new("u1", 0);
        for i in 0..12 {
            acc.push_entry(EntryKind::Earn, Amount::units(1), format!("e{i}"), 1_000);
        }
        acc.trim_recent();
        assert_eq!(acc.transactions.len(), RECENT_TRANSACTIONS_LIMIT);
        assert_eq!(acc.transactions.last().map(|e| e.seq), Some(2));

        let mark = acc.entry_seq;
        assert!(acc.entries_since(mark).is_empty());
        acc.push_entry(EntryKind::Swap, Amount::units(1), "s".into(), 2_000);
        let fresh = acc.entries_since(mark);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].seq, 12);
    }

    #[test]
    fn profile_update_trims_and_limits() {
        let mut p = Profile::default();
        ProfileUpdate { first_name: Some("  Ada ".into()), last_name: None }
            .apply(&mut p)
            .unwrap();
        assert_eq!(p.first_name, "Ada");
        let long = "x".repeat(MAX_PROFILE_NAME_CHARS + 1);
        assert!(ProfileUpdate { first_name: None, last_name: Some(long) }
            .apply(&mut p)
            .is_err());
    }
}
