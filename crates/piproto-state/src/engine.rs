use std::sync::Arc;

use piproto_core::account::Account;
use piproto_core::error::PiprotoError;
use piproto_core::types::{validate_user_id, TimestampMs};

use crate::config::EngineConfig;
use crate::locks::{account_key, hold, KeyedLocks};
use crate::store::StateStore;

// ── StateEngine ───────────────────────────────────────────────────────────────

/// The state transition engine.
///
/// Every operation is a read-modify-write of one account (or one referral
/// edge plus its inviter's counters) under a per-key lock. Changes are staged
/// on a copy of the record and written only if the whole operation succeeds,
/// so a rejected request never leaves a partial update behind.
///
/// Operations are split by concern across `ledger`, `referral`, `tasks` and
/// `accounts`.
pub struct StateEngine {
    pub(crate) store: Arc<dyn StateStore>,
    pub(crate) locks: KeyedLocks,
    pub(crate) config: EngineConfig,
}

impl StateEngine {
    pub fn new(store: Arc<dyn StateStore>, config: EngineConfig) -> Self {
        Self { store, locks: KeyedLocks::new(), config }
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load (or implicitly create) `user_id`, apply `f` to a staged copy and
    /// persist it if `f` succeeds. Returns the saved account and `f`'s output.
    ///
    /// Entries `f` pushes go to the store's ledger before the account is
    /// saved. If the account write then fails they sit past its `entry_seq`,
    /// invisible to [`StateEngine::transactions`], and the next update
    /// overwrites them.
    pub(crate) fn update_account<T>(
        &self,
        user_id: &str,
        now: TimestampMs,
        f: impl FnOnce(&mut Account) -> Result<T, PiprotoError>,
    ) -> Result<(Account, T), PiprotoError> {
        validate_user_id(user_id)?;
        let slot = self.locks.slot(&account_key(user_id));
        let _guard = hold(&slot);

        let mut staged = self.store.get_or_create(user_id, now)?;
        let seq_before = staged.entry_seq;
        let out = f(&mut staged)?;
        staged.touch(now);
        for entry in staged.entries_since(seq_before) {
            self.store.put_entry(user_id, entry)?;
        }
        staged.trim_recent();
        self.store.put_account(&staged)?;
        Ok((staged, out))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use crate::store::StateStore;
    use piproto_core::constants::{DIRECT_INVITER, RECENT_TRANSACTIONS_LIMIT};
    use piproto_core::ledger::EntryKind;
    use piproto_core::types::{Amount, Asset};

    #[test]
    fn failed_update_is_not_persisted() {
        let engine = memory_engine();
        let err = engine
            .update_account("u1", NOW, |acc| {
                acc.credit(Asset::Coins, Amount::units(5))?;
                acc.debit(Asset::Pi, Amount::units(1))
            })
            .unwrap_err();
        assert!(matches!(err, piproto_core::PiprotoError::InsufficientBalance { .. }));
        assert!(engine.store().get_account("u1").unwrap().is_none());
    }

    #[test]
    fn successful_update_touches_account() {
        let engine = memory_engine();
        let (acc, ()) = engine
            .update_account("u1", NOW, |acc| acc.credit(Asset::Coins, Amount::units(1)))
            .unwrap();
        assert_eq!(acc.last_active_at, Some(NOW));
        assert_eq!(acc.joined_at, NOW);
        assert_eq!(engine.store().get_account("u1").unwrap(), Some(acc));
    }

    #[test]
    fn direct_sentinel_cannot_be_created() {
        let engine = memory_engine();
        let err = engine
            .update_account(DIRECT_INVITER, NOW, |acc| acc.credit(Asset::Coins, Amount::units(1)))
            .unwrap_err();
        assert!(matches!(err, piproto_core::PiprotoError::Validation(_)));
        assert!(engine.store().get_account(DIRECT_INVITER).unwrap().is_none());
    }

    #[test]
    fn account_keeps_recent_window_and_store_keeps_ledger() {
        let engine = sled_engine("ledger_window");
        for i in 0..25 {
            engine
                .update_account("u1", NOW + i, |acc| {
                    acc.credit(Asset::Coins, Amount::units(1))?;
                    acc.push_entry(EntryKind::Earn, Amount::units(1), format!("e{i}"), NOW + i);
                    Ok(())
                })
                .unwrap();
        }
        let acc = engine.store().get_account("u1").unwrap().unwrap();
        assert_eq!(acc.transactions.len(), RECENT_TRANSACTIONS_LIMIT);
        assert_eq!(acc.transactions[0].note, "e24");
        assert_eq!(acc.entry_seq, 25);

        let ledger = engine.store().entries("u1").unwrap();
        assert_eq!(ledger.len(), 25);
        assert_eq!(ledger[..RECENT_TRANSACTIONS_LIMIT], acc.transactions[..]);
        assert_eq!(ledger[24].note, "e0");
    }

    #[test]
    fn concurrent_claims_are_all_applied() {
        const THREADS: u64 = 8;
        const CLAIMS: u64 = 50;

        let engine = sled_engine("concurrent_claims");
        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for _ in 0..CLAIMS {
                        engine.claim_mining("A", Amount::units(1), NOW).unwrap();
                    }
                });
            }
        });

        let acc = engine.store().get_account("A").unwrap().unwrap();
        assert_eq!(acc.coins, Amount::units(THREADS * CLAIMS));
        assert_eq!(acc.entry_seq, THREADS * CLAIMS);
        let ledger = engine.transactions("A").unwrap();
        assert_eq!(ledger.len() as u64, THREADS * CLAIMS);
        let mut seqs: Vec<_> = ledger.iter().map(|e| e.seq).collect();
        seqs.sort_unstable();
        seqs.dedup();
        assert_eq!(seqs.len() as u64, THREADS * CLAIMS);
    }

    #[test]
    fn concurrent_manual_clicks_pay_once_per_cooldown() {
        let engine = memory_engine();
        let paid: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| engine.manual_mine("A", Amount::units(1), NOW).is_ok()))
                .collect();
            handles.into_iter().map(|h| usize::from(h.join().unwrap())).sum()
        });
        assert_eq!(paid, 1);
        let acc = engine.store().get_account("A").unwrap().unwrap();
        assert_eq!(acc.coins, Amount::units(1));
        assert_eq!(acc.entry_seq, 1);
    }
}
