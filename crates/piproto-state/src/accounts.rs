use piproto_core::account::{Account, ProfileUpdate};
use piproto_core::error::PiprotoError;
use piproto_core::ledger::LedgerEntry;
use piproto_core::types::TimestampMs;
use tracing::info;

use crate::engine::StateEngine;

impl StateEngine {
    /// Look up an account without creating it.
    pub fn get_user(&self, user_id: &str) -> Result<Account, PiprotoError> {
        self.store
            .get_account(user_id)?
            .ok_or_else(|| PiprotoError::UnknownAccount(user_id.to_string()))
    }

    /// The committed ledger of an existing account, newest first.
    pub fn transactions(&self, user_id: &str) -> Result<Vec<LedgerEntry>, PiprotoError> {
        let account = self.get_user(user_id)?;
        let mut entries = self.store.entries(user_id)?;
        entries.retain(|e| e.seq < account.entry_seq);
        Ok(entries)
    }

    /// Apply a whitelisted profile update.
    pub fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
        now: TimestampMs,
    ) -> Result<Account, PiprotoError> {
        let (account, ()) = self.update_account(user_id, now, |acc| update.apply(&mut acc.profile))?;
        info!(user_id, "profile updated");
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::*;
    use crate::store::StateStore;
    use piproto_core::ledger::EntryKind;
    use piproto_core::types::Amount;

    #[test]
    fn get_user_does_not_create() {
        let engine = memory_engine();
        assert!(matches!(engine.get_user("u1"), Err(PiprotoError::UnknownAccount(_))));
        assert!(matches!(engine.get_user("u1"), Err(PiprotoError::UnknownAccount(_))));

        engine.start_mining("u1", None, NOW).unwrap();
        let acc = engine.get_user("u1").unwrap();
        assert_eq!(acc.mining_start, Some(NOW));
    }

    #[test]
    fn transactions_skip_uncommitted_entries() {
        let engine = memory_engine();
        assert!(matches!(engine.transactions("u1"), Err(PiprotoError::UnknownAccount(_))));

        engine.claim_mining("u1", Amount::units(2), NOW).unwrap();
        // An entry written ahead of an account save that never happened.
        let mut ghost = engine.get_user("u1").unwrap();
        let entry = ghost.push_entry(EntryKind::Earn, Amount::units(9), "lost".into(), NOW + 1);
        engine.store().put_entry("u1", entry).unwrap();

        let ledger = engine.transactions("u1").unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].note, "Mining session reward");

        // The next committed entry takes the same seq and replaces it.
        engine.claim_mining("u1", Amount::units(1), NOW + 2).unwrap();
        let ledger = engine.transactions("u1").unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[0].amount, Amount::units(1));
        assert_eq!(engine.store().entries("u1").unwrap().len(), 2);
    }

    #[test]
    fn profile_update_is_partial_and_trimmed() {
        let engine = memory_engine();
        let first = ProfileUpdate { first_name: Some("  Ada ".into()), last_name: None };
        engine.update_profile("u1", &first, NOW).unwrap();
        let last = ProfileUpdate { first_name: None, last_name: Some("Lovelace".into()) };
        let acc = engine.update_profile("u1", &last, NOW + 1).unwrap();

        assert_eq!(acc.profile.first_name, "Ada");
        assert_eq!(acc.profile.last_name, "Lovelace");
        assert_eq!(acc.last_active_at, Some(NOW + 1));
    }

    #[test]
    fn oversized_name_rejected_without_write() {
        let engine = memory_engine();
        let update = ProfileUpdate { first_name: Some("x".repeat(65)), last_name: None };
        assert!(matches!(
            engine.update_profile("u1", &update, NOW),
            Err(PiprotoError::Validation(_))
        ));
        assert!(engine.get_user("u1").is_err());
    }
}
