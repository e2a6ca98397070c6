use piproto_core::account::{Account, TaskStatus};
use piproto_core::error::PiprotoError;
use piproto_core::types::{Amount, TimestampMs};
use tracing::debug;

use crate::engine::StateEngine;

impl StateEngine {
    /// Flag `task_id` as completed for display. Pays nothing.
    pub fn mark_completed(
        &self,
        user_id: &str,
        task_id: &str,
        now: TimestampMs,
    ) -> Result<Account, PiprotoError> {
        let (account, ()) = self.update_account(user_id, now, |acc| {
            acc.task_statuses.insert(task_id.to_string(), TaskStatus::Completed);
            Ok(())
        })?;
        debug!(user_id, task_id, "task marked completed");
        Ok(account)
    }

    /// Claim the reward for `task_id`. Paid at most once per account.
    pub fn claim(
        &self,
        user_id: &str,
        task_id: &str,
        reward: Amount,
        now: TimestampMs,
    ) -> Result<(Account, bool), PiprotoError> {
        self.claim_task_reward(user_id, task_id, reward, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::*;
    use piproto_core::ledger::EntryKind;

    #[test]
    fn mark_completed_pays_nothing() {
        let engine = memory_engine();
        let acc = engine.mark_completed("u1", "follow_x", NOW).unwrap();
        assert_eq!(acc.task_statuses.get("follow_x"), Some(&TaskStatus::Completed));
        assert!(acc.completed_tasks.is_empty());
        assert!(acc.coins.is_zero());
        assert!(acc.transactions.is_empty());
    }

    #[test]
    fn claim_after_mark_still_pays_once() {
        let engine = memory_engine();
        engine.mark_completed("u1", "join_tg", NOW).unwrap();

        let (acc, paid) = engine.claim("u1", "join_tg", Amount::units(100), NOW + 1).unwrap();
        assert!(paid);
        assert_eq!(acc.coins, Amount::units(100));
        assert_eq!(acc.transactions[0].kind, EntryKind::Earn);
        assert_eq!(acc.transactions[0].note, "Task: join_tg");

        let (acc, paid) = engine.claim("u1", "join_tg", Amount::units(100), NOW + 2).unwrap();
        assert!(!paid);
        assert_eq!(acc.coins, Amount::units(100));
        assert_eq!(acc.transactions.len(), 1);
    }

    #[test]
    fn tasks_are_independent() {
        let engine = memory_engine();
        engine.claim("u1", "a", Amount::units(1), NOW).unwrap();
        let (acc, paid) = engine.claim("u1", "b", Amount::units(2), NOW).unwrap();
        assert!(paid);
        assert_eq!(acc.coins, Amount::units(3));
        assert_eq!(acc.completed_tasks.len(), 2);
    }
}
