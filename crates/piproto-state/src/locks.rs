use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Number of idle slots tolerated before the map is pruned.
const PRUNE_THRESHOLD: usize = 1024;

/// One mutex per key, created on demand.
///
/// Callers hold the returned slot for the duration of a read-modify-write.
/// Slots that nobody holds are pruned once the map grows past a threshold.
#[derive(Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the lock slot for `key`. Lock it with [`hold`].
    pub fn slot(&self, key: &str) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.len() > PRUNE_THRESHOLD {
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        }
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Lock a slot. A poisoned slot only means a previous holder panicked; the
/// guarded data is `()`, so it is safe to keep going.
pub fn hold(slot: &Mutex<()>) -> MutexGuard<'_, ()> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn account_key(user_id: &str) -> String {
    format!("acct:{user_id}")
}

pub fn edge_key(invitee_id: &str) -> String {
    format!("edge:{invitee_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_shares_a_slot() {
        let locks = KeyedLocks::new();
        let a = locks.slot("acct:u1");
        let b = locks.slot("acct:u1");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &locks.slot("acct:u2")));
    }

    #[test]
    fn idle_slots_are_pruned() {
        let locks = KeyedLocks::new();
        for i in 0..=PRUNE_THRESHOLD {
            let _ = locks.slot(&format!("k{i}"));
        }
        let held = locks.slot("held");
        assert!(locks.len() <= 2);
        drop(held);
    }

    #[test]
    fn serialises_concurrent_writers() {
        let locks = Arc::new(KeyedLocks::new());
        let counter = Arc::new(Mutex::new(0u32));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let slot = locks.slot("acct:shared");
                        let _g = hold(&slot);
                        let v = *counter.lock().unwrap();
                        *counter.lock().unwrap() = v + 1;
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*counter.lock().unwrap(), 800);
    }
}
