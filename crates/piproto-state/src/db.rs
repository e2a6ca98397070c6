use piproto_core::account::Account;
use piproto_core::error::PiprotoError;
use piproto_core::ledger::LedgerEntry;
use piproto_core::referral::ReferralEdge;
use std::path::Path;

use crate::store::StateStore;

/// Separator after the leading id in `referrals_by_inviter` and `ledger`
/// keys. Identifiers never contain control characters, so this cannot collide.
const INDEX_SEP: u8 = 0x00;

/// Persistent state database backed by sled (pure-Rust, no C dependencies).
///
/// Named trees:
///   accounts             — user_id utf8                 → bincode(Account)
///   ledger               — user_id utf8 ‖ 0x00 ‖ seq_be  → bincode(LedgerEntry)
///   referrals            — invitee_id utf8              → bincode(ReferralEdge)
///   referrals_by_inviter — inviter utf8 ‖ 0x00 ‖ invitee → [] (membership set)
///   meta                 — utf8 key bytes               → raw bytes
pub struct StateDb {
    _db: sled::Db,
    accounts: sled::Tree,
    ledger: sled::Tree,
    referrals: sled::Tree,
    referrals_by_inviter: sled::Tree,
    meta: sled::Tree,
}

fn storage_err(e: sled::Error) -> PiprotoError {
    PiprotoError::Storage(e.to_string())
}

fn serde_err(e: bincode::Error) -> PiprotoError {
    PiprotoError::Serialization(e.to_string())
}

fn id_prefix(id: &str) -> Vec<u8> {
    let mut prefix = id.as_bytes().to_vec();
    prefix.push(INDEX_SEP);
    prefix
}

fn ledger_key(user_id: &str, seq: u64) -> Vec<u8> {
    let mut key = id_prefix(user_id);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

fn index_key(inviter_id: &str, invitee_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(inviter_id.len() + 1 + invitee_id.len());
    key.extend_from_slice(inviter_id.as_bytes());
    key.push(INDEX_SEP);
    key.extend_from_slice(invitee_id.as_bytes());
    key
}

impl StateDb {
    /// Open or create the state database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PiprotoError> {
        let db = sled::open(path).map_err(storage_err)?;
        let accounts             = db.open_tree("accounts").map_err(storage_err)?;
        let ledger               = db.open_tree("ledger").map_err(storage_err)?;
        let referrals            = db.open_tree("referrals").map_err(storage_err)?;
        let referrals_by_inviter = db.open_tree("referrals_by_inviter").map_err(storage_err)?;
        let meta                 = db.open_tree("meta").map_err(storage_err)?;
        Ok(Self { _db: db, accounts, ledger, referrals, referrals_by_inviter, meta })
    }

    /// Number of stored accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    // ── Meta ──────────────────────────────────────────────────────────────────

    pub fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), PiprotoError> {
        self.meta.insert(key.as_bytes(), value).map_err(storage_err)?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, PiprotoError> {
        self.meta
            .get(key.as_bytes())
            .map(|v| v.map(|iv| iv.to_vec()))
            .map_err(storage_err)
    }
}

impl StateStore for StateDb {
    // ── Accounts ─────────────────────────────────────────────────────────────

    fn get_account(&self, user_id: &str) -> Result<Option<Account>, PiprotoError> {
        match self.accounts.get(user_id.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(serde_err)?)),
            None => Ok(None),
        }
    }

    fn put_account(&self, account: &Account) -> Result<(), PiprotoError> {
        let bytes = bincode::serialize(account).map_err(serde_err)?;
        self.accounts
            .insert(account.user_id.as_bytes(), bytes)
            .map_err(storage_err)?;
        Ok(())
    }

    fn account_exists(&self, user_id: &str) -> Result<bool, PiprotoError> {
        self.accounts.contains_key(user_id.as_bytes()).map_err(storage_err)
    }

    // ── Ledger ───────────────────────────────────────────────────────────────

    fn put_entry(&self, user_id: &str, entry: &LedgerEntry) -> Result<(), PiprotoError> {
        let bytes = bincode::serialize(entry).map_err(serde_err)?;
        self.ledger
            .insert(ledger_key(user_id, entry.seq), bytes)
            .map_err(storage_err)?;
        Ok(())
    }

    /// Big-endian seqs make key order ledger order, so a reversed prefix
    /// scan is newest first.
    fn entries(&self, user_id: &str) -> Result<Vec<LedgerEntry>, PiprotoError> {
        let mut entries = Vec::new();
        for item in self.ledger.scan_prefix(id_prefix(user_id)).rev() {
            let (_, bytes) = item.map_err(storage_err)?;
            entries.push(bincode::deserialize(&bytes).map_err(serde_err)?);
        }
        Ok(entries)
    }

    // ── Referral edges ───────────────────────────────────────────────────────

    fn get_referral(&self, invitee_id: &str) -> Result<Option<ReferralEdge>, PiprotoError> {
        match self.referrals.get(invitee_id.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(serde_err)?)),
            None => Ok(None),
        }
    }

    fn put_referral(&self, edge: &ReferralEdge) -> Result<(), PiprotoError> {
        let bytes = bincode::serialize(edge).map_err(serde_err)?;
        self.referrals
            .insert(edge.invitee_id.as_bytes(), bytes)
            .map_err(storage_err)?;
        self.referrals_by_inviter
            .insert(index_key(&edge.inviter_id, &edge.invitee_id), b"".as_ref())
            .map_err(storage_err)?;
        Ok(())
    }

    fn referrals_by_inviter(&self, inviter_id: &str) -> Result<Vec<ReferralEdge>, PiprotoError> {
        let prefix = id_prefix(inviter_id);

        let mut edges = Vec::new();
        for item in self.referrals_by_inviter.scan_prefix(&prefix) {
            let (key, _) = item.map_err(storage_err)?;
            let invitee = &key[prefix.len()..];
            if let Some(bytes) = self.referrals.get(invitee).map_err(storage_err)? {
                edges.push(bincode::deserialize(&bytes).map_err(serde_err)?);
            }
        }
        Ok(edges)
    }

    /// Flush all pending writes to disk.
    fn flush(&self) -> Result<(), PiprotoError> {
        self._db.flush().map_err(storage_err)?;
        Ok(())
    }
}
