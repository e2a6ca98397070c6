//! piproto-state
//!
//! Account store and the engines that mutate it.
//!
//!   store     — `StateStore` trait + in-memory implementation
//!   db        — sled-backed `StateDb`
//!   engine    — `StateEngine`: per-key locking and staged account writes
//!   ledger    — mining, manual mining, conversions, withdrawals, task rewards
//!   referral  — inviter → invitee edges and cached friend counters
//!   tasks     — task completion tracking layered on the ledger
//!   accounts  — user lookup and profile updates

pub mod accounts;
pub mod config;
pub mod db;
pub mod engine;
pub mod ledger;
pub mod locks;
pub mod referral;
pub mod store;
pub mod tasks;

pub use config::{ConversionRates, EngineConfig};
pub use db::StateDb;
pub use engine::StateEngine;
pub use referral::{ActiveFriend, InvitedFriend, ReferralStats};
pub use store::{MemoryStore, StateStore};
