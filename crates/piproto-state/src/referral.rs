//! Referral edges and the inviter's cached friend counters.
//!
//! Edges are authoritative. `Account::friends_invited` / `friends_active` are
//! a cache that is always rewritten from a fresh count of the inviter's edges,
//! so a crash between the edge write and the counter write heals on the next
//! `register`, `activate` or `stats` for that inviter.

use piproto_core::account::Account;
use piproto_core::constants::{
    ACTIVE_FRIEND_MINING_BOOST_MICROS, DIRECT_INVITER, FRIEND_LIST_LIMIT, MS_PER_DAY,
};
use piproto_core::error::PiprotoError;
use piproto_core::referral::{friend_display_name, ReferralEdge, ReferralStatus};
use piproto_core::types::{validate_user_id, Amount, TimestampMs};
use tracing::{debug, info, warn};

use crate::engine::StateEngine;
use crate::locks::{account_key, edge_key, hold};

// ── Views ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct InvitedFriend {
    pub id: String,
    pub username: String,
    pub invited_at: TimestampMs,
    pub status: ReferralStatus,
    pub days_since_invite: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveFriend {
    pub id: String,
    pub username: String,
    pub activated_at: TimestampMs,
    pub days_active: i64,
    pub mining_boost: Amount,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferralStats {
    pub invited: u32,
    pub active: u32,
    pub invited_friends: Vec<InvitedFriend>,
    pub active_friends: Vec<ActiveFriend>,
}

/// Whole days elapsed since `since`, floored. Clock skew never yields a negative.
fn whole_days(now: TimestampMs, since: TimestampMs) -> i64 {
    (now - since).div_euclid(MS_PER_DAY).max(0)
}

fn invited_view(edges: &[ReferralEdge], now: TimestampMs) -> Vec<InvitedFriend> {
    let mut sorted: Vec<&ReferralEdge> = edges.iter().collect();
    sorted.sort_by(|a, b| b.invited_at.cmp(&a.invited_at));
    sorted
        .into_iter()
        .take(FRIEND_LIST_LIMIT)
        .map(|e| InvitedFriend {
            id: e.invitee_id.clone(),
            username: friend_display_name(&e.invitee_id),
            invited_at: e.invited_at,
            status: e.status,
            days_since_invite: whole_days(now, e.invited_at),
        })
        .collect()
}

fn active_view(edges: &[ReferralEdge], now: TimestampMs) -> Vec<ActiveFriend> {
    let mut active: Vec<(&ReferralEdge, TimestampMs)> = edges
        .iter()
        .filter(|e| e.is_active())
        .map(|e| (e, e.activated_at.unwrap_or(e.invited_at)))
        .collect();
    active.sort_by(|a, b| b.1.cmp(&a.1));
    active
        .into_iter()
        .take(FRIEND_LIST_LIMIT)
        .map(|(e, activated_at)| ActiveFriend {
            id: e.invitee_id.clone(),
            username: friend_display_name(&e.invitee_id),
            activated_at,
            days_active: whole_days(now, activated_at),
            mining_boost: Amount::from_micros(ACTIVE_FRIEND_MINING_BOOST_MICROS),
        })
        .collect()
}

fn counts(edges: &[ReferralEdge]) -> (u32, u32) {
    let invited = edges.len() as u32;
    let active = edges.iter().filter(|e| e.is_active()).count() as u32;
    (invited, active)
}

impl StateEngine {
    // ── Registration ─────────────────────────────────────────────────────────

    /// Record that `inviter_id` invited `invitee_id`.
    ///
    /// Returns the edge and whether it was created by this call. A second
    /// registration for the same invitee returns the existing edge untouched,
    /// whoever the inviter is, but still completes any follow-up write an
    /// earlier attempt left undone.
    pub fn register(
        &self,
        inviter_id: &str,
        invitee_id: &str,
        at: Option<TimestampMs>,
        now: TimestampMs,
    ) -> Result<(ReferralEdge, bool), PiprotoError> {
        if inviter_id == invitee_id {
            return Err(PiprotoError::SelfReferral);
        }
        validate_user_id(invitee_id)?;

        let edge_slot = self.locks.slot(&edge_key(invitee_id));
        let _edge_guard = hold(&edge_slot);

        if let Some(existing) = self.store.get_referral(invitee_id)? {
            debug!(inviter_id, invitee_id, "referral already registered");
            self.finish_registration(&existing, now)?;
            return Ok((existing, false));
        }

        let is_direct = inviter_id == DIRECT_INVITER;
        if !is_direct && !self.store.account_exists(inviter_id)? {
            warn!(inviter_id, invitee_id, "referral rejected: unknown inviter");
            return Err(PiprotoError::InviterNotFound(inviter_id.to_string()));
        }

        let edge = ReferralEdge::new(inviter_id, invitee_id, at.unwrap_or(now));
        self.store.put_referral(&edge)?;

        self.finish_registration(&edge, now)?;
        info!(inviter_id, invitee_id, "referral registered");
        Ok((edge, true))
    }

    /// The writes that follow the edge: the invitee's `referred_by` and the
    /// inviter's counters. Safe to repeat, so a registration that failed
    /// after its edge was stored completes on retry.
    fn finish_registration(&self, edge: &ReferralEdge, now: TimestampMs) -> Result<(), PiprotoError> {
        let referred = self
            .store
            .get_account(&edge.invitee_id)?
            .is_some_and(|acc| acc.referred_by.is_some());
        if !referred {
            self.update_account(&edge.invitee_id, now, |acc| {
                if acc.referred_by.is_none() {
                    acc.referred_by = Some(edge.inviter_id.clone());
                }
                Ok(())
            })?;
        }
        if edge.inviter_id != DIRECT_INVITER {
            self.reconcile(&edge.inviter_id)?;
        }
        Ok(())
    }

    // ── Activation ───────────────────────────────────────────────────────────

    /// Move the edge for `invitee_id` to `active`. Activating an already
    /// active edge is a no-op. Returns the edge and whether it changed.
    pub fn activate(
        &self,
        invitee_id: &str,
        now: TimestampMs,
    ) -> Result<(ReferralEdge, bool), PiprotoError> {
        let edge_slot = self.locks.slot(&edge_key(invitee_id));
        let _edge_guard = hold(&edge_slot);

        let mut edge = self
            .store
            .get_referral(invitee_id)?
            .ok_or_else(|| PiprotoError::ReferralNotFound(invitee_id.to_string()))?;

        if !edge.activate(now) {
            debug!(invitee_id, "referral already active");
            return Ok((edge, false));
        }
        self.store.put_referral(&edge)?;

        if edge.inviter_id != DIRECT_INVITER {
            self.reconcile(&edge.inviter_id)?;
        }
        info!(inviter_id = %edge.inviter_id, invitee_id, "referral activated");
        Ok((edge, true))
    }

    // ── Counters ─────────────────────────────────────────────────────────────

    /// Rewrite `user_id`'s cached friend counters from its edges.
    ///
    /// Returns the edges it counted, the (possibly updated) account if one
    /// exists, and whether the cached counters had to change.
    pub fn reconcile(
        &self,
        user_id: &str,
    ) -> Result<(Vec<ReferralEdge>, Option<Account>, bool), PiprotoError> {
        let slot = self.locks.slot(&account_key(user_id));
        let _guard = hold(&slot);

        let edges = self.store.referrals_by_inviter(user_id)?;
        let (invited, active) = counts(&edges);

        if user_id == DIRECT_INVITER {
            return Ok((edges, None, false));
        }
        let Some(mut account) = self.store.get_account(user_id)? else {
            return Ok((edges, None, false));
        };
        let changed = account.friends_invited != invited || account.friends_active != active;
        if changed {
            account.friends_invited = invited;
            account.friends_active = active;
            self.store.put_account(&account)?;
        }
        Ok((edges, Some(account), changed))
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    /// Counts and friend lists for `user_id` as an inviter. Counts come from
    /// the edges; drifted cached counters are corrected on the way.
    pub fn stats(&self, user_id: &str, now: TimestampMs) -> Result<ReferralStats, PiprotoError> {
        let (edges, _, changed) = self.reconcile(user_id)?;
        if changed {
            warn!(user_id, "referral counters drifted from edges; corrected");
        }
        let (invited, active) = counts(&edges);
        Ok(ReferralStats {
            invited,
            active,
            invited_friends: invited_view(&edges, now),
            active_friends: active_view(&edges, now),
        })
    }

    /// Most recently invited friends, newest first.
    pub fn invited_friends(
        &self,
        user_id: &str,
        now: TimestampMs,
    ) -> Result<Vec<InvitedFriend>, PiprotoError> {
        let edges = self.store.referrals_by_inviter(user_id)?;
        Ok(invited_view(&edges, now))
    }

    /// Most recently activated friends, newest first.
    pub fn active_friends(
        &self,
        user_id: &str,
        now: TimestampMs,
    ) -> Result<Vec<ActiveFriend>, PiprotoError> {
        let edges = self.store.referrals_by_inviter(user_id)?;
        Ok(active_view(&edges, now))
    }

    /// Log a referral-link share. Counters are left alone: only edges count.
    pub fn record_share(&self, user_id: &str, platform: Option<&str>) -> String {
        let platform = platform
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or("unknown")
            .to_string();
        info!(user_id, platform = %platform, "referral link shared");
        platform
    }
}
