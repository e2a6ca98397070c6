use serde::{Deserialize, Serialize};

use crate::types::TimestampMs;

/// Activation state of a referral edge.
///
/// Monotonic: `Invited → Active`, never back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    Invited,
    Active,
}

impl ReferralStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralStatus::Invited => "invited",
            ReferralStatus::Active => "active",
        }
    }
}

/// One inviter → invitee relationship. Unique on `invitee_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferralEdge {
    pub inviter_id: String,
    pub invitee_id: String,
    pub status: ReferralStatus,
    pub invited_at: TimestampMs,
    pub activated_at: Option<TimestampMs>,
}

impl ReferralEdge {
    pub fn new(inviter_id: impl Into<String>, invitee_id: impl Into<String>, at: TimestampMs) -> Self {
        Self {
            inviter_id: inviter_id.into(),
            invitee_id: invitee_id.into(),
            status: ReferralStatus::Invited,
            invited_at: at,
            activated_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ReferralStatus::Active
    }

    /// Transition to `Active`. Returns false if already active.
    pub fn activate(&mut self, now: TimestampMs) -> bool {
        if self.is_active() {
            return false;
        }
        self.status = ReferralStatus::Active;
        self.activated_at = Some(now);
        true
    }
}

/// Public display name for a referred friend: `"User " + last 4 chars of id`.
pub fn friend_display_name(user_id: &str) -> String {
    let chars: Vec<char> = user_id.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("User {tail}")
}
