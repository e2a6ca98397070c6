use std::collections::{BTreeMap, BTreeSet};

use piproto_core::account::{Account, Profile, TaskStatus};
use piproto_core::ledger::LedgerEntry;
use piproto_core::referral::ReferralEdge;
use piproto_core::types::TimestampMs;
use piproto_state::{ActiveFriend, InvitedFriend, ReferralStats};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Requests ──────────────────────────────────────────────────────────────────
//
// Every field is optional at the serde level so that a missing field surfaces
// as a `MissingField` error with the usual `{success:false}` body instead of a
// serde rejection. Amounts stay raw JSON until `Amount::from_json` parses them.
// Ids accept integers too; Telegram user ids are numeric on some clients.

fn id_field<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(Option::<RawId>::deserialize(de)?.map(|raw| match raw {
        RawId::Text(s) => s,
        RawId::Signed(n) => n.to_string(),
        RawId::Unsigned(n) => n.to_string(),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    #[serde(default, deserialize_with = "id_field")]
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMiningRequest {
    #[serde(default, deserialize_with = "id_field")]
    pub user_id: Option<String>,
    pub ts: Option<TimestampMs>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountRequest {
    #[serde(default, deserialize_with = "id_field")]
    pub user_id: Option<String>,
    pub amount: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinsToPiRequest {
    #[serde(default, deserialize_with = "id_field")]
    pub user_id: Option<String>,
    pub coins: Option<Value>,
    pub pi: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PiToUsdtRequest {
    #[serde(default, deserialize_with = "id_field")]
    pub user_id: Option<String>,
    pub pi: Option<Value>,
    pub usdt: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    #[serde(default, deserialize_with = "id_field")]
    pub user_id: Option<String>,
    pub asset: Option<String>,
    pub address: Option<String>,
    pub amount: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReferralRequest {
    #[serde(default, deserialize_with = "id_field")]
    pub inviter_code: Option<String>,
    #[serde(default, deserialize_with = "id_field")]
    pub user_id: Option<String>,
    pub timestamp: Option<TimestampMs>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    #[serde(default, deserialize_with = "id_field")]
    pub user_id: Option<String>,
    pub platform: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    #[serde(default, deserialize_with = "id_field")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "id_field")]
    pub task_id: Option<String>,
    pub reward: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    #[serde(default, deserialize_with = "id_field")]
    pub user_id: Option<String>,
    pub first: Option<String>,
    pub last: Option<String>,
}

// ── Shared views ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(rename = "remainingCooldown", skip_serializing_if = "Option::is_none")]
    pub remaining_cooldown: Option<i64>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { success: false, error: error.into(), remaining_cooldown: None }
    }
}

/// A ledger entry as the client sees it. `type` and `ts` keep the wire names
/// the mobile client already reads.
#[derive(Debug, Serialize)]
pub struct ApiTransaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub amount: f64,
    pub note: String,
    pub ts: TimestampMs,
}

impl From<&LedgerEntry> for ApiTransaction {
    fn from(e: &LedgerEntry) -> Self {
        Self {
            id: e.id.to_hex(),
            kind: e.kind.as_str(),
            amount: e.amount.to_f64(),
            note: e.note.clone(),
            ts: e.timestamp,
        }
    }
}

pub fn recent_transactions(account: &Account) -> Vec<ApiTransaction> {
    account.recent_transactions().iter().map(ApiTransaction::from).collect()
}

#[derive(Debug, Serialize)]
pub struct ApiProfile {
    pub first: String,
    pub last: String,
}

impl From<&Profile> for ApiProfile {
    fn from(p: &Profile) -> Self {
        Self { first: p.first_name.clone(), last: p.last_name.clone() }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReferralEdge {
    pub inviter_id: String,
    pub invitee_id: String,
    pub status: &'static str,
    pub invited_at: TimestampMs,
    pub activated_at: Option<TimestampMs>,
}

impl From<&ReferralEdge> for ApiReferralEdge {
    fn from(e: &ReferralEdge) -> Self {
        Self {
            inviter_id: e.inviter_id.clone(),
            invitee_id: e.invitee_id.clone(),
            status: e.status.as_str(),
            invited_at: e.invited_at,
            activated_at: e.activated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiInvitedFriend {
    pub id: String,
    pub username: String,
    pub invited_at: TimestampMs,
    pub status: &'static str,
    pub is_active: bool,
    pub days_since_invite: i64,
}

impl From<&InvitedFriend> for ApiInvitedFriend {
    fn from(f: &InvitedFriend) -> Self {
        Self {
            id: f.id.clone(),
            username: f.username.clone(),
            invited_at: f.invited_at,
            status: f.status.as_str(),
            is_active: f.status == piproto_core::referral::ReferralStatus::Active,
            days_since_invite: f.days_since_invite,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiActiveFriend {
    pub id: String,
    pub username: String,
    pub activated_at: TimestampMs,
    pub days_active: i64,
    pub mining_boost: f64,
}

impl From<&ActiveFriend> for ApiActiveFriend {
    fn from(f: &ActiveFriend) -> Self {
        Self {
            id: f.id.clone(),
            username: f.username.clone(),
            activated_at: f.activated_at,
            days_active: f.days_active,
            mining_boost: f.mining_boost.to_f64(),
        }
    }
}

// ── Responses ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningStartResponse {
    pub success: bool,
    pub mining_start: TimestampMs,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub success: bool,
    pub coins: f64,
    pub transactions: Vec<ApiTransaction>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualMiningResponse {
    pub success: bool,
    pub coins: f64,
    pub last_manual: Option<TimestampMs>,
    pub transactions: Vec<ApiTransaction>,
}

#[derive(Debug, Serialize)]
pub struct CoinsToPiResponse {
    pub success: bool,
    pub coins: f64,
    pub pi: f64,
    pub transactions: Vec<ApiTransaction>,
}

#[derive(Debug, Serialize)]
pub struct PiToUsdtResponse {
    pub success: bool,
    pub pi: f64,
    pub usdt: f64,
    pub transactions: Vec<ApiTransaction>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<ApiTransaction>>,
}

#[derive(Debug, Serialize)]
pub struct RegisterReferralResponse {
    pub success: bool,
    pub message: &'static str,
    pub data: ApiReferralEdge,
}

#[derive(Debug, Serialize)]
pub struct ActivateReferralResponse {
    pub success: bool,
    pub message: &'static str,
    pub friend: ApiReferralEdge,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub success: bool,
    pub message: String,
    pub platform: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStatsResponse {
    pub success: bool,
    pub invited: u32,
    pub active: u32,
    pub invited_friends: Vec<ApiInvitedFriend>,
    pub active_friends: Vec<ApiActiveFriend>,
}

impl From<&ReferralStats> for ReferralStatsResponse {
    fn from(s: &ReferralStats) -> Self {
        Self {
            success: true,
            invited: s.invited,
            active: s.active,
            invited_friends: s.invited_friends.iter().map(ApiInvitedFriend::from).collect(),
            active_friends: s.active_friends.iter().map(ApiActiveFriend::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FriendListResponse<T> {
    pub success: bool,
    pub count: usize,
    pub friends: Vec<T>,
}

impl<T> FriendListResponse<T> {
    pub fn new(friends: Vec<T>) -> Self {
        Self { success: true, count: friends.len(), friends }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompleteResponse {
    pub success: bool,
    pub completed_tasks: BTreeSet<String>,
    pub task_statuses: BTreeMap<String, TaskStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskClaimResponse {
    pub success: bool,
    pub coins: f64,
    pub completed_tasks: BTreeSet<String>,
    pub task_statuses: BTreeMap<String, TaskStatus>,
    pub transactions: Vec<ApiTransaction>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub profile: ApiProfile,
}

/// Everything `GET /user/:userId` exposes about an account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUser {
    pub user_id: String,
    pub profile: ApiProfile,
    pub coins: f64,
    pub pi: f64,
    pub usdt: f64,
    pub mining_start: Option<TimestampMs>,
    pub last_manual: Option<TimestampMs>,
    pub mining_rate: f64,
    pub referred_by: Option<String>,
    pub friends_invited: u32,
    pub friends_active: u32,
    pub completed_tasks: BTreeSet<String>,
    pub task_statuses: BTreeMap<String, TaskStatus>,
    pub joined_at: TimestampMs,
    pub last_active_at: Option<TimestampMs>,
    pub transactions: Vec<ApiTransaction>,
}

impl From<&Account> for ApiUser {
    fn from(a: &Account) -> Self {
        Self {
            user_id: a.user_id.clone(),
            profile: ApiProfile::from(&a.profile),
            coins: a.coins.to_f64(),
            pi: a.pi.to_f64(),
            usdt: a.usdt.to_f64(),
            mining_start: a.mining_start,
            last_manual: a.last_manual_mining_at,
            mining_rate: a.mining_rate.to_f64(),
            referred_by: a.referred_by.clone(),
            friends_invited: a.friends_invited,
            friends_active: a.friends_active,
            completed_tasks: a.completed_tasks.clone(),
            task_statuses: a.task_statuses.clone(),
            joined_at: a.joined_at,
            last_active_at: a.last_active_at,
            transactions: recent_transactions(a),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: ApiUser,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub success: bool,
    pub count: usize,
    pub transactions: Vec<ApiTransaction>,
}
