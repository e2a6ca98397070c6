use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use piproto_core::account::ProfileUpdate;
use piproto_core::types::{now_ms, validate_id, validate_user_id, Amount, Asset};
use piproto_news::NewsItem;
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::server::ApiServerState;
use crate::types::*;

type AppState = State<Arc<ApiServerState>>;
type ApiResult<T> = Result<Json<T>, ApiError>;

/// Build the full router with tracing and permissive CORS.
pub fn router(state: Arc<ApiServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/news", get(news))
        .route("/user/:user_id", get(get_user))
        .route("/user/:user_id/transactions", get(get_transactions))
        .route("/mining/start", post(start_mining))
        .route("/claim", post(claim_mining))
        .route("/mining/manual", post(manual_mining))
        .route("/convert/coins-to-pi", post(convert_coins_to_pi))
        .route("/convert/pi-to-usdt", post(convert_pi_to_usdt))
        .route("/withdraw", post(withdraw))
        .route("/referral/register", post(register_referral))
        .route("/referral/stats", post(referral_stats))
        .route("/referral/activate", post(activate_referral))
        .route("/referral/share", post(share_referral))
        .route("/referral/friends/invited/:user_id", get(invited_friends))
        .route("/referral/friends/active/:user_id", get(active_friends))
        .route("/tasks/complete", post(complete_task))
        .route("/tasks/claim", post(claim_task))
        .route("/profile/update", post(update_profile))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

// ── Field extraction ──────────────────────────────────────────────────────────

fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str, ApiError> {
    Ok(validate_id(field, value.as_deref().unwrap_or_default())?)
}

/// The caller's own `userId`, which may name or create an account.
fn required_user(value: &Option<String>) -> Result<&str, ApiError> {
    Ok(validate_user_id(value.as_deref().unwrap_or_default())?)
}

fn required_amount(field: &'static str, value: &Option<Value>) -> Result<Amount, ApiError> {
    match value {
        None | Some(Value::Null) => Err(piproto_core::PiprotoError::MissingField(field).into()),
        Some(v) => Ok(Amount::from_json(v)?),
    }
}

/// Missing amount means zero (a claim with nothing mined still closes the session).
fn optional_amount(value: &Option<Value>) -> Result<Amount, ApiError> {
    match value {
        None | Some(Value::Null) => Ok(Amount::ZERO),
        Some(v) => Ok(Amount::from_json(v)?),
    }
}

// ── Meta ──────────────────────────────────────────────────────────────────────

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "PiProtocol Backend is running!",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn news(State(state): AppState) -> Json<Vec<NewsItem>> {
    Json(state.news.items().to_vec())
}

async fn get_user(State(state): AppState, Path(user_id): Path<String>) -> ApiResult<UserResponse> {
    let user_id = validate_id("userId", &user_id)?;
    let account = state.engine.get_user(user_id)?;
    Ok(Json(UserResponse { success: true, user: ApiUser::from(&account) }))
}

async fn get_transactions(
    State(state): AppState,
    Path(user_id): Path<String>,
) -> ApiResult<TransactionsResponse> {
    let user_id = validate_id("userId", &user_id)?;
    let entries = state.engine.transactions(user_id)?;
    Ok(Json(TransactionsResponse {
        success: true,
        count: entries.len(),
        transactions: entries.iter().map(ApiTransaction::from).collect(),
    }))
}

// ── Mining ────────────────────────────────────────────────────────────────────

async fn start_mining(
    State(state): AppState,
    body: Result<Json<StartMiningRequest>, JsonRejection>,
) -> ApiResult<MiningStartResponse> {
    let Json(req) = body?;
    let user_id = required_user(&req.user_id)?;
    let now = now_ms();
    let account = state.engine.start_mining(user_id, req.ts, now)?;
    Ok(Json(MiningStartResponse {
        success: true,
        mining_start: account.mining_start.unwrap_or(now),
    }))
}

async fn claim_mining(
    State(state): AppState,
    body: Result<Json<AmountRequest>, JsonRejection>,
) -> ApiResult<ClaimResponse> {
    let Json(req) = body?;
    let user_id = required_user(&req.user_id)?;
    let amount = optional_amount(&req.amount)?;
    let account = state.engine.claim_mining(user_id, amount, now_ms())?;
    Ok(Json(ClaimResponse {
        success: true,
        coins: account.coins.to_f64(),
        transactions: recent_transactions(&account),
    }))
}

async fn manual_mining(
    State(state): AppState,
    body: Result<Json<AmountRequest>, JsonRejection>,
) -> ApiResult<ManualMiningResponse> {
    let Json(req) = body?;
    let user_id = required_user(&req.user_id)?;
    let amount = required_amount("amount", &req.amount)?;
    let account = state.engine.manual_mine(user_id, amount, now_ms())?;
    Ok(Json(ManualMiningResponse {
        success: true,
        coins: account.coins.to_f64(),
        last_manual: account.last_manual_mining_at,
        transactions: recent_transactions(&account),
    }))
}

// ── Conversions / withdrawals ─────────────────────────────────────────────────

async fn convert_coins_to_pi(
    State(state): AppState,
    body: Result<Json<CoinsToPiRequest>, JsonRejection>,
) -> ApiResult<CoinsToPiResponse> {
    let Json(req) = body?;
    let user_id = required_user(&req.user_id)?;
    let coins = required_amount("coins", &req.coins)?;
    let pi = required_amount("pi", &req.pi)?;
    let account = state.engine.convert(user_id, Asset::Coins, coins, Asset::Pi, pi, now_ms())?;
    Ok(Json(CoinsToPiResponse {
        success: true,
        coins: account.coins.to_f64(),
        pi: account.pi.to_f64(),
        transactions: recent_transactions(&account),
    }))
}

async fn convert_pi_to_usdt(
    State(state): AppState,
    body: Result<Json<PiToUsdtRequest>, JsonRejection>,
) -> ApiResult<PiToUsdtResponse> {
    let Json(req) = body?;
    let user_id = required_user(&req.user_id)?;
    let pi = required_amount("pi", &req.pi)?;
    let usdt = required_amount("usdt", &req.usdt)?;
    let account = state.engine.convert(user_id, Asset::Pi, pi, Asset::Usdt, usdt, now_ms())?;
    Ok(Json(PiToUsdtResponse {
        success: true,
        pi: account.pi.to_f64(),
        usdt: account.usdt.to_f64(),
        transactions: recent_transactions(&account),
    }))
}

async fn withdraw(
    State(state): AppState,
    body: Result<Json<WithdrawRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(req) = body?;
    let user_id = required_user(&req.user_id)?;
    let asset: Asset = required("asset", &req.asset)?.parse()?;
    let address = req.address.as_deref().unwrap_or_default();
    let amount = required_amount("amount", &req.amount)?;
    let account = state.engine.request_withdrawal(user_id, asset, address, amount, now_ms())?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Withdrawal request registered".into(),
        transactions: Some(recent_transactions(&account)),
    }))
}

// ── Referrals ─────────────────────────────────────────────────────────────────

async fn register_referral(
    State(state): AppState,
    body: Result<Json<RegisterReferralRequest>, JsonRejection>,
) -> ApiResult<RegisterReferralResponse> {
    let Json(req) = body?;
    let inviter = required("inviterCode", &req.inviter_code)?;
    let invitee = required_user(&req.user_id)?;
    let (edge, created) = state.engine.register(inviter, invitee, req.timestamp, now_ms())?;
    Ok(Json(RegisterReferralResponse {
        success: true,
        message: if created {
            "Referral registered successfully"
        } else {
            "Referral already registered"
        },
        data: ApiReferralEdge::from(&edge),
    }))
}

async fn referral_stats(
    State(state): AppState,
    body: Result<Json<UserRequest>, JsonRejection>,
) -> ApiResult<ReferralStatsResponse> {
    let Json(req) = body?;
    let user_id = required_user(&req.user_id)?;
    let stats = state.engine.stats(user_id, now_ms())?;
    Ok(Json(ReferralStatsResponse::from(&stats)))
}

async fn activate_referral(
    State(state): AppState,
    body: Result<Json<UserRequest>, JsonRejection>,
) -> ApiResult<ActivateReferralResponse> {
    let Json(req) = body?;
    let user_id = required_user(&req.user_id)?;
    let (edge, changed) = state.engine.activate(user_id, now_ms())?;
    Ok(Json(ActivateReferralResponse {
        success: true,
        message: if changed { "Friend activated" } else { "Friend already active" },
        friend: ApiReferralEdge::from(&edge),
    }))
}

async fn share_referral(
    State(state): AppState,
    body: Result<Json<ShareRequest>, JsonRejection>,
) -> ApiResult<ShareResponse> {
    let Json(req) = body?;
    let user_id = required_user(&req.user_id)?;
    let platform = state.engine.record_share(user_id, req.platform.as_deref());
    Ok(Json(ShareResponse {
        success: true,
        message: format!("Share event on {platform} recorded"),
        platform,
    }))
}

async fn invited_friends(
    State(state): AppState,
    Path(user_id): Path<String>,
) -> ApiResult<FriendListResponse<ApiInvitedFriend>> {
    let user_id = validate_id("userId", &user_id)?;
    let friends = state.engine.invited_friends(user_id, now_ms())?;
    Ok(Json(FriendListResponse::new(friends.iter().map(ApiInvitedFriend::from).collect())))
}

async fn active_friends(
    State(state): AppState,
    Path(user_id): Path<String>,
) -> ApiResult<FriendListResponse<ApiActiveFriend>> {
    let user_id = validate_id("userId", &user_id)?;
    let friends = state.engine.active_friends(user_id, now_ms())?;
    Ok(Json(FriendListResponse::new(friends.iter().map(ApiActiveFriend::from).collect())))
}

// ── Tasks / profile ───────────────────────────────────────────────────────────

async fn complete_task(
    State(state): AppState,
    body: Result<Json<TaskRequest>, JsonRejection>,
) -> ApiResult<TaskCompleteResponse> {
    let Json(req) = body?;
    let user_id = required_user(&req.user_id)?;
    let task_id = required("taskId", &req.task_id)?;
    let account = state.engine.mark_completed(user_id, task_id, now_ms())?;
    Ok(Json(TaskCompleteResponse {
        success: true,
        completed_tasks: account.completed_tasks,
        task_statuses: account.task_statuses,
    }))
}

async fn claim_task(
    State(state): AppState,
    body: Result<Json<TaskRequest>, JsonRejection>,
) -> ApiResult<TaskClaimResponse> {
    let Json(req) = body?;
    let user_id = required_user(&req.user_id)?;
    let task_id = required("taskId", &req.task_id)?;
    let reward = required_amount("reward", &req.reward)?;
    let (account, _paid) = state.engine.claim(user_id, task_id, reward, now_ms())?;
    Ok(Json(TaskClaimResponse {
        success: true,
        coins: account.coins.to_f64(),
        transactions: recent_transactions(&account),
        completed_tasks: account.completed_tasks,
        task_statuses: account.task_statuses,
    }))
}

async fn update_profile(
    State(state): AppState,
    body: Result<Json<ProfileRequest>, JsonRejection>,
) -> ApiResult<ProfileResponse> {
    let Json(req) = body?;
    let user_id = required_user(&req.user_id)?;
    let update = ProfileUpdate { first_name: req.first, last_name: req.last };
    let account = state.engine.update_profile(user_id, &update, now_ms())?;
    Ok(Json(ProfileResponse { success: true, profile: ApiProfile::from(&account.profile) }))
}
