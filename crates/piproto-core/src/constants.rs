/// ─── PiProtocol Backend Constants ───────────────────────────────────────────
///
/// Three denominations: coins (mined), pi and usdt (converted).
/// All amounts are fixed-point: 1 unit = 1,000,000 micros.

// ── Amounts ──────────────────────────────────────────────────────────────────

/// 1 unit of any denomination expressed in micros.
pub const MICROS_PER_UNIT: u64 = 1_000_000;

/// Default per-account mining rate reported to clients (0.002 coins).
pub const DEFAULT_MINING_RATE_MICROS: u64 = 2_000;

/// Mining speed-up advertised for each active referred friend (0.001).
pub const ACTIVE_FRIEND_MINING_BOOST_MICROS: u64 = 1_000;

// ── Time ─────────────────────────────────────────────────────────────────────

/// Minimum gap between two manual-mining claims (milliseconds).
pub const MANUAL_MINING_COOLDOWN_MS: i64 = 10_000;

/// One day in milliseconds.
pub const MS_PER_DAY: i64 = 86_400_000;

// ── Ledger ───────────────────────────────────────────────────────────────────

/// Number of most-recent ledger entries returned to clients.
pub const RECENT_TRANSACTIONS_LIMIT: usize = 10;

/// Characters of a withdrawal address kept in the ledger note.
pub const WITHDRAW_ADDRESS_PREVIEW_CHARS: usize = 12;

// ── Referrals ────────────────────────────────────────────────────────────────

/// Inviter code used for users that signed up without a referrer.
/// Never resolves to an account and never accrues counters.
pub const DIRECT_INVITER: &str = "direct";

/// Maximum entries in the invited / active friend lists.
pub const FRIEND_LIST_LIMIT: usize = 50;

// ── Identity ─────────────────────────────────────────────────────────────────

/// Maximum length (characters) of a user identifier.
pub const MAX_USER_ID_CHARS: usize = 128;

// ── Profile ──────────────────────────────────────────────────────────────────

/// Maximum length (characters) of a first or last name.
pub const MAX_PROFILE_NAME_CHARS: usize = 64;
