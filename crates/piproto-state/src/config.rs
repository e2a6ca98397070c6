use piproto_core::constants::MANUAL_MINING_COOLDOWN_MS;
use piproto_core::types::Amount;

/// Server-side exchange rates. When configured, conversions ignore the
/// caller-supplied target amount and compute it from these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionRates {
    /// Coins paid for one pi.
    pub coins_per_pi: Amount,
    /// Pi paid for one usdt.
    pub pi_per_usdt: Amount,
}

/// Tunables for the ledger and referral engines.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum gap between manual-mining claims (milliseconds).
    pub manual_cooldown_ms: i64,
    /// None = trust caller-supplied conversion amounts.
    pub rates: Option<ConversionRates>,
    /// Activate the caller's referral edge when they start a mining session.
    pub activate_on_mining: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            manual_cooldown_ms: MANUAL_MINING_COOLDOWN_MS,
            rates: None,
            activate_on_mining: false,
        }
    }
}
