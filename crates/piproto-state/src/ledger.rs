//! Balance-changing operations on a single account.
//!
//! Amounts arrive already parsed as [`Amount`], so negative and non-numeric
//! inputs are rejected before any of these run. Mining and conversion amounts
//! are caller-supplied; the server only enforces conversion rates when
//! [`EngineConfig::rates`](crate::EngineConfig) is set.

use piproto_core::account::{Account, TaskStatus};
use piproto_core::constants::WITHDRAW_ADDRESS_PREVIEW_CHARS;
use piproto_core::error::PiprotoError;
use piproto_core::ledger::EntryKind;
use piproto_core::types::{Amount, Asset, TimestampMs};
use tracing::{debug, info, warn};

use crate::engine::StateEngine;

impl StateEngine {
    // ── Timed mining ─────────────────────────────────────────────────────────

    /// Open a mining session at `at` (or `now`). An open session is overwritten.
    pub fn start_mining(
        &self,
        user_id: &str,
        at: Option<TimestampMs>,
        now: TimestampMs,
    ) -> Result<Account, PiprotoError> {
        let start = at.unwrap_or(now);
        let (account, ()) = self.update_account(user_id, now, |acc| {
            acc.mining_start = Some(start);
            Ok(())
        })?;
        info!(user_id, mining_start = start, "mining session started");

        if self.config.activate_on_mining {
            match self.activate(user_id, now) {
                Ok(_) | Err(PiprotoError::ReferralNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(account)
    }

    /// Close the mining session, crediting `amount` coins when non-zero.
    pub fn claim_mining(
        &self,
        user_id: &str,
        amount: Amount,
        now: TimestampMs,
    ) -> Result<Account, PiprotoError> {
        let (account, ()) = self.update_account(user_id, now, |acc| {
            if !amount.is_zero() {
                acc.credit(Asset::Coins, amount)?;
                acc.push_entry(EntryKind::Earn, amount, "Mining session reward".into(), now);
            }
            acc.mining_start = None;
            Ok(())
        })?;
        info!(user_id, %amount, "mining session claimed");
        Ok(account)
    }

    // ── Manual mining ────────────────────────────────────────────────────────

    /// Credit a manual-mining click, at most once per cooldown window.
    pub fn manual_mine(
        &self,
        user_id: &str,
        amount: Amount,
        now: TimestampMs,
    ) -> Result<Account, PiprotoError> {
        let cooldown = self.config.manual_cooldown_ms;
        let result = self.update_account(user_id, now, |acc| {
            if let Some(last) = acc.last_manual_mining_at {
                let elapsed = (now - last).max(0);
                if elapsed < cooldown {
                    return Err(PiprotoError::CooldownActive {
                        remaining_ms: cooldown - elapsed,
                    });
                }
            }
            acc.credit(Asset::Coins, amount)?;
            acc.last_manual_mining_at = Some(now);
            acc.push_entry(EntryKind::Earn, amount, "Manual mining click".into(), now);
            Ok(())
        });

        match result {
            Ok((account, ())) => {
                debug!(user_id, %amount, "manual mining credited");
                Ok(account)
            }
            Err(e) => {
                warn!(user_id, error = %e, "manual mining rejected");
                Err(e)
            }
        }
    }

    // ── Conversions ──────────────────────────────────────────────────────────

    /// Convert `from_amount` of `from` into `to`. Supported pairs are
    /// coins → pi and pi → usdt.
    pub fn convert(
        &self,
        user_id: &str,
        from: Asset,
        from_amount: Amount,
        to: Asset,
        to_amount: Amount,
        now: TimestampMs,
    ) -> Result<Account, PiprotoError> {
        let rate = match (from, to) {
            (Asset::Coins, Asset::Pi) => self.config.rates.map(|r| r.coins_per_pi),
            (Asset::Pi, Asset::Usdt) => self.config.rates.map(|r| r.pi_per_usdt),
            _ => return Err(PiprotoError::UnsupportedConversion { from, to }),
        };
        if from_amount.is_zero() {
            return Err(PiprotoError::InvalidAmount(format!(
                "{from} amount must be greater than zero"
            )));
        }

        let credited = match rate {
            Some(rate) => {
                let computed = from_amount.checked_div_rate(rate).ok_or_else(|| {
                    PiprotoError::InvalidAmount(format!("no valid {from} → {to} rate"))
                })?;
                if computed != to_amount {
                    debug!(user_id, requested = %to_amount, %computed, "conversion amount replaced by server rate");
                }
                computed
            }
            None => to_amount,
        };
        if credited.is_zero() {
            return Err(PiprotoError::InvalidAmount(format!(
                "{to} amount must be greater than zero"
            )));
        }

        let note = match to {
            Asset::Pi => format!("Convert {from_amount} coins → {} Pi", credited.to_fixed2()),
            _ => format!("Convert {from_amount} Pi → {} USDT", credited.to_fixed2()),
        };

        let result = self.update_account(user_id, now, |acc| {
            acc.debit(from, from_amount)?;
            acc.credit(to, credited)?;
            acc.push_entry(EntryKind::Swap, credited, note, now);
            Ok(())
        });

        match result {
            Ok((account, ())) => {
                info!(user_id, %from, %from_amount, %to, %credited, "converted");
                Ok(account)
            }
            Err(e) => {
                warn!(user_id, %from, %to, error = %e, "conversion rejected");
                Err(e)
            }
        }
    }

    // ── Withdrawals ──────────────────────────────────────────────────────────

    /// Record a withdrawal request. Audit-only: balances are not debited
    /// because there is no payout integration behind it.
    pub fn request_withdrawal(
        &self,
        user_id: &str,
        asset: Asset,
        address: &str,
        amount: Amount,
        now: TimestampMs,
    ) -> Result<Account, PiprotoError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(PiprotoError::MissingField("address"));
        }
        if amount.is_zero() {
            return Err(PiprotoError::InvalidAmount(
                "withdrawal amount must be greater than zero".into(),
            ));
        }
        let preview: String = address.chars().take(WITHDRAW_ADDRESS_PREVIEW_CHARS).collect();
        let note = format!("Withdraw request {amount} {} → {preview}...", asset.ticker());

        let (account, ()) = self.update_account(user_id, now, |acc| {
            acc.push_entry(EntryKind::Withdraw, amount, note, now);
            Ok(())
        })?;
        info!(user_id, %asset, %amount, "withdrawal request recorded");
        Ok(account)
    }

    // ── Task rewards ─────────────────────────────────────────────────────────

    /// Pay `reward` for `task_id` unless it was already paid. Returns the
    /// account and whether this call paid out.
    pub fn claim_task_reward(
        &self,
        user_id: &str,
        task_id: &str,
        reward: Amount,
        now: TimestampMs,
    ) -> Result<(Account, bool), PiprotoError> {
        let (account, paid) = self.update_account(user_id, now, |acc| {
            acc.task_statuses.insert(task_id.to_string(), TaskStatus::Completed);
            if acc.completed_tasks.contains(task_id) {
                return Ok(false);
            }
            acc.credit(Asset::Coins, reward)?;
            acc.completed_tasks.insert(task_id.to_string());
            acc.push_entry(EntryKind::Earn, reward, format!("Task: {task_id}"), now);
            Ok(true)
        })?;
        if paid {
            info!(user_id, task_id, %reward, "task reward paid");
        } else {
            debug!(user_id, task_id, "task reward already claimed");
        }
        Ok((account, paid))
    }
}
