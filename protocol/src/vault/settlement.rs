//! # Harvest Settlement
//!
//! The protocol a strategy follows to tell the vault what its position is
//! worth, realize the gain or loss against its recorded debt, hand back
//! capital it should not hold, and draw new credit.
//!
//! ## Cycle
//!
//! ```text
//!   Idle ──report──► Reporting ──commit──► Reconciled
//!    ▲                                          │
//!    └──────────── next report starts here ─────┘
//! ```
//!
//! A settlement is planned in full by [`plan_settlement`] before anything
//! is written. If any step fails, the plan is dropped and the vault is
//! exactly as it was.
//!
//! ## Accounting
//!
//! ```text
//! gain      = max(0, held - debt)
//! loss      = max(0, debt - held)
//! fees      = gain * fee_bps / 10_000        (paid in newly minted shares)
//! new debt  = held - debt_payment + credit
//! new idle  = idle + debt_payment - credit
//! ```
//!
//! Fees are minted as shares rather than paid out of idle assets, so fee
//! payment never drains liquidity; every holder is diluted proportionally
//! instead. Losses burn nothing: they shrink debt, which lowers
//! `price_per_share` for everybody.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::VaultError;
use crate::math;

use super::allocator::CreditLimits;
use super::registry::StrategyRecord;

/// Where a strategy is in its settlement cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SettlementPhase {
    #[default]
    Idle,
    Reporting,
    Reconciled,
}

impl SettlementPhase {
    /// Starts a cycle. Both `Idle` and `Reconciled` begin afresh.
    pub fn begin(self, strategy: &Address) -> Result<SettlementPhase, VaultError> {
        match self {
            SettlementPhase::Idle | SettlementPhase::Reconciled => Ok(SettlementPhase::Reporting),
            SettlementPhase::Reporting => Err(VaultError::inactive(
                strategy,
                "a settlement is already in progress",
            )),
        }
    }
}

/// What a strategy submits when it reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    /// The strategy's current valuation of everything it holds.
    pub total_assets_held: u128,
    /// Capital handed back to the vault with this report.
    pub debt_payment: u128,
    /// New capital requested from the vault.
    pub credit_requested: u128,
}

impl SettlementRequest {
    /// A report that returns everything and asks for nothing, as required
    /// once a strategy's exit is latched.
    pub fn full_repayment(total_assets_held: u128) -> Self {
        Self {
            total_assets_held,
            debt_payment: total_assets_held,
            credit_requested: 0,
        }
    }
}

/// A validated settlement, computed but not yet applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    pub gain: u128,
    pub loss: u128,
    /// Strategist fee, in asset units.
    pub strategist_fee: u128,
    /// Vault performance fee to the rewards recipient, in asset units.
    pub rewards_fee: u128,
    pub debt_payment: u128,
    pub credit: u128,
    pub debt_before: u128,
    pub debt_after: u128,
    pub idle_after: u128,
    pub block: u64,
}

impl SettlementPlan {
    /// Strategist and rewards fees together.
    pub fn total_fee(&self) -> u128 {
        self.strategist_fee.saturating_add(self.rewards_fee)
    }
}

/// Validates `request` against `record` and computes every resulting
/// quantity without mutating anything.
///
/// # Errors
///
/// - [`VaultError::StrategyInactive`] if the exit is latched and the report
///   does not return everything, or a settlement is already running.
/// - [`VaultError::InsufficientBalance`] if the payment exceeds what the
///   strategy holds.
/// - [`VaultError::DebtLimitExceeded`] / [`VaultError::RateLimitExceeded`] /
///   [`VaultError::InsufficientBalance`] if the credit request breaks a
///   ceiling, or the resulting debt would sit above the debt limit.
pub fn plan_settlement(
    record: &StrategyRecord,
    request: &SettlementRequest,
    idle: u128,
    rewards_fee_bps: u64,
    block: u64,
    paused: bool,
) -> Result<SettlementPlan, VaultError> {
    let strategy = &record.strategy;
    record.phase.begin(strategy)?;

    if block < record.debt.last_report_block {
        return Err(VaultError::InvalidAmount(format!(
            "report at block {block} precedes last report at block {}",
            record.debt.last_report_block
        )));
    }

    let held = request.total_assets_held;
    if record.exit.is_latched()
        && (request.credit_requested > 0 || request.debt_payment < held)
    {
        return Err(VaultError::inactive(
            strategy,
            "emergency exit latched; the report must repay everything it holds",
        ));
    }

    if request.debt_payment > held {
        return Err(VaultError::InsufficientBalance {
            available: held,
            requested: request.debt_payment,
        });
    }

    let debt_before = record.debt.outstanding_debt;
    let gain = held.saturating_sub(debt_before);
    let loss = debt_before.saturating_sub(held);

    let strategist_fee = math::bps_of(gain, record.params.performance_fee_bps)?;
    // Both fees together never exceed the gain they are charged on.
    let rewards_fee = math::bps_of(gain, rewards_fee_bps)?.min(gain - strategist_fee);

    let debt_after_payment = held - request.debt_payment;
    let idle_after_payment = math::add(idle, request.debt_payment)?;

    let limits = CreditLimits::evaluate(
        record,
        debt_after_payment,
        idle_after_payment,
        block,
        paused,
    );
    limits.check_request(strategy, request.credit_requested)?;

    let debt_after = math::add(debt_after_payment, request.credit_requested)?;
    if !record.exit.is_latched() && debt_after > record.params.debt_limit {
        return Err(VaultError::DebtLimitExceeded {
            limit: record.params.debt_limit,
            requested: debt_after,
        });
    }

    Ok(SettlementPlan {
        gain,
        loss,
        strategist_fee,
        rewards_fee,
        debt_payment: request.debt_payment,
        credit: request.credit_requested,
        debt_before,
        debt_after,
        idle_after: idle_after_payment - request.credit_requested,
        block,
    })
}

/// The committed result of a settlement, returned to the reporting
/// strategy and recorded in the vault's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub strategy: Address,
    pub gain: u128,
    pub loss: u128,
    pub debt_payment: u128,
    pub credit: u128,
    pub debt_after: u128,
    /// Shares minted to the strategist.
    pub strategist_fee_shares: u128,
    /// Shares minted to the rewards recipient.
    pub rewards_fee_shares: u128,
    pub price_per_share: u128,
    pub block: u64,
}
