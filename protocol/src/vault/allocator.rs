//! # Allocator
//!
//! Decides how much new capital a strategy may draw. Three independent
//! ceilings apply, and the smallest wins:
//!
//! 1. **Exposure**: `debt_limit - outstanding_debt`.
//! 2. **Growth rate**: `rate_limit_per_block * blocks_since_last_report`.
//! 3. **Liquidity**: the vault's idle balance. The vault never lends out
//!    more than it actually holds, whatever the other ceilings permit.
//!
//! A paused vault or a latched exit zeroes the credit outright.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::VaultError;
use crate::guard::ExitState;

use super::registry::StrategyRecord;

/// Why credit is unavailable regardless of the ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditBlock {
    None,
    VaultPaused,
    ExitLatched,
}

/// The three ceilings evaluated for one strategy at one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditLimits {
    /// `debt_limit - debt`, zero if the strategy is at or over its limit.
    pub debt_headroom: u128,
    /// What the rate limit has accrued since the last report.
    pub rate_allowance: u128,
    /// Idle vault balance.
    pub idle: u128,
    /// Blocks since the last report.
    pub blocks_elapsed: u64,
    /// Debt the ceilings were evaluated against.
    pub debt: u128,
    /// The strategy's debt limit.
    pub debt_limit: u128,
    pub block: CreditBlock,
}

impl CreditLimits {
    /// Evaluates the ceilings for `record` as if its debt were `debt`.
    ///
    /// Settlement passes the post-reconciliation debt here; the plain
    /// `credit_available` query passes the recorded debt.
    pub fn evaluate(
        record: &StrategyRecord,
        debt: u128,
        idle: u128,
        current_block: u64,
        paused: bool,
    ) -> Self {
        let blocks_elapsed = current_block.saturating_sub(record.debt.last_report_block);
        let block = if record.exit.is_latched() {
            CreditBlock::ExitLatched
        } else if paused {
            CreditBlock::VaultPaused
        } else {
            CreditBlock::None
        };

        Self {
            debt_headroom: record.params.debt_limit.saturating_sub(debt),
            rate_allowance: record
                .params
                .rate_limit_per_block
                .saturating_mul(u128::from(blocks_elapsed)),
            idle,
            blocks_elapsed,
            debt,
            debt_limit: record.params.debt_limit,
            block,
        }
    }

    /// `min(headroom, rate allowance, idle)`, or zero when blocked.
    pub fn available(&self) -> u128 {
        if self.block != CreditBlock::None {
            return 0;
        }
        self.debt_headroom.min(self.rate_allowance).min(self.idle)
    }

    /// Checks a credit request against each ceiling in turn and reports the
    /// first one it violates.
    pub fn check_request(&self, strategy: &Address, requested: u128) -> Result<(), VaultError> {
        if requested == 0 {
            return Ok(());
        }
        match self.block {
            CreditBlock::ExitLatched => {
                return Err(VaultError::inactive(
                    strategy,
                    "emergency exit latched; credit is disabled",
                ))
            }
            CreditBlock::VaultPaused => return Err(VaultError::VaultPaused),
            CreditBlock::None => {}
        }
        if requested > self.debt_headroom {
            return Err(VaultError::DebtLimitExceeded {
                limit: self.debt_limit,
                requested: self.debt.saturating_add(requested),
            });
        }
        if requested > self.rate_allowance {
            return Err(VaultError::RateLimitExceeded {
                allowed: self.rate_allowance,
                blocks: self.blocks_elapsed,
                requested,
            });
        }
        if requested > self.idle {
            return Err(VaultError::InsufficientBalance {
                available: self.idle,
                requested,
            });
        }
        Ok(())
    }
}

/// What a strategy should hand back on its next settlement: everything once
/// its exit is latched, otherwise whatever sits above its debt limit.
pub fn debt_outstanding(record: &StrategyRecord) -> u128 {
    let debt = record.debt.outstanding_debt;
    match record.exit {
        ExitState::Active => debt.saturating_sub(record.params.debt_limit),
        ExitState::ExitRequested | ExitState::Exited => debt,
    }
}
