//! # Strategy Registry
//!
//! The ordered set of strategies the vault lends to, with each one's
//! parameters, debt, and exit latch. Registration order doubles as the
//! withdrawal queue: when the vault needs liquidity it asks strategies in
//! the order they were added.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::config::MAX_BPS;
use crate::error::VaultError;
use crate::guard::ExitState;
use crate::math;

use super::settlement::SettlementPhase;

/// Governance-controlled limits for one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyParams {
    /// Maximum outstanding debt, in asset units.
    pub debt_limit: u128,
    /// Maximum debt increase per elapsed block.
    pub rate_limit_per_block: u128,
    /// Strategist share of realized gains, in bps.
    pub performance_fee_bps: u64,
    /// Block at which the strategy was added.
    pub activation_block: u64,
}

impl StrategyParams {
    /// Rejects fees above 100%.
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.performance_fee_bps > MAX_BPS {
            return Err(VaultError::InvalidFeeRate(self.performance_fee_bps));
        }
        Ok(())
    }
}

/// The vault's authoritative record of what a strategy owes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StrategyDebt {
    /// Asset units currently lent to the strategy.
    pub outstanding_debt: u128,
    /// Block of the last settlement (or activation). Never decreases.
    pub last_report_block: u64,
}

/// Everything the vault knows about one registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRecord {
    /// The strategy's address.
    pub strategy: Address,
    pub params: StrategyParams,
    pub debt: StrategyDebt,
    pub exit: ExitState,
    pub phase: SettlementPhase,
    /// Lifetime realized gains.
    pub total_gain: u128,
    /// Lifetime realized losses.
    pub total_loss: u128,
}

impl StrategyRecord {
    /// A freshly activated strategy with no debt.
    pub fn new(strategy: Address, params: StrategyParams) -> Self {
        Self {
            strategy,
            debt: StrategyDebt {
                outstanding_debt: 0,
                last_report_block: params.activation_block,
            },
            params,
            exit: ExitState::Active,
            phase: SettlementPhase::Idle,
            total_gain: 0,
            total_loss: 0,
        }
    }
}

/// Ordered strategy set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyRegistry {
    /// Registration order; also the withdrawal queue.
    queue: Vec<Address>,
    records: HashMap<Address, StrategyRecord>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a strategy.
    ///
    /// # Errors
    ///
    /// [`VaultError::AlreadyActive`] for a duplicate,
    /// [`VaultError::InvalidFeeRate`] for a fee above 10_000 bps.
    pub fn add(&mut self, record: StrategyRecord) -> Result<(), VaultError> {
        if self.records.contains_key(&record.strategy) {
            return Err(VaultError::AlreadyActive(record.strategy));
        }
        record.params.validate()?;
        self.queue.push(record.strategy);
        self.records.insert(record.strategy, record);
        Ok(())
    }

    /// Deregisters a fully repaid strategy and returns its final record.
    ///
    /// # Errors
    ///
    /// [`VaultError::StrategyInactive`] if unknown,
    /// [`VaultError::StrategyNotRepaid`] if it still carries debt.
    pub fn remove(&mut self, strategy: &Address) -> Result<StrategyRecord, VaultError> {
        let record = self.get(strategy)?;
        if record.debt.outstanding_debt > 0 {
            return Err(VaultError::StrategyNotRepaid {
                strategy: *strategy,
                outstanding_debt: record.debt.outstanding_debt,
            });
        }
        self.queue.retain(|s| s != strategy);
        self.records
            .remove(strategy)
            .ok_or_else(|| VaultError::inactive(strategy, "not registered"))
    }

    /// Looks up a registered strategy.
    pub fn get(&self, strategy: &Address) -> Result<&StrategyRecord, VaultError> {
        self.records
            .get(strategy)
            .ok_or_else(|| VaultError::inactive(strategy, "not registered"))
    }

    /// Mutable lookup.
    pub fn get_mut(&mut self, strategy: &Address) -> Result<&mut StrategyRecord, VaultError> {
        self.records
            .get_mut(strategy)
            .ok_or_else(|| VaultError::inactive(strategy, "not registered"))
    }

    pub fn contains(&self, strategy: &Address) -> bool {
        self.records.contains_key(strategy)
    }

    /// Strategies in withdrawal-queue order.
    pub fn queue(&self) -> &[Address] {
        &self.queue
    }

    /// Records in withdrawal-queue order.
    pub fn iter(&self) -> impl Iterator<Item = &StrategyRecord> {
        self.queue.iter().filter_map(|s| self.records.get(s))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Sum of outstanding debt across all strategies.
    pub fn total_debt(&self) -> Result<u128, VaultError> {
        self.records
            .values()
            .try_fold(0u128, |acc, r| math::add(acc, r.debt.outstanding_debt))
    }
}
