//! Harvest and tend triggers.
//!
//! A keeper pays for every harvest, so it asks the strategy first whether
//! the harvest is worth it. The answer is advisory: a manual harvest is
//! never blocked by a `false` here.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{DEFAULT_DEBT_THRESHOLD, DEFAULT_MAX_REPORT_DELAY, DEFAULT_PROFIT_FACTOR};

/// Tuning knobs for [`HarvestTrigger::should_harvest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestTrigger {
    /// Harvest unconditionally once this many blocks pass without a report.
    pub max_report_delay: u64,
    /// Unrealized losses at or below this are not worth reporting.
    pub debt_threshold: u128,
    /// Required ratio of expected benefit to harvest cost.
    pub profit_factor: u64,
}

impl Default for HarvestTrigger {
    fn default() -> Self {
        Self {
            max_report_delay: DEFAULT_MAX_REPORT_DELAY,
            debt_threshold: DEFAULT_DEBT_THRESHOLD,
            profit_factor: DEFAULT_PROFIT_FACTOR,
        }
    }
}

/// What the trigger needs to know about a registered strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerInputs {
    /// Blocks since the strategy last reported.
    pub blocks_since_report: u64,
    /// What the vault wants back on the next report.
    pub debt_outstanding: u128,
    /// Debt recorded by the vault.
    pub debt: u128,
    /// What the strategy would declare if it reported now.
    pub total_assets: u128,
    /// Credit the vault would extend right now.
    pub credit_available: u128,
}

impl HarvestTrigger {
    /// Decides whether a harvest costing `call_cost` (in asset units) is
    /// worth making.
    pub fn should_harvest(&self, inputs: &TriggerInputs, call_cost: u128) -> bool {
        if inputs.blocks_since_report >= self.max_report_delay {
            debug!(blocks = inputs.blocks_since_report, "harvest overdue");
            return true;
        }
        if inputs.debt_outstanding > 0 {
            debug!(outstanding = inputs.debt_outstanding, "vault wants capital back");
            return true;
        }
        if inputs.total_assets.saturating_add(self.debt_threshold) < inputs.debt {
            debug!(
                debt = inputs.debt,
                total_assets = inputs.total_assets,
                "loss above threshold"
            );
            return true;
        }

        let profit = inputs.total_assets.saturating_sub(inputs.debt);
        let benefit = inputs.credit_available.saturating_add(profit);
        u128::from(self.profit_factor).saturating_mul(call_cost) < benefit
    }

    /// Tending is never needed for a strategy that deploys everything on
    /// every harvest.
    pub fn should_tend(&self, _call_cost: u128) -> bool {
        false
    }
}
