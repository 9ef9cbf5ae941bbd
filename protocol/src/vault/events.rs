//! Vault event log.
//!
//! Every committed state change appends one [`VaultEvent`]. Rejected calls
//! append nothing. Keepers and the CLI read the log to report what
//! happened during a run.

use serde::{Deserialize, Serialize};

use crate::address::Address;

use super::registry::StrategyParams;
use super::settlement::Settlement;

/// A committed vault state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VaultEvent {
    Deposit {
        holder: Address,
        amount: u128,
        shares: u128,
    },
    Withdraw {
        holder: Address,
        amount: u128,
        shares: u128,
    },
    StrategyAdded {
        strategy: Address,
        params: StrategyParams,
    },
    StrategyUpdated {
        strategy: Address,
        params: StrategyParams,
    },
    StrategyRevoked {
        strategy: Address,
    },
    StrategyRemoved {
        strategy: Address,
    },
    StrategyReported(Settlement),
    /// Capital pulled from a strategy to fund a withdrawal.
    StrategyLiquidated {
        strategy: Address,
        amount: u128,
    },
    Paused {
        by: Address,
    },
    Unpaused {
        by: Address,
    },
    GovernanceChanged {
        governance: Address,
    },
    RewardsChanged {
        rewards: Address,
    },
    GuardianChanged {
        guardian: Address,
    },
    PerformanceFeeChanged {
        fee_bps: u64,
    },
}
