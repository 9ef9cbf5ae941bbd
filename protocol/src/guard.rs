//! # Lifecycle Guard
//!
//! Access control and the emergency state machines layered over the vault
//! and its strategies.
//!
//! ## Roles
//!
//! | Role         | Scope         | Rights |
//! |--------------|---------------|--------|
//! | `Governance` | vault         | everything: parameters, strategies, pause, forced exits |
//! | `Guardian`   | vault         | pause only |
//! | `Strategist` | one strategy  | its keeper, its exit, parameter proposals within bounds |
//! | `Keeper`     | one strategy  | harvest and tend, nothing else |
//! | `Strategy`   | itself        | report to the vault, revoke itself |
//! | `Vault`      | its strategies| pull liquidity for withdrawals |
//!
//! Every privileged entry point goes through [`authorize`]. There is no
//! other place where a caller is compared against a role holder.
//!
//! ## Exit latch
//!
//! ```text
//!    ┌──────────┐  request_exit  ┌───────────────┐  debt == 0  ┌────────┐
//!    │  Active  │───────────────►│ ExitRequested │────────────►│ Exited │
//!    └──────────┘                └───────────────┘             └────────┘
//! ```
//!
//! No transition leads back to `Active`.
//!
//! ## Vault status
//!
//! `Active ⇄ Paused`. Governance or the guardian may pause; only
//! governance may unpause.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::VaultError;

// ---------------------------------------------------------------------------
// Roles & Operations
// ---------------------------------------------------------------------------

/// A capability held by a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Governance,
    Guardian,
    Strategist,
    Keeper,
    Strategy,
    Vault,
}

/// Every privileged operation in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    // Vault-level
    AddStrategy,
    RemoveStrategy,
    UpdateStrategy,
    RevokeStrategy,
    Report,
    SetGovernance,
    SetRewards,
    SetGuardian,
    SetPerformanceFee,
    Pause,
    Unpause,
    // Strategy-level
    SetStrategist,
    SetKeeper,
    SetEmergencyExit,
    Harvest,
    Tend,
    Liquidate,
}

impl Operation {
    /// Roles that may perform this operation.
    pub fn allowed_roles(self) -> &'static [Role] {
        use Role::*;
        match self {
            Operation::AddStrategy
            | Operation::RemoveStrategy
            | Operation::SetGovernance
            | Operation::SetRewards
            | Operation::SetGuardian
            | Operation::SetPerformanceFee
            | Operation::Unpause => &[Governance],
            Operation::Pause => &[Governance, Guardian],
            Operation::UpdateStrategy => &[Governance, Strategist],
            Operation::RevokeStrategy => &[Governance, Strategy],
            Operation::Report => &[Strategy],
            Operation::SetStrategist | Operation::SetKeeper | Operation::SetEmergencyExit => {
                &[Governance, Strategist]
            }
            Operation::Harvest | Operation::Tend => &[Governance, Strategist, Keeper],
            Operation::Liquidate => &[Vault],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::AddStrategy => "add strategy",
            Operation::RemoveStrategy => "remove strategy",
            Operation::UpdateStrategy => "update strategy",
            Operation::RevokeStrategy => "revoke strategy",
            Operation::Report => "report",
            Operation::SetGovernance => "set governance",
            Operation::SetRewards => "set rewards",
            Operation::SetGuardian => "set guardian",
            Operation::SetPerformanceFee => "set performance fee",
            Operation::Pause => "pause",
            Operation::Unpause => "unpause",
            Operation::SetStrategist => "set strategist",
            Operation::SetKeeper => "set keeper",
            Operation::SetEmergencyExit => "set emergency exit",
            Operation::Harvest => "harvest",
            Operation::Tend => "tend",
            Operation::Liquidate => "liquidate",
        };
        f.write_str(name)
    }
}

/// Who holds which role in the context of one call.
///
/// Vault-level calls fill `governance` and `guardian`; strategy-level calls
/// additionally fill the strategy's own principals. Unset roles match
/// nobody.
#[derive(Debug, Clone, Default)]
pub struct Roles {
    pub governance: Option<Address>,
    pub guardian: Option<Address>,
    pub strategist: Option<Address>,
    pub keeper: Option<Address>,
    pub strategy: Option<Address>,
    pub vault: Option<Address>,
}

impl Roles {
    fn holder(&self, role: Role) -> Option<&Address> {
        match role {
            Role::Governance => self.governance.as_ref(),
            Role::Guardian => self.guardian.as_ref(),
            Role::Strategist => self.strategist.as_ref(),
            Role::Keeper => self.keeper.as_ref(),
            Role::Strategy => self.strategy.as_ref(),
            Role::Vault => self.vault.as_ref(),
        }
    }
}

/// Decides whether `caller` may perform `operation`.
///
/// Returns the first role (in [`Operation::allowed_roles`] order) that the
/// caller holds, or [`VaultError::Unauthorized`] when it holds none.
pub fn authorize(operation: Operation, roles: &Roles, caller: &Address) -> Result<Role, VaultError> {
    operation
        .allowed_roles()
        .iter()
        .copied()
        .find(|role| roles.holder(*role) == Some(caller))
        .ok_or_else(|| VaultError::unauthorized(caller, operation))
}

// ---------------------------------------------------------------------------
// Exit latch
// ---------------------------------------------------------------------------

/// Per-strategy emergency exit state. One-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExitState {
    /// Normal operation.
    #[default]
    Active,
    /// Exit latched; the strategy may only return capital.
    ExitRequested,
    /// Exit latched and every unit of debt has been returned.
    Exited,
}

impl ExitState {
    /// `Active -> ExitRequested`. Any other starting state is rejected,
    /// since the latch can only be set once.
    pub fn request_exit(self, strategy: &Address) -> Result<ExitState, VaultError> {
        match self {
            ExitState::Active => Ok(ExitState::ExitRequested),
            ExitState::ExitRequested | ExitState::Exited => {
                Err(VaultError::inactive(strategy, "emergency exit already set"))
            }
        }
    }

    /// Advances `ExitRequested -> Exited` once no debt remains. A no-op in
    /// every other case.
    pub fn after_settlement(self, remaining_debt: u128) -> ExitState {
        match self {
            ExitState::ExitRequested if remaining_debt == 0 => ExitState::Exited,
            other => other,
        }
    }

    /// `true` once the latch has been set.
    pub fn is_latched(self) -> bool {
        !matches!(self, ExitState::Active)
    }
}

// ---------------------------------------------------------------------------
// Vault status
// ---------------------------------------------------------------------------

/// Vault-wide operating status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VaultStatus {
    #[default]
    Active,
    Paused,
}

impl VaultStatus {
    /// `true` while paused.
    pub fn is_paused(self) -> bool {
        matches!(self, VaultStatus::Paused)
    }
}
