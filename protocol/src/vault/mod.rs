//! # Vault Module: Pooled Deposits, Strategy Debt & Settlement
//!
//! The vault is where depositors' money lives. It issues shares against a
//! single asset, lends idle capital to strategies, and settles their
//! reports. If the strategy is the part that goes out and earns, the vault
//! is the part that keeps the books straight.
//!
//! ## Architecture
//!
//! ```text
//! ledger.rs      Idle balance, share supply, per-holder share balances
//! shares.rs      Asset/share conversion and price per share
//! registry.rs    Registered strategies, their limits and debt
//! allocator.rs   How much credit a strategy may draw
//! settlement.rs  Report validation: gain, loss, fees, new debt
//! events.rs      Log of committed state changes
//! engine.rs      The `Vault` facade tying it all together
//! ```
//!
//! ## Design Principles
//!
//! 1. **All amounts are `u128` in smallest-unit denomination.** Products go
//!    through a 256-bit intermediate and come back checked. Every division
//!    truncates. Blocks and basis points stay `u64`.
//!
//! 2. **Conservation.** `total_assets == idle + Σ outstanding_debt` after
//!    every call, successful or not.
//!
//! 3. **Validate, then move, then commit.** A rejected call writes nothing.
//!
//! 4. **Serializable state.** Every struct in this module derives
//!    `Serialize` and `Deserialize` so vault state can be snapshotted.

pub mod allocator;
pub mod engine;
pub mod events;
pub mod ledger;
pub mod registry;
pub mod settlement;
pub mod shares;

pub use allocator::{CreditBlock, CreditLimits};
pub use engine::{StrategyHandle, Vault, VaultInit, VaultSnapshot};
pub use events::VaultEvent;
pub use ledger::AssetLedger;
pub use registry::{StrategyDebt, StrategyParams, StrategyRecord, StrategyRegistry};
pub use settlement::{plan_settlement, Settlement, SettlementPhase, SettlementPlan, SettlementRequest};
pub use shares::ShareAccounting;
