// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # yVault Protocol: Core Library
//!
//! A pooled yield vault: depositors put a single asset in, receive shares,
//! and governance lends the pooled capital to strategies that chase yield
//! elsewhere. Strategies periodically report back, realizing gains or
//! losses against what they borrowed, and the share price moves with them.
//!
//! ## Architecture
//!
//! - **vault**: Share ledger, strategy registry, credit allocation and
//!   harvest settlement behind the [`vault::Vault`] facade.
//! - **strategy**: The base strategy: deploys vault credit into a yield
//!   venue, harvests, and decides when a harvest is worth paying for.
//! - **guard**: Roles, the single authorization check, exit latches and
//!   the vault pause switch.
//! - **token** / **venue**: The two collaborator interfaces the engine
//!   talks to: the asset ledger and wherever capital is deployed.
//! - **address**: 20-byte principal identities.
//! - **math**: Checked `u128`-intermediate arithmetic.
//! - **config**: Protocol constants and harvest-trigger defaults.
//!
//! ## Design Philosophy
//!
//! 1. Conservation is sacred: `total_assets == idle + Σ debt`, always.
//! 2. Every division rounds down, in the vault's favor.
//! 3. Validate first, mutate last. A failed call leaves no trace.
//! 4. If it touches money, it has tests. Plural.

pub mod address;
pub mod config;
pub mod error;
pub mod guard;
pub mod math;
pub mod strategy;
pub mod token;
pub mod vault;
pub mod venue;

#[cfg(test)]
pub(crate) mod testing;

pub use address::Address;
pub use error::VaultError;
pub use strategy::Strategy;
pub use token::{AssetToken, TokenError};
pub use vault::{SettlementRequest, StrategyHandle, Vault, VaultInit};
pub use venue::{VenueError, YieldVenue};
