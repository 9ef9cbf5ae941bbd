//! # yVault Contracts
//!
//! The collaborators the vault engine talks to through its two narrow
//! interfaces, implemented the way the on-chain contracts behave:
//!
//! - **Asset Token**: an ERC-20 style ledger with issuer-gated minting
//!   and allowance bookkeeping. This is what the vault holds.
//! - **Lending Market**: a cToken-style money market whose exchange rate
//!   grows as borrowers pay interest. This is where strategies deploy.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow before writing anything.
//! 2. Collaborator failures surface as `TokenError` / `VenueError`, which
//!    the engine folds into `VaultError` and aborts on.
//! 3. Every public type is serializable (serde) for snapshots.

pub mod asset_token;
pub mod lending_market;

pub use asset_token::{Erc20Ledger, TokenInfo};
pub use lending_market::{LendingMarket, MarketConfig, MANTISSA};

/// A strategy that supplies vault credit to a lending market.
pub type LendingStrategy = yvault_protocol::Strategy<LendingMarket>;
