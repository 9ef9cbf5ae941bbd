//! # Yield Venue Interface
//!
//! A strategy earns yield by parking capital in an external venue (a
//! lending market, a liquidity pool). The engine treats the venue as a
//! black box with three verbs: put capital in, take capital out, and say
//! what the position is worth. Impairment, illiquidity, and how yield is
//! actually produced are the venue's business.
//!
//! Injecting the venue as a trait lets the allocation and settlement
//! logic run against deterministic simulated venues in tests.

use thiserror::Error;

use crate::address::Address;
use crate::token::{AssetToken, TokenError};

/// Errors surfaced by a yield venue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VenueError {
    /// The venue's cash on hand cannot cover the withdrawal.
    #[error("insufficient venue liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity {
        /// Amount asked for.
        requested: u128,
        /// Amount the venue can pay out right now.
        available: u128,
    },

    /// The position is smaller than the withdrawal.
    #[error("position too small: holds {position}, requested {requested}")]
    PositionTooSmall {
        /// Current position valuation.
        position: u128,
        /// Amount asked for.
        requested: u128,
    },

    /// Token movement between the strategy and the venue failed.
    #[error("venue token transfer failed: {0}")]
    Token(#[from] TokenError),

    /// Venue-internal arithmetic overflowed.
    #[error("venue arithmetic overflow")]
    Overflow,
}

impl VenueError {
    /// `true` for conditions that clear once the venue regains cash.
    pub fn is_liquidity(&self) -> bool {
        matches!(self, VenueError::InsufficientLiquidity { .. })
    }
}

/// An external place where a strategy deploys capital.
///
/// One venue instance represents one strategy's position. `block` is the
/// host's current block, which lets interest-bearing venues accrue lazily.
pub trait YieldVenue {
    /// The venue's address; capital sent to the venue is held here.
    fn address(&self) -> Address;

    /// Moves `amount` from `depositor` into the venue position.
    fn deposit(
        &mut self,
        token: &mut dyn AssetToken,
        depositor: &Address,
        amount: u128,
        block: u64,
    ) -> Result<(), VenueError>;

    /// Moves up to `amount` out of the position to `recipient`, returning
    /// what was actually paid out.
    fn withdraw(
        &mut self,
        token: &mut dyn AssetToken,
        recipient: &Address,
        amount: u128,
        block: u64,
    ) -> Result<u128, VenueError>;

    /// Current value of the position in asset units.
    fn valuation(&self, block: u64) -> u128;

    /// How much of the position could be withdrawn right now. Defaults to
    /// the full valuation for venues with unlimited liquidity.
    fn withdrawable(&self, block: u64) -> u128 {
        self.valuation(block)
    }
}
