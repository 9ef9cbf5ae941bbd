//! Error types for vault and strategy operations.
//!
//! Every public operation that can fail returns a [`VaultError`]. Failures
//! are synchronous rejections of the single call that raised them; the
//! engine never retries internally and never keeps partial state from a
//! rejected call.

use thiserror::Error;

use crate::address::{Address, AddressError};
use crate::token::TokenError;
use crate::venue::VenueError;

/// Errors that can occur during vault, registry, settlement, and
/// strategy operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The caller holds none of the roles the operation requires.
    #[error("unauthorized: {caller} may not {operation}")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// Human-readable name of the attempted operation.
        operation: String,
    },

    /// Zero or otherwise unusable quantity.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Shares or assets below the requested amount.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// What the caller (or the vault) actually has.
        available: u128,
        /// What the operation needed.
        requested: u128,
    },

    /// Fee rate above 10_000 bps.
    #[error("invalid fee rate: {0} bps exceeds 10000")]
    InvalidFeeRate(u64),

    /// A strategy with outstanding debt cannot be removed.
    #[error("strategy {strategy} still owes {outstanding_debt}")]
    StrategyNotRepaid {
        /// The strategy being removed.
        strategy: Address,
        /// Debt still recorded against it.
        outstanding_debt: u128,
    },

    /// The strategy is already registered.
    #[error("strategy {0} is already active")]
    AlreadyActive(Address),

    /// The strategy is unknown, or its exit latch forbids the operation.
    #[error("strategy {strategy} is inactive: {reason}")]
    StrategyInactive {
        /// The strategy in question.
        strategy: Address,
        /// Why the operation was refused.
        reason: String,
    },

    /// Requested debt would exceed the strategy's debt limit.
    #[error("debt limit exceeded: limit {limit}, resulting debt {requested}")]
    DebtLimitExceeded {
        /// The strategy's debt limit.
        limit: u128,
        /// The debt the operation would have produced.
        requested: u128,
    },

    /// Requested credit exceeds what the rate limit has accrued since the
    /// last report.
    #[error("rate limit exceeded: {allowed} accrued over {blocks} blocks, requested {requested}")]
    RateLimitExceeded {
        /// Credit the rate limit allows right now.
        allowed: u128,
        /// Blocks elapsed since the last report.
        blocks: u64,
        /// Credit requested.
        requested: u128,
    },

    /// The vault is paused; deposits and new credit are disabled.
    #[error("vault is paused")]
    VaultPaused,

    /// A checked arithmetic operation overflowed or divided by zero.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// The asset token rejected a transfer or approval.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// The yield venue rejected a deposit or withdrawal.
    #[error("venue error: {0}")]
    Venue(#[from] VenueError),

    /// A principal identity was malformed.
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),
}

impl VaultError {
    /// Builds an [`VaultError::Unauthorized`] for `operation`.
    pub fn unauthorized(caller: &Address, operation: impl ToString) -> Self {
        VaultError::Unauthorized {
            caller: *caller,
            operation: operation.to_string(),
        }
    }

    /// Builds a [`VaultError::StrategyInactive`].
    pub fn inactive(strategy: &Address, reason: impl Into<String>) -> Self {
        VaultError::StrategyInactive {
            strategy: *strategy,
            reason: reason.into(),
        }
    }

    /// `true` when the same call may succeed later without anyone changing
    /// configuration: a later block, more idle liquidity, an unpause.
    /// Keepers use this to decide between "retry next block" and "alert".
    pub fn is_retryable(&self) -> bool {
        match self {
            VaultError::RateLimitExceeded { .. }
            | VaultError::InsufficientBalance { .. }
            | VaultError::VaultPaused => true,
            VaultError::Venue(e) => e.is_liquidity(),
            _ => false,
        }
    }
}
