//! # Share Accounting
//!
//! The single place where assets and shares are converted into each other.
//! Every deposit, withdrawal, and fee mint routes through
//! [`ShareAccounting`], so the rounding rule lives in exactly one spot.
//!
//! ## Pricing
//!
//! ```text
//! price_per_share    = total_assets * 10^decimals / total_shares
//! shares_for_deposit = amount * total_shares / total_assets
//! assets_for_shares  = shares * total_assets / total_shares
//! ```
//!
//! All divisions truncate. With no shares outstanding the vault is in its
//! bootstrap state: deposits mint 1:1 and the price is exactly one unit.

use serde::{Deserialize, Serialize};

use crate::error::VaultError;
use crate::math;

/// A snapshot of the vault's pricing inputs.
///
/// Cheap to build; the vault constructs a fresh one for every operation so
/// it always reflects the current idle balance and total debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareAccounting {
    /// `idle + total_debt`.
    pub total_assets: u128,
    /// Shares outstanding.
    pub total_shares: u128,
    /// Asset decimals; the price is scaled by `10^decimals`.
    pub decimals: u8,
}

impl ShareAccounting {
    pub fn new(total_assets: u128, total_shares: u128, decimals: u8) -> Self {
        Self {
            total_assets,
            total_shares,
            decimals,
        }
    }

    /// `true` while no shares exist.
    pub fn is_bootstrap(&self) -> bool {
        self.total_shares == 0
    }

    /// Value of one whole share (`10^decimals` share units) in asset units.
    pub fn price_per_share(&self) -> Result<u128, VaultError> {
        let unit = math::unit(self.decimals)?;
        if self.is_bootstrap() {
            return Ok(unit);
        }
        math::mul_div(self.total_assets, unit, self.total_shares)
    }

    /// Shares minted for a deposit of `amount`.
    ///
    /// If shares exist but the vault holds no assets (every unit was lost),
    /// new shares cannot be priced and the deposit is rejected.
    pub fn shares_for_deposit(&self, amount: u128) -> Result<u128, VaultError> {
        if self.is_bootstrap() {
            return Ok(amount);
        }
        if self.total_assets == 0 {
            return Err(VaultError::InvalidAmount(
                "vault has shares but no assets; deposits cannot be priced".into(),
            ));
        }
        math::mul_div(amount, self.total_shares, self.total_assets)
    }

    /// Assets released for burning `shares`.
    pub fn assets_for_shares(&self, shares: u128) -> Result<u128, VaultError> {
        if self.is_bootstrap() {
            return Ok(0);
        }
        math::mul_div(shares, self.total_assets, self.total_shares)
    }
}
