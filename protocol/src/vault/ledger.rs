//! # Asset Ledger
//!
//! The vault's own books: how much of the asset sits idle in the vault,
//! how many shares exist, and who holds them.
//!
//! The ledger does not know about strategies. Debt is tracked by the
//! [`StrategyRegistry`](super::registry::StrategyRegistry); total assets
//! are `idle + total_debt`, assembled by the vault.
//!
//! Invariant: the sum of all holder balances equals `total_shares`. Mint
//! and burn are the only operations that touch either, and they move both
//! together.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::VaultError;
use crate::math;

/// Idle balance, share supply, and per-holder share balances.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetLedger {
    /// Asset units held by the vault and not lent to any strategy.
    idle: u128,
    /// Total shares outstanding.
    total_shares: u128,
    /// Holder -> share balance. Zero balances are pruned.
    balances: BTreeMap<Address, u128>,
}

impl AssetLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn idle(&self) -> u128 {
        self.idle
    }

    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    /// Shares held by `holder`.
    pub fn shares_of(&self, holder: &Address) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Number of distinct holders with a nonzero balance.
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Adds `amount` to the idle balance.
    pub fn credit_idle(&mut self, amount: u128) -> Result<u128, VaultError> {
        self.idle = math::add(self.idle, amount)?;
        Ok(self.idle)
    }

    /// Removes `amount` from the idle balance.
    ///
    /// # Errors
    ///
    /// [`VaultError::InsufficientBalance`] if the vault doesn't hold that
    /// much idle.
    pub fn debit_idle(&mut self, amount: u128) -> Result<u128, VaultError> {
        if amount > self.idle {
            return Err(VaultError::InsufficientBalance {
                available: self.idle,
                requested: amount,
            });
        }
        self.idle -= amount;
        Ok(self.idle)
    }

    /// Issues `shares` to `holder`.
    pub fn mint(&mut self, holder: &Address, shares: u128) -> Result<(), VaultError> {
        if shares == 0 {
            return Ok(());
        }
        let total = math::add(self.total_shares, shares)?;
        let balance = math::add(self.shares_of(holder), shares)?;
        self.total_shares = total;
        self.balances.insert(*holder, balance);
        Ok(())
    }

    /// Destroys `shares` held by `holder`.
    ///
    /// # Errors
    ///
    /// [`VaultError::InsufficientBalance`] if `holder` has fewer shares.
    pub fn burn(&mut self, holder: &Address, shares: u128) -> Result<(), VaultError> {
        let balance = self.shares_of(holder);
        if shares > balance {
            return Err(VaultError::InsufficientBalance {
                available: balance,
                requested: shares,
            });
        }
        let remaining = balance - shares;
        if remaining == 0 {
            self.balances.remove(holder);
        } else {
            self.balances.insert(*holder, remaining);
        }
        self.total_shares = math::sub(self.total_shares, shares)?;
        Ok(())
    }

    /// Sum of all holder balances. Equal to [`total_shares`](Self::total_shares)
    /// unless something is badly wrong.
    pub fn sum_of_balances(&self) -> u128 {
        self.balances.values().sum()
    }
}
