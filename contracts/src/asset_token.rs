//! # Asset Token Contract
//!
//! A single fungible token with the usual ledger surface: balances,
//! allowances, `transfer`, `transfer_from`, `approve`. This is the asset a
//! vault accepts and strategies deploy.
//!
//! ## Security Model
//!
//! - **Mint gating**: only the issuer fixed at creation can mint.
//! - **Burn authorization**: a holder can only burn its own balance.
//! - **Supply tracking**: total supply and per-address balances move
//!   together, and every credit is overflow-checked before anything is
//!   written.
//! - **Allowances**: `transfer_from` spends the caller's allowance over
//!   the source balance. An allowance of `u128::MAX` is treated as
//!   unlimited and never decremented.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use yvault_protocol::token::{AssetToken, TokenError};
use yvault_protocol::Address;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Metadata and supply information for the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The token contract's address.
    pub address: Address,
    /// Human-readable name (e.g., "Curve DAO Token").
    pub name: String,
    /// Ticker symbol (e.g., "CRV").
    pub symbol: String,
    /// Number of decimal places.
    pub decimals: u8,
    /// The only account allowed to mint.
    pub issuer: Address,
    /// Current total supply in the smallest denomination.
    pub total_supply: u128,
}

/// An ERC-20 style token ledger.
///
/// In production this state would live on chain. The in-memory
/// representation here drives the vault engine in tests and simulations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Erc20Ledger {
    info: TokenInfo,
    balances: HashMap<Address, u128>,
    /// `owner -> (spender -> allowance)`.
    allowances: HashMap<Address, HashMap<Address, u128>>,
}

impl Erc20Ledger {
    /// Creates a token with zero supply. The issuer must [`mint`](Self::mint)
    /// the initial supply.
    pub fn new(
        address: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
        issuer: Address,
    ) -> Self {
        Self {
            info: TokenInfo {
                address,
                name: name.into(),
                symbol: symbol.into(),
                decimals,
                issuer,
                total_supply: 0,
            },
            balances: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    /// Token metadata.
    pub fn info(&self) -> &TokenInfo {
        &self.info
    }

    /// Current total supply.
    pub fn total_supply(&self) -> u128 {
        self.info.total_supply
    }

    /// Number of accounts with a non-zero balance.
    pub fn holder_count(&self) -> usize {
        self.balances.values().filter(|b| **b > 0).count()
    }

    /// Mints `amount` to `to`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::NotPermitted`] if `caller` is not the issuer.
    /// - [`TokenError::Overflow`] if the supply or the balance would overflow.
    pub fn mint(&mut self, caller: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        if *caller != self.info.issuer {
            return Err(TokenError::NotPermitted(*caller));
        }
        let new_supply = self
            .info
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let new_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.info.total_supply = new_supply;
        self.balances.insert(*to, new_balance);
        debug!(token = %self.info.symbol, %to, amount, "minted");
        Ok(())
    }

    /// Burns `amount` of the caller's own balance.
    pub fn burn(&mut self, caller: &Address, amount: u128) -> Result<(), TokenError> {
        self.debit(caller, amount)?;
        // Supply is always at least any single balance.
        self.info.total_supply -= amount;
        debug!(token = %self.info.symbol, holder = %caller, amount, "burned");
        Ok(())
    }

    fn debit(&mut self, from: &Address, amount: u128) -> Result<(), TokenError> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                holder: *from,
                balance,
                amount,
            });
        }
        self.balances.insert(*from, balance - amount);
        Ok(())
    }

    /// Moves `amount` between two accounts after checking both sides.
    fn move_balance(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                holder: *from,
                balance,
                amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.balances.insert(*from, balance - amount);
        self.balances.insert(*to, credited);
        Ok(())
    }
}

impl AssetToken for Erc20Ledger {
    fn address(&self) -> Address {
        self.info.address
    }

    fn symbol(&self) -> &str {
        &self.info.symbol
    }

    fn decimals(&self) -> u8 {
        self.info.decimals
    }

    fn balance_of(&self, holder: &Address) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(&mut self, caller: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        self.move_balance(caller, to, amount)?;
        debug!(token = %self.info.symbol, from = %caller, %to, amount, "transfer");
        Ok(())
    }

    fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let allowance = self.allowance(from, caller);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                owner: *from,
                spender: *caller,
                allowance,
                amount,
            });
        }
        self.move_balance(from, to, amount)?;
        if allowance != u128::MAX {
            self.allowances
                .entry(*from)
                .or_default()
                .insert(*caller, allowance - amount);
        }
        debug!(token = %self.info.symbol, spender = %caller, %from, %to, amount, "transfer_from");
        Ok(())
    }

    fn approve(&mut self, caller: &Address, spender: &Address, amount: u128) -> Result<(), TokenError> {
        self.allowances
            .entry(*caller)
            .or_default()
            .insert(*spender, amount);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> Address {
        Address::repeat_byte(1)
    }

    fn alice() -> Address {
        Address::repeat_byte(2)
    }

    fn bob() -> Address {
        Address::repeat_byte(3)
    }

    fn crv() -> Erc20Ledger {
        Erc20Ledger::new(Address::repeat_byte(0xcc), "Curve DAO Token", "CRV", 18, issuer())
    }

    #[test]
    fn only_issuer_mints() {
        let mut token = crv();
        token.mint(&issuer(), &alice(), 1_000).unwrap();
        assert_eq!(token.balance_of(&alice()), 1_000);
        assert_eq!(token.total_supply(), 1_000);

        assert!(matches!(
            token.mint(&alice(), &alice(), 1),
            Err(TokenError::NotPermitted(_))
        ));
        assert_eq!(token.total_supply(), 1_000);
    }

    #[test]
    fn mint_overflow_is_rejected() {
        let mut token = crv();
        token.mint(&issuer(), &alice(), u128::MAX).unwrap();
        assert!(matches!(
            token.mint(&issuer(), &bob(), 1),
            Err(TokenError::Overflow)
        ));
        assert_eq!(token.balance_of(&bob()), 0);
    }

    #[test]
    fn transfer_moves_balance() {
        let mut token = crv();
        token.mint(&issuer(), &alice(), 100).unwrap();
        token.transfer(&alice(), &bob(), 40).unwrap();
        assert_eq!(token.balance_of(&alice()), 60);
        assert_eq!(token.balance_of(&bob()), 40);

        assert!(matches!(
            token.transfer(&alice(), &bob(), 61),
            Err(TokenError::InsufficientBalance { balance: 60, .. })
        ));
    }

    #[test]
    fn transfer_from_spends_allowance() {
        let mut token = crv();
        token.mint(&issuer(), &alice(), 100).unwrap();

        assert!(matches!(
            token.transfer_from(&bob(), &alice(), &bob(), 10),
            Err(TokenError::InsufficientAllowance { allowance: 0, .. })
        ));

        token.approve(&alice(), &bob(), 30).unwrap();
        token.transfer_from(&bob(), &alice(), &bob(), 25).unwrap();
        assert_eq!(token.allowance(&alice(), &bob()), 5);
        assert_eq!(token.balance_of(&bob()), 25);
    }

    #[test]
    fn unlimited_allowance_is_not_decremented() {
        let mut token = crv();
        token.mint(&issuer(), &alice(), 100).unwrap();
        token.approve(&alice(), &bob(), u128::MAX).unwrap();
        token.transfer_from(&bob(), &alice(), &bob(), 100).unwrap();
        assert_eq!(token.allowance(&alice(), &bob()), u128::MAX);
    }

    #[test]
    fn burn_reduces_supply() {
        let mut token = crv();
        token.mint(&issuer(), &alice(), 100).unwrap();
        token.burn(&alice(), 30).unwrap();
        assert_eq!(token.total_supply(), 70);
        assert!(token.burn(&bob(), 1).is_err());
        assert_eq!(token.holder_count(), 1);
    }
}
