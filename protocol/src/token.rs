//! # Asset Token Interface
//!
//! The vault accepts exactly one fungible asset. It never holds the token
//! ledger itself; it talks to it through [`AssetToken`], which mirrors the
//! usual fungible-token surface (`balance_of`, `transfer`, `transfer_from`,
//! `approve`).
//!
//! The engine assumes standard semantics: transfers move exactly the
//! requested amount (no fee-on-transfer) and do not call back into the
//! vault. Those are assumptions about the token, not something this crate
//! can enforce.

use thiserror::Error;

use crate::address::Address;

/// Errors surfaced by an asset token implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The sender's balance is below the transfer amount.
    #[error("insufficient token balance: {holder} has {balance}, needs {amount}")]
    InsufficientBalance {
        /// The account being debited.
        holder: Address,
        /// Its current balance.
        balance: u128,
        /// The amount requested.
        amount: u128,
    },

    /// The spender's allowance is below the transfer amount.
    #[error("insufficient allowance: {spender} may move {allowance} for {owner}, needs {amount}")]
    InsufficientAllowance {
        /// The token owner.
        owner: Address,
        /// The account spending on the owner's behalf.
        spender: Address,
        /// Current allowance.
        allowance: u128,
        /// The amount requested.
        amount: u128,
    },

    /// A credit would overflow the recipient's balance or the supply.
    #[error("token balance overflow")]
    Overflow,

    /// The caller may not perform this token operation (e.g. minting).
    #[error("token operation not permitted for {0}")]
    NotPermitted(Address),
}

/// Fungible balance ledger consumed by the vault and its strategies.
///
/// The `caller` argument plays the role of the transaction sender: the
/// host passes the identity on whose behalf the call is made.
pub trait AssetToken {
    /// The token's own address.
    fn address(&self) -> Address;

    /// Ticker symbol, used to derive the share-token symbol.
    fn symbol(&self) -> &str;

    /// Decimal places of the smallest unit.
    fn decimals(&self) -> u8;

    /// Balance held by `holder`.
    fn balance_of(&self, holder: &Address) -> u128;

    /// How much `spender` may still move on behalf of `owner`.
    fn allowance(&self, owner: &Address, spender: &Address) -> u128;

    /// Moves `amount` from `caller` to `to`.
    fn transfer(&mut self, caller: &Address, to: &Address, amount: u128) -> Result<(), TokenError>;

    /// Moves `amount` from `from` to `to`, spending `caller`'s allowance.
    fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError>;

    /// Sets `spender`'s allowance over `caller`'s balance to `amount`.
    fn approve(&mut self, caller: &Address, spender: &Address, amount: u128)
        -> Result<(), TokenError>;
}
