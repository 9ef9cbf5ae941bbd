//! # Lending Market Contract
//!
//! A cToken-style money market for one underlying asset. Suppliers deposit
//! the asset and receive market tokens ("cTokens"); borrowers draw the
//! market's cash and owe interest that compounds per block. Interest grows
//! `total_borrows`, which grows the exchange rate, which grows every
//! supplier's position.
//!
//! ```text
//! exchange_rate = (cash + total_borrows) * 1e18 / total_c_supply
//! position      = c_balance * exchange_rate / 1e18
//! ```
//!
//! Before the first supply the exchange rate is the configured initial
//! rate. All rates are `1e18`-scaled mantissas, as in the markets this
//! models.
//!
//! ## Liquidity
//!
//! A supplier can only withdraw what the market holds as cash. When
//! borrowers have drawn most of it, withdrawals fail with
//! [`VenueError::InsufficientLiquidity`] until borrows are repaid.
//!
//! The borrower side is a single aggregated book: the market tracks total
//! borrows, not per-borrower principal.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use yvault_protocol::config::BLOCKS_PER_YEAR;
use yvault_protocol::math;
use yvault_protocol::token::AssetToken;
use yvault_protocol::venue::{VenueError, YieldVenue};
use yvault_protocol::Address;

/// `1e18`, the fixed-point scale of every rate in this module.
pub const MANTISSA: u128 = 1_000_000_000_000_000_000;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Market parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Underlying per cToken before the first supply, scaled by `1e18`.
    /// 0.2 means one underlying unit mints five cTokens.
    pub initial_exchange_rate: u128,
    /// Interest charged on borrows per block, scaled by `1e18`.
    pub borrow_rate_per_block: u128,
}

impl Default for MarketConfig {
    /// 0.2 initial exchange rate, roughly 10% borrow APR.
    fn default() -> Self {
        Self {
            initial_exchange_rate: MANTISSA / 5,
            borrow_rate_per_block: MANTISSA / 10 / BLOCKS_PER_YEAR as u128,
        }
    }
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// A cToken market.
///
/// As a [`YieldVenue`] it reports the position of `holder`, the account the
/// market was opened for (typically a strategy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendingMarket {
    address: Address,
    underlying: Address,
    holder: Address,
    config: MarketConfig,
    /// Underlying held by the market.
    cash: u128,
    /// Outstanding borrows including accrued interest.
    total_borrows: u128,
    total_c_supply: u128,
    c_balances: HashMap<Address, u128>,
    accrual_block: u64,
}

impl LendingMarket {
    /// Opens a market for `underlying`, reporting `holder`'s position.
    pub fn new(
        address: Address,
        underlying: Address,
        holder: Address,
        config: MarketConfig,
        block: u64,
    ) -> Self {
        Self {
            address,
            underlying,
            holder,
            config,
            cash: 0,
            total_borrows: 0,
            total_c_supply: 0,
            c_balances: HashMap::new(),
            accrual_block: block,
        }
    }

    pub fn underlying(&self) -> Address {
        self.underlying
    }

    pub fn holder(&self) -> Address {
        self.holder
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// Underlying held by the market right now.
    pub fn cash(&self) -> u128 {
        self.cash
    }

    /// cTokens held by the position holder.
    pub fn balance_c(&self) -> u128 {
        self.balance_of_c(&self.holder)
    }

    /// cTokens held by `account`.
    pub fn balance_of_c(&self, account: &Address) -> u128 {
        self.c_balances.get(account).copied().unwrap_or(0)
    }

    pub fn total_c_supply(&self) -> u128 {
        self.total_c_supply
    }

    /// Total borrows as of `block`, including interest not yet accrued.
    pub fn total_borrows_at(&self, block: u64) -> Result<u128, VenueError> {
        let blocks = u128::from(block.saturating_sub(self.accrual_block));
        let factor = self
            .config
            .borrow_rate_per_block
            .checked_mul(blocks)
            .ok_or(VenueError::Overflow)?;
        let interest = scale(self.total_borrows, factor, MANTISSA)?;
        self.total_borrows
            .checked_add(interest)
            .ok_or(VenueError::Overflow)
    }

    /// Underlying per cToken as of `block`, scaled by `1e18`.
    pub fn exchange_rate_at(&self, block: u64) -> Result<u128, VenueError> {
        if self.total_c_supply == 0 {
            return Ok(self.config.initial_exchange_rate);
        }
        let underlying = self
            .cash
            .checked_add(self.total_borrows_at(block)?)
            .ok_or(VenueError::Overflow)?;
        scale(underlying, MANTISSA, self.total_c_supply)
    }

    /// Interest paid to suppliers per block, scaled by `1e18`: the borrow
    /// rate weighted by utilization.
    pub fn supply_rate_per_block(&self) -> u128 {
        let underlying = self.cash.saturating_add(self.total_borrows);
        if underlying == 0 {
            return 0;
        }
        scale(self.config.borrow_rate_per_block, self.total_borrows, underlying).unwrap_or(0)
    }

    /// Underlying value of `account`'s cTokens at `block`.
    pub fn underlying_of(&self, account: &Address, block: u64) -> Result<u128, VenueError> {
        let rate = self.exchange_rate_at(block)?;
        scale(self.balance_of_c(account), rate, MANTISSA)
    }

    /// Rolls interest up to `block`.
    pub fn accrue_interest(&mut self, block: u64) -> Result<(), VenueError> {
        if block <= self.accrual_block {
            return Ok(());
        }
        let borrows = self.total_borrows_at(block)?;
        if borrows > self.total_borrows {
            debug!(
                market = %self.address,
                interest = borrows - self.total_borrows,
                blocks = block - self.accrual_block,
                "interest accrued"
            );
        }
        self.total_borrows = borrows;
        self.accrual_block = block;
        Ok(())
    }

    /// Lends `amount` of the market's cash to `borrower`.
    pub fn borrow(
        &mut self,
        token: &mut dyn AssetToken,
        borrower: &Address,
        amount: u128,
        block: u64,
    ) -> Result<(), VenueError> {
        self.accrue_interest(block)?;
        if amount > self.cash {
            return Err(VenueError::InsufficientLiquidity {
                requested: amount,
                available: self.cash,
            });
        }
        let borrows = self
            .total_borrows
            .checked_add(amount)
            .ok_or(VenueError::Overflow)?;
        token.transfer(&self.address, borrower, amount)?;
        self.cash -= amount;
        self.total_borrows = borrows;
        debug!(market = %self.address, %borrower, amount, "borrow");
        Ok(())
    }

    /// Repays up to `amount` of outstanding borrows from `payer`. Returns
    /// the amount actually repaid.
    pub fn repay_borrow(
        &mut self,
        token: &mut dyn AssetToken,
        payer: &Address,
        amount: u128,
        block: u64,
    ) -> Result<u128, VenueError> {
        self.accrue_interest(block)?;
        let repay = amount.min(self.total_borrows);
        let cash = self.cash.checked_add(repay).ok_or(VenueError::Overflow)?;
        token.transfer(payer, &self.address, repay)?;
        self.cash = cash;
        self.total_borrows -= repay;
        debug!(market = %self.address, %payer, repay, "repay borrow");
        Ok(repay)
    }
}

impl YieldVenue for LendingMarket {
    fn address(&self) -> Address {
        self.address
    }

    /// Supplies `amount` and mints cTokens to `depositor`, rounding down.
    fn deposit(
        &mut self,
        token: &mut dyn AssetToken,
        depositor: &Address,
        amount: u128,
        block: u64,
    ) -> Result<(), VenueError> {
        self.accrue_interest(block)?;
        let rate = self.exchange_rate_at(block)?;
        let minted = scale(amount, MANTISSA, rate.max(1))?;
        if minted == 0 {
            debug!(market = %self.address, amount, "supply below one cToken ignored");
            return Ok(());
        }
        let supply = self
            .total_c_supply
            .checked_add(minted)
            .ok_or(VenueError::Overflow)?;
        let cash = self.cash.checked_add(amount).ok_or(VenueError::Overflow)?;

        token.transfer(depositor, &self.address, amount)?;
        self.cash = cash;
        self.total_c_supply = supply;
        *self.c_balances.entry(*depositor).or_default() += minted;
        debug!(market = %self.address, %depositor, amount, minted, "supply");
        Ok(())
    }

    /// Redeems exactly `amount` of underlying from `recipient`'s position,
    /// burning cTokens rounded up.
    fn withdraw(
        &mut self,
        token: &mut dyn AssetToken,
        recipient: &Address,
        amount: u128,
        block: u64,
    ) -> Result<u128, VenueError> {
        self.accrue_interest(block)?;
        let position = self.underlying_of(recipient, block)?;
        if amount > position {
            return Err(VenueError::PositionTooSmall {
                position,
                requested: amount,
            });
        }
        if amount > self.cash {
            return Err(VenueError::InsufficientLiquidity {
                requested: amount,
                available: self.cash,
            });
        }

        let rate = self.exchange_rate_at(block)?.max(1);
        let held = self.balance_of_c(recipient);
        let burned = math::mul_div_up(amount, MANTISSA, rate)
            .unwrap_or(u128::MAX)
            .min(held);

        token.transfer(&self.address, recipient, amount)?;
        self.cash -= amount;
        self.total_c_supply -= burned;
        self.c_balances.insert(*recipient, held - burned);
        debug!(market = %self.address, %recipient, amount, burned, "redeem");
        Ok(amount)
    }

    fn valuation(&self, block: u64) -> u128 {
        self.underlying_of(&self.holder, block).unwrap_or(0)
    }

    fn withdrawable(&self, block: u64) -> u128 {
        self.valuation(block).min(self.cash)
    }
}

/// Fixed-point `value * numerator / denominator`, truncating.
fn scale(value: u128, numerator: u128, denominator: u128) -> Result<u128, VenueError> {
    math::mul_div(value, numerator, denominator).map_err(|_| VenueError::Overflow)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
