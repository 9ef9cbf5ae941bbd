//! In-crate collaborators for unit tests. The full reference token and
//! lending market live in `yvault-contracts`.

use std::collections::HashMap;

use crate::address::Address;
use crate::token::{AssetToken, TokenError};
use crate::venue::{VenueError, YieldVenue};

pub(crate) const DECIMALS: u8 = 6;

pub(crate) fn token_address() -> Address {
    Address::repeat_byte(0xaa)
}

/// Bare balance/allowance ledger.
#[derive(Debug, Default)]
pub(crate) struct TestToken {
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
}

impl TestToken {
    pub(crate) fn mint(&mut self, to: &Address, amount: u128) {
        *self.balances.entry(*to).or_default() += amount;
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
}

impl AssetToken for TestToken {
    fn address(&self) -> Address {
        token_address()
    }

    fn symbol(&self) -> &str {
        "CRV"
    }

    fn decimals(&self) -> u8 {
        DECIMALS
    }

    fn balance_of(&self, holder: &Address) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    fn transfer(&mut self, caller: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        self.debit(caller, amount)?;
        self.mint(to, amount);
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
        self.debit(from, amount)?;
        self.allowances.insert((*from, *caller), allowance - amount);
        self.mint(to, amount);
        Ok(())
    }

    fn approve(&mut self, caller: &Address, spender: &Address, amount: u128) -> Result<(), TokenError> {
        self.allowances.insert((*caller, *spender), amount);
        Ok(())
    }
}

/// A venue whose position only moves when the test says so.
#[derive(Debug)]
pub(crate) struct TestVenue {
    pub(crate) address: Address,
    pub(crate) position: u128,
    /// Cash the venue will pay out; `None` is unlimited.
    pub(crate) cash_cap: Option<u128>,
}

impl TestVenue {
    pub(crate) fn new(byte: u8) -> Self {
        Self {
            address: Address::repeat_byte(byte),
            position: 0,
            cash_cap: None,
        }
    }

    /// Credits `amount` of yield to the position.
    pub(crate) fn accrue(&mut self, token: &mut TestToken, amount: u128) {
        token.mint(&self.address, amount);
        self.position += amount;
    }

    /// Writes `amount` off the position.
    pub(crate) fn impair(&mut self, token: &mut TestToken, amount: u128) {
        let burn = Address::repeat_byte(0xde);
        let venue = self.address;
        // The burn address stands in for wherever the lost capital went.
        token.transfer(&venue, &burn, amount).unwrap();
        self.position -= amount;
    }
}

impl YieldVenue for TestVenue {
    fn address(&self) -> Address {
        self.address
    }

    fn deposit(
        &mut self,
        token: &mut dyn AssetToken,
        depositor: &Address,
        amount: u128,
        _block: u64,
    ) -> Result<(), VenueError> {
        token.transfer(depositor, &self.address, amount)?;
        self.position += amount;
        Ok(())
    }

    fn withdraw(
        &mut self,
        token: &mut dyn AssetToken,
        recipient: &Address,
        amount: u128,
        block: u64,
    ) -> Result<u128, VenueError> {
        if amount > self.position {
            return Err(VenueError::PositionTooSmall {
                position: self.position,
                requested: amount,
            });
        }
        let available = self.withdrawable(block);
        if amount > available {
            return Err(VenueError::InsufficientLiquidity {
                requested: amount,
                available,
            });
        }
        token.transfer(&self.address, recipient, amount)?;
        self.position -= amount;
        Ok(amount)
    }

    fn valuation(&self, _block: u64) -> u128 {
        self.position
    }

    fn withdrawable(&self, _block: u64) -> u128 {
        self.cash_cap.map_or(self.position, |cap| cap.min(self.position))
    }
}
