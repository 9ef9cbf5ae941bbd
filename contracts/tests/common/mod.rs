//! Shared fixtures for the integration tests: a token, a vault, and either
//! a lending-market strategy or a hand-driven strategy.

#![allow(dead_code)]

use yvault_contracts::{Erc20Ledger, LendingMarket, LendingStrategy, MarketConfig, MANTISSA};
use yvault_protocol::token::AssetToken;
use yvault_protocol::vault::{Settlement, SettlementRequest, StrategyHandle, Vault, VaultInit};
use yvault_protocol::{Address, VaultError};

pub const DECIMALS: u8 = 18;
pub const UNIT: u128 = 1_000_000_000_000_000_000;

pub fn deployer() -> Address {
    Address::repeat_byte(0xd0)
}
pub fn gov() -> Address {
    Address::repeat_byte(0x01)
}
pub fn rewards() -> Address {
    Address::repeat_byte(0x02)
}
pub fn guardian() -> Address {
    Address::repeat_byte(0x03)
}
pub fn strategist() -> Address {
    Address::repeat_byte(0x04)
}
pub fn keeper() -> Address {
    Address::repeat_byte(0x05)
}
pub fn borrower() -> Address {
    Address::repeat_byte(0x06)
}
pub fn rando() -> Address {
    Address::repeat_byte(0x09)
}
pub fn user(i: u8) -> Address {
    Address::repeat_byte(0x10 + i)
}

pub fn token_address() -> Address {
    Address::derive(&deployer(), 0)
}
pub fn vault_address() -> Address {
    Address::derive(&deployer(), 1)
}
pub fn market_address() -> Address {
    Address::derive(&deployer(), 2)
}
pub fn strategy_address() -> Address {
    Address::derive(&strategist(), 0)
}

pub fn new_token() -> Erc20Ledger {
    Erc20Ledger::new(token_address(), "Curve DAO Token", "CRV", DECIMALS, deployer())
}

pub fn new_vault(token: &Erc20Ledger) -> Vault {
    Vault::new(
        VaultInit {
            address: vault_address(),
            governance: gov(),
            rewards: rewards(),
            guardian: Some(guardian()),
            name: Some(String::new()),
            symbol: Some(String::new()),
        },
        token,
    )
    .unwrap()
}

/// Mints `amount` to `holder`, approves the vault, and deposits.
pub fn deposit(
    vault: &mut Vault,
    token: &mut Erc20Ledger,
    holder: &Address,
    amount: u128,
) -> Result<u128, VaultError> {
    token.mint(&deployer(), holder, amount).unwrap();
    token.approve(holder, &vault_address(), amount).unwrap();
    vault.deposit(holder, amount, token)
}

// ---------------------------------------------------------------------------
// Lending-market world
// ---------------------------------------------------------------------------

/// A vault lending to a strategy that supplies a lending market, with a
/// borrower generating interest on the other side.
pub struct World {
    pub token: Erc20Ledger,
    pub vault: Vault,
    pub strategy: LendingStrategy,
    pub block: u64,
}

impl World {
    /// Governance seeds the vault with `seed`; the strategy is added at
    /// block 0 with the given limits and a 50 bps fee.
    pub fn new(seed: u128, debt_limit: u128, rate_limit: u128) -> Self {
        let mut token = new_token();
        let mut vault = new_vault(&token);
        if seed > 0 {
            deposit(&mut vault, &mut token, &gov(), seed).unwrap();
        }
        let market = LendingMarket::new(
            market_address(),
            token.address(),
            strategy_address(),
            MarketConfig {
                initial_exchange_rate: MANTISSA / 5,
                borrow_rate_per_block: MANTISSA / 10_000,
            },
            0,
        );
        let mut strategy = LendingStrategy::new(strategy_address(), &vault, strategist(), market);
        strategy.set_keeper(&strategist(), &vault, keeper()).unwrap();
        vault
            .add_strategy(&gov(), &strategy, debt_limit, rate_limit, 50, 0)
            .unwrap();
        Self {
            token,
            vault,
            strategy,
            block: 0,
        }
    }

    pub fn mine(&mut self, blocks: u64) {
        self.block += blocks;
    }

    pub fn deposit(&mut self, holder: &Address, amount: u128) -> Result<u128, VaultError> {
        deposit(&mut self.vault, &mut self.token, holder, amount)
    }

    pub fn withdraw(&mut self, holder: &Address, shares: u128) -> Result<u128, VaultError> {
        self.vault.withdraw(
            holder,
            shares,
            &mut self.token,
            &mut [&mut self.strategy],
            self.block,
        )
    }

    pub fn harvest(&mut self) -> Result<Settlement, VaultError> {
        self.strategy
            .harvest(&keeper(), &mut self.vault, &mut self.token, self.block)
    }

    /// The borrower draws `amount` of the market's cash.
    pub fn borrow(&mut self, amount: u128) -> Result<(), VaultError> {
        let block = self.block;
        self.strategy
            .venue_mut()
            .borrow(&mut self.token, &borrower(), amount, block)?;
        Ok(())
    }

    /// The borrower repays everything it owes, interest included.
    pub fn repay_all(&mut self) -> Result<u128, VaultError> {
        let block = self.block;
        let owed = self.strategy.venue().total_borrows_at(block)?;
        let held = self.token.balance_of(&borrower());
        if held < owed {
            self.token.mint(&deployer(), &borrower(), owed - held).unwrap();
        }
        Ok(self
            .strategy
            .venue_mut()
            .repay_borrow(&mut self.token, &borrower(), owed, block)?)
    }

    /// Σ outstanding debt as recorded per strategy.
    pub fn sum_of_debts(&self) -> u128 {
        self.vault
            .strategies()
            .map(|r| r.debt.outstanding_debt)
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Hand-driven strategy
// ---------------------------------------------------------------------------

/// A strategy that keeps everything as loose tokens and reports exactly
/// what the test tells it to.
pub struct ManualStrategy {
    pub address: Address,
}

impl ManualStrategy {
    pub fn new(byte: u8) -> Self {
        Self {
            address: Address::repeat_byte(byte),
        }
    }

    /// Approves the payment and reports.
    pub fn report(
        &self,
        vault: &mut Vault,
        token: &mut Erc20Ledger,
        held: u128,
        payment: u128,
        credit: u128,
        block: u64,
    ) -> Result<Settlement, VaultError> {
        token.approve(&self.address, &vault.address(), payment).unwrap();
        vault.report(
            &self.address,
            SettlementRequest {
                total_assets_held: held,
                debt_payment: payment,
                credit_requested: credit,
            },
            token,
            block,
        )
    }
}

impl StrategyHandle for ManualStrategy {
    fn address(&self) -> Address {
        self.address
    }

    fn vault(&self) -> Address {
        vault_address()
    }

    fn want(&self) -> Address {
        token_address()
    }

    fn strategist(&self) -> Address {
        strategist()
    }

    fn liquid_assets(&self, token: &dyn AssetToken, _block: u64) -> u128 {
        token.balance_of(&self.address)
    }

    fn liquidate(
        &mut self,
        caller: &Address,
        token: &mut dyn AssetToken,
        amount: u128,
        _block: u64,
    ) -> Result<u128, VaultError> {
        let freed = amount.min(token.balance_of(&self.address));
        token.transfer(&self.address, caller, freed)?;
        Ok(freed)
    }
}
