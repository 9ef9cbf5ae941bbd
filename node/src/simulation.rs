//! # Simulated Deployment
//!
//! Instantiates a [`DeploymentConfig`] against the reference contracts: the
//! asset ledger, the vault, and one lending-market strategy per configured
//! strategy. Each market has a borrower on the other side whose interest is
//! the strategies' yield.
//!
//! Contract addresses are derived from the deployer, so the same config
//! always produces the same deployment:
//!
//! | Contract         | Address                              |
//! |------------------|--------------------------------------|
//! | token            | `derive(deployer, 0)`                |
//! | vault            | `derive(deployer, 1)`                |
//! | market `i`       | `derive(deployer, 2 + i)`            |
//! | strategy `i`     | `derive(strategist_i, i)`            |
//! | borrower `i`     | `derive(market_i, 0)`                |

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use yvault_contracts::{Erc20Ledger, LendingMarket, LendingStrategy};
use yvault_protocol::config::MAX_BPS;
use yvault_protocol::math;
use yvault_protocol::token::AssetToken;
use yvault_protocol::vault::{Settlement, StrategyHandle, Vault, VaultInit, VaultSnapshot};
use yvault_protocol::venue::YieldVenue;
use yvault_protocol::{Address, VaultError};

use crate::config::DeploymentConfig;

/// Addresses of one deployed strategy and its market.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyDeployment {
    pub strategy: Address,
    pub market: Address,
    pub strategist: Address,
    pub keeper: Address,
}

/// Everything a deployment produced, for the `deploy` report.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReport {
    pub token: Address,
    pub vault: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub governance: Address,
    pub rewards: Address,
    pub guardian: Address,
    pub strategies: Vec<StrategyDeployment>,
}

/// A live deployment advancing block by block.
pub struct Simulation {
    deployer: Address,
    token: Erc20Ledger,
    vault: Vault,
    strategies: Vec<LendingStrategy>,
    block: u64,
}

impl Simulation {
    /// Deploys everything `config` describes at block 0 and makes the seed
    /// deposit.
    pub fn deploy(config: &DeploymentConfig) -> Result<Self> {
        config.validate()?;
        let deployer = config.deployer;

        let mut token = Erc20Ledger::new(
            Address::derive(&deployer, 0),
            config.token.name.clone(),
            config.token.symbol.clone(),
            config.token.decimals,
            deployer,
        );
        let mut vault = Vault::new(
            VaultInit {
                address: Address::derive(&deployer, 1),
                governance: config.governance,
                rewards: config.rewards,
                guardian: config.guardian,
                name: config.name.clone(),
                symbol: config.symbol.clone(),
            },
            &token,
        )
        .context("vault deployment rejected")?;
        if config.performance_fee_bps > 0 {
            vault.set_performance_fee(&config.governance, config.performance_fee_bps)?;
        }
        info!(vault = %vault.address(), name = vault.name(), symbol = vault.symbol(), "vault deployed");

        let mut strategies = Vec::with_capacity(config.strategies.len());
        for (index, params) in config.strategies.iter().enumerate() {
            let nonce = index as u64;
            let address = Address::derive(&params.strategist, nonce);
            let market = LendingMarket::new(
                Address::derive(&deployer, 2 + nonce),
                token.address(),
                address,
                params.market,
                0,
            );
            let mut strategy =
                LendingStrategy::new(address, &vault, params.strategist, market).with_reserve(params.reserve);
            if let Some(keeper) = params.keeper {
                strategy.set_keeper(&params.strategist, &vault, keeper)?;
            }
            vault
                .add_strategy(
                    &config.governance,
                    &strategy,
                    params.debt_limit,
                    params.rate_limit_per_block,
                    params.performance_fee_bps,
                    0,
                )
                .with_context(|| format!("strategy {index} rejected by the vault"))?;
            strategies.push(strategy);
        }

        if config.seed_deposit > 0 {
            token.mint(&deployer, &config.governance, config.seed_deposit)?;
            token.approve(&config.governance, &vault.address(), config.seed_deposit)?;
            vault
                .deposit(&config.governance, config.seed_deposit, &mut token)
                .context("seed deposit rejected")?;
        }

        Ok(Self {
            deployer,
            token,
            vault,
            strategies,
            block: 0,
        })
    }

    pub fn report(&self) -> DeploymentReport {
        DeploymentReport {
            token: self.token.address(),
            vault: self.vault.address(),
            name: self.vault.name().to_string(),
            symbol: self.vault.symbol().to_string(),
            decimals: self.vault.decimals(),
            governance: self.vault.governance(),
            rewards: self.vault.rewards(),
            guardian: self.vault.guardian(),
            strategies: self
                .strategies
                .iter()
                .map(|s| StrategyDeployment {
                    strategy: s.address(),
                    market: s.venue().address(),
                    strategist: s.strategist(),
                    keeper: s.keeper(),
                })
                .collect(),
        }
    }

    pub fn block(&self) -> u64 {
        self.block
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    #[cfg(test)]
    pub fn vault_mut(&mut self) -> &mut Vault {
        &mut self.vault
    }

    pub fn strategies(&self) -> &[LendingStrategy] {
        &self.strategies
    }

    pub fn snapshot(&self) -> VaultSnapshot {
        self.vault.snapshot()
    }

    /// Moves the chain forward to `block`. Blocks never go backwards.
    pub fn advance_to(&mut self, block: u64) {
        self.block = self.block.max(block);
    }

    // -----------------------------------------------------------------------
    // Vault users
    // -----------------------------------------------------------------------

    /// A depositor address distinct from every deployed contract.
    pub fn depositor(&self, index: u64) -> Address {
        Address::derive(&self.deployer, 1_000 + index)
    }

    /// Funds `holder` from the deployer and deposits on its behalf.
    pub fn deposit(&mut self, holder: &Address, amount: u128) -> Result<u128> {
        self.token.mint(&self.deployer, holder, amount)?;
        self.token.approve(holder, &self.vault.address(), amount)?;
        Ok(self.vault.deposit(holder, amount, &mut self.token)?)
    }

    /// Redeems `shares` for `holder`, liquidating strategies in registry
    /// order when the vault's idle balance falls short.
    pub fn withdraw(&mut self, holder: &Address, shares: u128) -> Result<u128, VaultError> {
        let mut handles: Vec<&mut dyn StrategyHandle> = self
            .strategies
            .iter_mut()
            .map(|s| s as &mut dyn StrategyHandle)
            .collect();
        self.vault
            .withdraw(holder, shares, &mut self.token, &mut handles, self.block)
    }

    // -----------------------------------------------------------------------
    // Strategies
    // -----------------------------------------------------------------------

    pub fn harvest_trigger(&self, index: usize, call_cost: u128) -> bool {
        self.strategies.get(index).map_or(false, |s| {
            s.harvest_trigger(&self.vault, &self.token, call_cost, self.block)
        })
    }

    /// Harvests strategy `index` as `caller`.
    pub fn harvest(&mut self, index: usize, caller: &Address) -> Result<Settlement, VaultError> {
        let strategy = self.strategies.get_mut(index).ok_or_else(|| {
            VaultError::InvalidAmount(format!("no strategy at index {index}"))
        })?;
        strategy.harvest(caller, &mut self.vault, &mut self.token, self.block)
    }

    // -----------------------------------------------------------------------
    // Borrowers
    // -----------------------------------------------------------------------

    fn borrower(&self, index: usize) -> Option<Address> {
        self.strategies
            .get(index)
            .map(|s| Address::derive(&s.venue().address(), 0))
    }

    /// The borrower of market `index` draws `utilization_bps` of the
    /// market's cash. Returns the amount borrowed.
    pub fn borrow(&mut self, index: usize, utilization_bps: u64) -> Result<u128> {
        let Some(borrower) = self.borrower(index) else {
            return Ok(0);
        };
        let block = self.block;
        let market = self.strategies[index].venue_mut();
        let amount = math::bps_of(market.cash(), utilization_bps.min(MAX_BPS))?;
        if amount > 0 {
            market.borrow(&mut self.token, &borrower, amount, block)?;
            debug!(market = %market.address(), amount, "borrower drew cash");
        }
        Ok(amount)
    }

    /// The borrower of market `index` repays everything, interest
    /// included. Interest the borrower cannot cover is minted by the
    /// deployer. Returns the amount repaid.
    pub fn repay(&mut self, index: usize) -> Result<u128> {
        let Some(borrower) = self.borrower(index) else {
            return Ok(0);
        };
        let block = self.block;
        let owed = self.strategies[index].venue().total_borrows_at(block)?;
        let held = self.token.balance_of(&borrower);
        if held < owed {
            self.token.mint(&self.deployer, &borrower, owed - held)?;
        }
        let repaid = self.strategies[index]
            .venue_mut()
            .repay_borrow(&mut self.token, &borrower, owed, block)?;
        Ok(repaid)
    }
}
