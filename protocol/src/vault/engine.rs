//! # Vault
//!
//! The pooled deposit ledger. Depositors hand the vault the asset and
//! receive shares; governance lends idle capital to registered strategies;
//! strategies report back through the settlement protocol.
//!
//! Every public mutating method follows the same shape:
//!
//! 1. authorize the caller through [`guard::authorize`],
//! 2. validate and compute every resulting quantity, staging the new books
//!    where a write could overflow,
//! 3. move tokens (the only step that can fail after validation, and it
//!    happens before any vault field is written),
//! 4. commit and append a [`VaultEvent`].
//!
//! A rejected call therefore leaves the vault exactly as it found it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::config::{self, MAX_BPS, MAX_DECIMALS};
use crate::error::VaultError;
use crate::guard::{self, Operation, Role, Roles, VaultStatus};
use crate::math;
use crate::token::AssetToken;

use super::allocator::{self, CreditLimits};
use super::events::VaultEvent;
use super::ledger::AssetLedger;
use super::registry::{StrategyParams, StrategyRecord, StrategyRegistry};
use super::settlement::{plan_settlement, Settlement, SettlementPhase, SettlementRequest};
use super::shares::ShareAccounting;

// ---------------------------------------------------------------------------
// Strategy handle
// ---------------------------------------------------------------------------

/// The vault's view of a strategy: identity checks at registration, the
/// live strategist for parameter proposals, and liquidity for withdrawals.
pub trait StrategyHandle {
    /// The strategy's address.
    fn address(&self) -> Address;

    /// The vault this strategy was deployed for.
    fn vault(&self) -> Address;

    /// The asset the strategy works with.
    fn want(&self) -> Address;

    /// Current strategist.
    fn strategist(&self) -> Address;

    /// How much the strategy could hand back right now.
    fn liquid_assets(&self, token: &dyn AssetToken, block: u64) -> u128;

    /// Frees up to `amount` and transfers it to `caller` (the vault).
    /// Returns the amount actually transferred.
    fn liquidate(
        &mut self,
        caller: &Address,
        token: &mut dyn AssetToken,
        amount: u128,
        block: u64,
    ) -> Result<u128, VaultError>;
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Deployment parameters for a vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultInit {
    /// The vault's own address.
    pub address: Address,
    pub governance: Address,
    pub rewards: Address,
    /// Defaults to governance when absent.
    pub guardian: Option<Address>,
    /// Share-token name. `None` or empty derives "<SYMBOL> yVault".
    pub name: Option<String>,
    /// Share-token symbol. `None` or empty derives "yv<SYMBOL>".
    pub symbol: Option<String>,
}

/// Point-in-time summary of the vault, for reports and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub status: VaultStatus,
    pub total_assets: u128,
    pub idle: u128,
    pub total_debt: u128,
    pub total_supply: u128,
    pub price_per_share: u128,
    pub strategies: Vec<StrategyRecord>,
}

/// The vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vault {
    address: Address,
    token: Address,
    decimals: u8,
    name: String,
    symbol: String,
    governance: Address,
    rewards: Address,
    guardian: Address,
    /// Vault-level performance fee, paid to `rewards`.
    performance_fee_bps: u64,
    status: VaultStatus,
    ledger: AssetLedger,
    registry: StrategyRegistry,
    events: Vec<VaultEvent>,
}

impl Vault {
    /// Creates an empty vault for `token`.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidAmount`] if the token's decimals are too large
    /// to scale a price with.
    pub fn new(init: VaultInit, token: &dyn AssetToken) -> Result<Self, VaultError> {
        let decimals = token.decimals();
        if decimals > MAX_DECIMALS {
            return Err(VaultError::InvalidAmount(format!(
                "token decimals {decimals} exceed maximum {MAX_DECIMALS}"
            )));
        }

        let name = init
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| config::default_share_name(token.symbol()));
        let symbol = init
            .symbol
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| config::default_share_symbol(token.symbol()));

        info!(
            vault = %init.address,
            token = %token.address(),
            governance = %init.governance,
            %name,
            %symbol,
            "vault created"
        );

        Ok(Self {
            address: init.address,
            token: token.address(),
            decimals,
            name,
            symbol,
            governance: init.governance,
            rewards: init.rewards,
            guardian: init.guardian.unwrap_or(init.governance),
            performance_fee_bps: config::DEFAULT_VAULT_PERFORMANCE_FEE_BPS,
            status: VaultStatus::Active,
            ledger: AssetLedger::new(),
            registry: StrategyRegistry::new(),
            events: Vec::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    /// The accepted asset.
    pub fn token(&self) -> Address {
        self.token
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn governance(&self) -> Address {
        self.governance
    }

    pub fn rewards(&self) -> Address {
        self.rewards
    }

    pub fn guardian(&self) -> Address {
        self.guardian
    }

    pub fn performance_fee_bps(&self) -> u64 {
        self.performance_fee_bps
    }

    pub fn status(&self) -> VaultStatus {
        self.status
    }

    pub fn is_paused(&self) -> bool {
        self.status.is_paused()
    }

    /// Asset held by the vault and not lent out.
    pub fn idle(&self) -> u128 {
        self.ledger.idle()
    }

    /// Sum of all strategies' outstanding debt.
    pub fn total_debt(&self) -> u128 {
        // Every unit of debt was once idle, so the fold can't overflow
        // unless the registry is corrupt.
        self.registry.total_debt().unwrap_or(u128::MAX)
    }

    /// `idle + total_debt`.
    pub fn total_assets(&self) -> u128 {
        self.ledger.idle().saturating_add(self.total_debt())
    }

    pub fn total_supply(&self) -> u128 {
        self.ledger.total_shares()
    }

    pub fn balance_of(&self, holder: &Address) -> u128 {
        self.ledger.shares_of(holder)
    }

    /// Pricing snapshot for the current state.
    pub fn accounting(&self) -> ShareAccounting {
        ShareAccounting::new(self.total_assets(), self.total_supply(), self.decimals)
    }

    /// Value of one whole share, scaled by `10^decimals`.
    pub fn price_per_share(&self) -> Result<u128, VaultError> {
        self.accounting().price_per_share()
    }

    /// Older name for [`price_per_share`](Self::price_per_share).
    pub fn price_per_full_share(&self) -> Result<u128, VaultError> {
        self.price_per_share()
    }

    /// Assets `holder`'s shares would redeem for right now.
    pub fn value_of(&self, holder: &Address) -> Result<u128, VaultError> {
        self.accounting().assets_for_shares(self.balance_of(holder))
    }

    /// Registry record for `strategy`, if registered.
    pub fn strategy(&self, strategy: &Address) -> Option<&StrategyRecord> {
        self.registry.get(strategy).ok()
    }

    /// Registered strategies in withdrawal-queue order.
    pub fn strategies(&self) -> impl Iterator<Item = &StrategyRecord> {
        self.registry.iter()
    }

    /// Credit `strategy` could draw at `block`. Zero for unknown strategies.
    pub fn credit_available(&self, strategy: &Address, block: u64) -> u128 {
        let Ok(record) = self.registry.get(strategy) else {
            return 0;
        };
        let limits = CreditLimits::evaluate(
            record,
            record.debt.outstanding_debt,
            self.ledger.idle(),
            block,
            self.is_paused(),
        );
        let credit = limits.available();
        debug!(
            %strategy,
            block,
            headroom = limits.debt_headroom,
            rate_allowance = limits.rate_allowance,
            idle = limits.idle,
            credit,
            "credit evaluated"
        );
        credit
    }

    /// Credit `strategy` may request in a report that declares
    /// `total_assets_held` and repays `debt_payment` at `block`.
    pub fn preview_credit(
        &self,
        strategy: &Address,
        total_assets_held: u128,
        debt_payment: u128,
        block: u64,
    ) -> u128 {
        let Ok(record) = self.registry.get(strategy) else {
            return 0;
        };
        let debt = total_assets_held.saturating_sub(debt_payment);
        let idle = self.ledger.idle().saturating_add(debt_payment);
        CreditLimits::evaluate(record, debt, idle, block, self.is_paused()).available()
    }

    /// What `strategy` should return on its next report. Zero for unknown
    /// strategies.
    pub fn debt_outstanding(&self, strategy: &Address) -> u128 {
        self.registry
            .get(strategy)
            .map(allocator::debt_outstanding)
            .unwrap_or(0)
    }

    /// Committed events, oldest first.
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    /// Summary for reports.
    pub fn snapshot(&self) -> VaultSnapshot {
        VaultSnapshot {
            address: self.address,
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
            status: self.status,
            total_assets: self.total_assets(),
            idle: self.idle(),
            total_debt: self.total_debt(),
            total_supply: self.total_supply(),
            price_per_share: self.price_per_share().unwrap_or(0),
            strategies: self.registry.iter().cloned().collect(),
        }
    }

    fn vault_roles(&self) -> Roles {
        Roles {
            governance: Some(self.governance),
            guardian: Some(self.guardian),
            ..Roles::default()
        }
    }

    // -----------------------------------------------------------------------
    // Deposits & withdrawals
    // -----------------------------------------------------------------------

    /// Pulls `amount` from `caller` (who must have approved the vault) and
    /// mints shares at the current price. Returns the shares minted.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidAmount`] for zero, or an amount too small to
    ///   mint a single share.
    /// - [`VaultError::VaultPaused`] while paused.
    /// - [`VaultError::Token`] if the transfer fails.
    pub fn deposit(
        &mut self,
        caller: &Address,
        amount: u128,
        token: &mut dyn AssetToken,
    ) -> Result<u128, VaultError> {
        if amount == 0 {
            return Err(VaultError::InvalidAmount("deposit of zero".into()));
        }
        if self.is_paused() {
            return Err(VaultError::VaultPaused);
        }

        let shares = self.accounting().shares_for_deposit(amount)?;
        if shares == 0 {
            return Err(VaultError::InvalidAmount(format!(
                "deposit of {amount} is too small to mint a share"
            )));
        }
        math::add(self.ledger.idle(), amount)?;
        math::add(self.ledger.total_shares(), shares)?;

        token.transfer_from(&self.address, caller, &self.address, amount)?;

        self.ledger.credit_idle(amount)?;
        self.ledger.mint(caller, shares)?;
        self.events.push(VaultEvent::Deposit {
            holder: *caller,
            amount,
            shares,
        });

        info!(holder = %caller, amount, shares, "deposit");
        Ok(shares)
    }

    /// Burns `shares` from `caller` and pays out their value.
    ///
    /// If idle liquidity doesn't cover the payout, the shortfall is pulled
    /// from strategies in withdrawal-queue order; every unit pulled repays
    /// that strategy's debt. `strategies` must contain a handle for every
    /// strategy the vault may need to draw on; strategies without a handle
    /// are skipped.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidAmount`] for zero shares.
    /// - [`VaultError::InsufficientBalance`] if `caller` holds fewer shares,
    ///   or the queue cannot free enough liquidity. The latter is checked
    ///   before anything is pulled.
    pub fn withdraw(
        &mut self,
        caller: &Address,
        shares: u128,
        token: &mut dyn AssetToken,
        strategies: &mut [&mut dyn StrategyHandle],
        block: u64,
    ) -> Result<u128, VaultError> {
        if shares == 0 {
            return Err(VaultError::InvalidAmount("withdrawal of zero shares".into()));
        }
        let held = self.ledger.shares_of(caller);
        if shares > held {
            return Err(VaultError::InsufficientBalance {
                available: held,
                requested: shares,
            });
        }

        let value = self.accounting().assets_for_shares(shares)?;
        let idle = self.ledger.idle();

        if value > idle {
            let pulls = self.plan_liquidation(value - idle, strategies, token, block)?;
            self.execute_liquidation(&pulls, strategies, token, block)?;
            if self.ledger.idle() < value {
                return Err(VaultError::InsufficientBalance {
                    available: self.ledger.idle(),
                    requested: value,
                });
            }
        }

        if value > 0 {
            token.transfer(&self.address, caller, value)?;
        }
        self.ledger.burn(caller, shares)?;
        self.ledger.debit_idle(value)?;
        self.events.push(VaultEvent::Withdraw {
            holder: *caller,
            amount: value,
            shares,
        });

        info!(holder = %caller, amount = value, shares, "withdraw");
        Ok(value)
    }

    /// Decides how much to pull from each strategy, in queue order, without
    /// touching anything. Returns `(handle index, amount)` pairs.
    fn plan_liquidation(
        &self,
        shortfall: u128,
        strategies: &[&mut dyn StrategyHandle],
        token: &dyn AssetToken,
        block: u64,
    ) -> Result<Vec<(usize, u128)>, VaultError> {
        let mut remaining = shortfall;
        let mut pulls = Vec::new();

        for record in self.registry.iter() {
            if remaining == 0 {
                break;
            }
            if record.debt.outstanding_debt == 0 {
                continue;
            }
            let Some(index) = strategies
                .iter()
                .position(|s| s.address() == record.strategy)
            else {
                continue;
            };
            let liquid = strategies[index].liquid_assets(token, block);
            let take = remaining
                .min(record.debt.outstanding_debt)
                .min(liquid);
            if take > 0 {
                pulls.push((index, take));
                remaining -= take;
            }
        }

        if remaining > 0 {
            let available = self.ledger.idle().saturating_add(shortfall - remaining);
            return Err(VaultError::InsufficientBalance {
                available,
                requested: self.ledger.idle().saturating_add(shortfall),
            });
        }
        Ok(pulls)
    }

    /// Pulls the planned amounts. Each pull is committed as a debt
    /// repayment as soon as the tokens arrive.
    fn execute_liquidation(
        &mut self,
        pulls: &[(usize, u128)],
        strategies: &mut [&mut dyn StrategyHandle],
        token: &mut dyn AssetToken,
        block: u64,
    ) -> Result<(), VaultError> {
        for &(index, amount) in pulls {
            let handle = &mut strategies[index];
            let strategy = handle.address();
            let freed = handle.liquidate(&self.address, token, amount, block)?;

            let record = self.registry.get_mut(&strategy)?;
            let repaid = freed.min(record.debt.outstanding_debt);
            record.debt.outstanding_debt -= repaid;
            self.ledger.credit_idle(freed)?;
            self.events.push(VaultEvent::StrategyLiquidated {
                strategy,
                amount: freed,
            });
            debug!(%strategy, requested = amount, freed, "liquidated for withdrawal");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Strategy registry
    // -----------------------------------------------------------------------

    /// Registers `strategy` with its debt limit, per-block rate limit, and
    /// strategist fee. Governance only.
    ///
    /// # Errors
    ///
    /// [`VaultError::Unauthorized`], [`VaultError::AlreadyActive`],
    /// [`VaultError::InvalidFeeRate`], or [`VaultError::StrategyInactive`]
    /// if the strategy was built for a different vault or asset.
    pub fn add_strategy(
        &mut self,
        caller: &Address,
        strategy: &dyn StrategyHandle,
        debt_limit: u128,
        rate_limit_per_block: u128,
        performance_fee_bps: u64,
        block: u64,
    ) -> Result<(), VaultError> {
        guard::authorize(Operation::AddStrategy, &self.vault_roles(), caller)?;

        let address = strategy.address();
        if strategy.vault() != self.address {
            return Err(VaultError::inactive(&address, "strategy belongs to another vault"));
        }
        if strategy.want() != self.token {
            return Err(VaultError::inactive(&address, "strategy wants a different asset"));
        }

        let params = StrategyParams {
            debt_limit,
            rate_limit_per_block,
            performance_fee_bps,
            activation_block: block,
        };
        self.registry.add(StrategyRecord::new(address, params))?;
        self.events.push(VaultEvent::StrategyAdded {
            strategy: address,
            params,
        });

        info!(
            strategy = %address,
            debt_limit,
            rate_limit_per_block,
            performance_fee_bps,
            block,
            "strategy added"
        );
        Ok(())
    }

    /// Changes a strategy's limits. Governance may set any value; the
    /// strategy's strategist may only lower values.
    pub fn update_strategy(
        &mut self,
        caller: &Address,
        strategy: &dyn StrategyHandle,
        debt_limit: u128,
        rate_limit_per_block: u128,
        performance_fee_bps: u64,
    ) -> Result<(), VaultError> {
        let address = strategy.address();
        let roles = Roles {
            strategist: Some(strategy.strategist()),
            ..self.vault_roles()
        };
        let role = guard::authorize(Operation::UpdateStrategy, &roles, caller)?;

        let current = self.registry.get(&address)?.params;
        let proposed = StrategyParams {
            debt_limit,
            rate_limit_per_block,
            performance_fee_bps,
            activation_block: current.activation_block,
        };
        proposed.validate()?;

        if role == Role::Strategist
            && (proposed.debt_limit > current.debt_limit
                || proposed.rate_limit_per_block > current.rate_limit_per_block
                || proposed.performance_fee_bps > current.performance_fee_bps)
        {
            return Err(VaultError::unauthorized(
                caller,
                "raise strategy parameters above governance-set bounds",
            ));
        }

        self.registry.get_mut(&address)?.params = proposed;
        self.events.push(VaultEvent::StrategyUpdated {
            strategy: address,
            params: proposed,
        });
        info!(strategy = %address, ?role, debt_limit, rate_limit_per_block, performance_fee_bps, "strategy updated");
        Ok(())
    }

    /// Latches the vault-side exit for `strategy`: no more credit, and its
    /// whole debt becomes due. Governance or the strategy itself.
    pub fn revoke_strategy(&mut self, caller: &Address, strategy: &Address) -> Result<(), VaultError> {
        let roles = Roles {
            strategy: Some(*strategy),
            ..self.vault_roles()
        };
        guard::authorize(Operation::RevokeStrategy, &roles, caller)?;

        let record = self.registry.get_mut(strategy)?;
        record.exit = record.exit.request_exit(strategy)?;
        self.events.push(VaultEvent::StrategyRevoked {
            strategy: *strategy,
        });

        warn!(%strategy, by = %caller, "strategy revoked; exit latched");
        Ok(())
    }

    /// Deregisters a fully repaid strategy. Governance only.
    pub fn remove_strategy(&mut self, caller: &Address, strategy: &Address) -> Result<(), VaultError> {
        guard::authorize(Operation::RemoveStrategy, &self.vault_roles(), caller)?;
        self.registry.remove(strategy)?;
        self.events.push(VaultEvent::StrategyRemoved {
            strategy: *strategy,
        });
        info!(%strategy, "strategy removed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Settlement
    // -----------------------------------------------------------------------

    /// Settles a strategy's report. `caller` must be the strategy itself.
    ///
    /// The vault pulls `debt_payment` from the strategy with
    /// `transfer_from` (so the strategy must approve it first) and sends it
    /// `credit_requested`. Fee shares are minted to the strategy (the
    /// strategist's contract) and to the rewards recipient.
    ///
    /// The post-settlement books, including the resulting price per share,
    /// are staged before any token moves. The record sits in
    /// [`SettlementPhase::Reporting`] while the transfers run and reaches
    /// [`SettlementPhase::Reconciled`] only once everything is committed.
    ///
    /// # Errors
    ///
    /// See [`plan_settlement`]; additionally [`VaultError::ArithmeticOverflow`]
    /// if the post-settlement price cannot be represented, and
    /// [`VaultError::Token`] if a transfer fails. Both abort the settlement
    /// with nothing committed.
    pub fn report(
        &mut self,
        caller: &Address,
        request: SettlementRequest,
        token: &mut dyn AssetToken,
        block: u64,
    ) -> Result<Settlement, VaultError> {
        let record = self.registry.get(caller)?;
        let roles = Roles {
            strategy: Some(record.strategy),
            ..Roles::default()
        };
        guard::authorize(Operation::Report, &roles, caller)?;

        let plan = plan_settlement(
            record,
            &request,
            self.ledger.idle(),
            self.performance_fee_bps,
            block,
            self.is_paused(),
        )?;

        // Price fee shares against the post-settlement asset base, treating
        // the fee as if the recipients had deposited it.
        let other_debt = self
            .total_debt()
            .saturating_sub(plan.debt_before);
        let total_assets_after = math::add(math::add(plan.idle_after, other_debt)?, plan.debt_after)?;
        let total_fee = plan.total_fee();
        let (strategist_shares, rewards_shares) = if total_fee > 0 {
            let pricing = ShareAccounting::new(
                math::sub(total_assets_after, total_fee)?,
                self.ledger.total_shares(),
                self.decimals,
            );
            let fee_shares = pricing.shares_for_deposit(total_fee)?;
            let strategist_shares = math::mul_div(fee_shares, plan.strategist_fee, total_fee)?;
            (strategist_shares, fee_shares - strategist_shares)
        } else {
            (0, 0)
        };

        let strategy = *caller;
        let mut ledger = self.ledger.clone();
        ledger.credit_idle(plan.debt_payment)?;
        ledger.debit_idle(plan.credit)?;
        ledger.mint(&strategy, strategist_shares)?;
        ledger.mint(&self.rewards, rewards_shares)?;
        let price_per_share =
            ShareAccounting::new(total_assets_after, ledger.total_shares(), self.decimals)
                .price_per_share()?;

        let vault = self.address;
        let record = self.registry.get_mut(&strategy)?;
        let phase = record.phase;
        record.phase = phase.begin(&strategy)?;
        if let Err(e) = move_settlement_funds(token, &vault, &strategy, plan.debt_payment, plan.credit) {
            record.phase = phase;
            return Err(e);
        }

        // Commit. Nothing below can fail.
        record.debt.outstanding_debt = plan.debt_after;
        record.debt.last_report_block = block;
        record.total_gain = record.total_gain.saturating_add(plan.gain);
        record.total_loss = record.total_loss.saturating_add(plan.loss);
        record.exit = record.exit.after_settlement(plan.debt_after);
        record.phase = SettlementPhase::Reconciled;
        let exit = record.exit;
        self.ledger = ledger;

        let settlement = Settlement {
            strategy,
            gain: plan.gain,
            loss: plan.loss,
            debt_payment: plan.debt_payment,
            credit: plan.credit,
            debt_after: plan.debt_after,
            strategist_fee_shares: strategist_shares,
            rewards_fee_shares: rewards_shares,
            price_per_share,
            block,
        };
        self.events
            .push(VaultEvent::StrategyReported(settlement.clone()));

        if plan.loss > 0 {
            warn!(%strategy, loss = plan.loss, debt = plan.debt_after, "strategy reported a loss");
        }
        info!(
            %strategy,
            gain = plan.gain,
            loss = plan.loss,
            debt_payment = plan.debt_payment,
            credit = plan.credit,
            debt = plan.debt_after,
            fee_shares = strategist_shares + rewards_shares,
            ?exit,
            block,
            "strategy reported"
        );
        Ok(settlement)
    }

    // -----------------------------------------------------------------------
    // Governance
    // -----------------------------------------------------------------------

    /// Stops deposits and new credit. Governance or guardian.
    pub fn pause(&mut self, caller: &Address) -> Result<(), VaultError> {
        guard::authorize(Operation::Pause, &self.vault_roles(), caller)?;
        if !self.is_paused() {
            self.status = VaultStatus::Paused;
            self.events.push(VaultEvent::Paused { by: *caller });
            warn!(by = %caller, "vault paused");
        }
        Ok(())
    }

    /// Resumes normal operation. Governance only.
    pub fn unpause(&mut self, caller: &Address) -> Result<(), VaultError> {
        guard::authorize(Operation::Unpause, &self.vault_roles(), caller)?;
        if self.is_paused() {
            self.status = VaultStatus::Active;
            self.events.push(VaultEvent::Unpaused { by: *caller });
            info!(by = %caller, "vault unpaused");
        }
        Ok(())
    }

    pub fn set_governance(&mut self, caller: &Address, governance: Address) -> Result<(), VaultError> {
        guard::authorize(Operation::SetGovernance, &self.vault_roles(), caller)?;
        self.governance = governance;
        self.events.push(VaultEvent::GovernanceChanged { governance });
        info!(%governance, "governance changed");
        Ok(())
    }

    pub fn set_rewards(&mut self, caller: &Address, rewards: Address) -> Result<(), VaultError> {
        guard::authorize(Operation::SetRewards, &self.vault_roles(), caller)?;
        self.rewards = rewards;
        self.events.push(VaultEvent::RewardsChanged { rewards });
        info!(%rewards, "rewards recipient changed");
        Ok(())
    }

    pub fn set_guardian(&mut self, caller: &Address, guardian: Address) -> Result<(), VaultError> {
        guard::authorize(Operation::SetGuardian, &self.vault_roles(), caller)?;
        self.guardian = guardian;
        self.events.push(VaultEvent::GuardianChanged { guardian });
        info!(%guardian, "guardian changed");
        Ok(())
    }

    /// Sets the vault-level performance fee paid to the rewards recipient.
    pub fn set_performance_fee(&mut self, caller: &Address, fee_bps: u64) -> Result<(), VaultError> {
        guard::authorize(Operation::SetPerformanceFee, &self.vault_roles(), caller)?;
        if fee_bps > MAX_BPS {
            return Err(VaultError::InvalidFeeRate(fee_bps));
        }
        self.performance_fee_bps = fee_bps;
        self.events.push(VaultEvent::PerformanceFeeChanged { fee_bps });
        info!(fee_bps, "vault performance fee changed");
        Ok(())
    }
}

/// Pulls `payment` from `strategy` and sends it `credit`. If the credit
/// leg fails the payment is handed back, so either both legs land or
/// neither does.
fn move_settlement_funds(
    token: &mut dyn AssetToken,
    vault: &Address,
    strategy: &Address,
    payment: u128,
    credit: u128,
) -> Result<(), VaultError> {
    if payment > 0 {
        token.transfer_from(vault, strategy, vault, payment)?;
    }
    if credit > 0 {
        if let Err(e) = token.transfer(vault, strategy, credit) {
            if payment > 0 {
                token.transfer(vault, strategy, payment)?;
            }
            return Err(e.into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestToken, DECIMALS};
    use crate::token::TokenError;

    struct TestStrategy {
        address: Address,
        vault: Address,
        want: Address,
        strategist: Address,
        /// Cap on what the strategy will hand back.
        liquid: u128,
    }

    impl StrategyHandle for TestStrategy {
        fn address(&self) -> Address {
            self.address
        }

        fn vault(&self) -> Address {
            self.vault
        }

        fn want(&self) -> Address {
            self.want
        }

        fn strategist(&self) -> Address {
            self.strategist
        }

        fn liquid_assets(&self, token: &dyn AssetToken, _block: u64) -> u128 {
            self.liquid.min(token.balance_of(&self.address))
        }

        fn liquidate(
            &mut self,
            caller: &Address,
            token: &mut dyn AssetToken,
            amount: u128,
            block: u64,
        ) -> Result<u128, VaultError> {
            let freed = amount.min(self.liquid_assets(token, block));
            token.transfer(&self.address, caller, freed)?;
            self.liquid -= freed;
            Ok(freed)
        }
    }

    fn gov() -> Address {
        Address::repeat_byte(1)
    }

    fn guardian() -> Address {
        Address::repeat_byte(2)
    }

    fn rewards() -> Address {
        Address::repeat_byte(3)
    }

    fn alice() -> Address {
        Address::repeat_byte(4)
    }

    fn strategist() -> Address {
        Address::repeat_byte(5)
    }

    fn vault_address() -> Address {
        Address::repeat_byte(9)
    }

    fn setup() -> (Vault, TestToken) {
        let token = TestToken::default();
        let vault = Vault::new(
            VaultInit {
                address: vault_address(),
                governance: gov(),
                rewards: rewards(),
                guardian: Some(guardian()),
                name: None,
                symbol: None,
            },
            &token,
        )
        .unwrap();
        (vault, token)
    }

    fn fund(vault: &mut Vault, token: &mut TestToken, holder: &Address, amount: u128) -> u128 {
        token.mint(holder, amount);
        token.approve(holder, &vault_address(), amount).unwrap();
        vault.deposit(holder, amount, token).unwrap()
    }

    fn strategy(byte: u8, liquid: u128) -> TestStrategy {
        TestStrategy {
            address: Address::repeat_byte(byte),
            vault: vault_address(),
            want: crate::testing::token_address(),
            strategist: strategist(),
            liquid,
        }
    }

    /// Adds `s` at block 0 and lets it borrow `debt` at block 10.
    fn lend(vault: &mut Vault, token: &mut TestToken, s: &TestStrategy, debt: u128, fee_bps: u64) {
        vault
            .add_strategy(&gov(), s, debt, debt, fee_bps, 0)
            .unwrap();
        vault
            .report(
                &s.address,
                SettlementRequest {
                    total_assets_held: 0,
                    debt_payment: 0,
                    credit_requested: debt,
                },
                token,
                10,
            )
            .unwrap();
    }

    #[test]
    fn names_derive_from_asset_symbol() {
        let (vault, _) = setup();
        assert_eq!(vault.name(), "CRV yVault");
        assert_eq!(vault.symbol(), "yvCRV");
        assert_eq!(vault.decimals(), DECIMALS);
        assert_eq!(vault.performance_fee_bps(), 0);
    }

    #[test]
    fn first_deposit_bootstraps_at_unit_price() {
        let (mut vault, mut token) = setup();
        let shares = fund(&mut vault, &mut token, &gov(), 1_000);
        assert_eq!(shares, 1_000);
        assert_eq!(vault.total_supply(), 1_000);
        assert_eq!(vault.price_per_share().unwrap(), 1_000_000);
        assert_eq!(token.balance_of(&vault_address()), 1_000);
        assert_eq!(vault.events().len(), 1);
    }

    #[test]
    fn zero_deposit_and_paused_deposit_are_rejected() {
        let (mut vault, mut token) = setup();
        token.mint(&alice(), 10);
        assert!(matches!(
            vault.deposit(&alice(), 0, &mut token),
            Err(VaultError::InvalidAmount(_))
        ));

        vault.pause(&guardian()).unwrap();
        token.approve(&alice(), &vault_address(), 10).unwrap();
        assert!(matches!(
            vault.deposit(&alice(), 10, &mut token),
            Err(VaultError::VaultPaused)
        ));
        assert_eq!(vault.total_supply(), 0);
    }

    #[test]
    fn deposit_without_allowance_commits_nothing() {
        let (mut vault, mut token) = setup();
        token.mint(&alice(), 100);
        assert!(matches!(
            vault.deposit(&alice(), 100, &mut token),
            Err(VaultError::Token(TokenError::InsufficientAllowance { .. }))
        ));
        assert_eq!(vault.idle(), 0);
        assert_eq!(vault.balance_of(&alice()), 0);
        assert!(vault.events().is_empty());
    }

    #[test]
    fn overdrawn_withdrawal_leaves_balances_unchanged() {
        let (mut vault, mut token) = setup();
        fund(&mut vault, &mut token, &alice(), 500);
        let err = vault
            .withdraw(&alice(), 501, &mut token, &mut [], 1)
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::InsufficientBalance {
                available: 500,
                requested: 501
            }
        ));
        assert_eq!(vault.balance_of(&alice()), 500);
        assert_eq!(vault.idle(), 500);
        assert_eq!(token.balance_of(&alice()), 0);
    }

    #[test]
    fn withdrawal_round_trip_returns_deposit() {
        let (mut vault, mut token) = setup();
        let shares = fund(&mut vault, &mut token, &alice(), 750);
        let out = vault
            .withdraw(&alice(), shares, &mut token, &mut [], 1)
            .unwrap();
        assert_eq!(out, 750);
        assert_eq!(token.balance_of(&alice()), 750);
        assert_eq!(vault.total_supply(), 0);
        assert_eq!(vault.total_assets(), 0);
    }

    #[test]
    fn gain_mints_fee_shares_at_post_gain_price() {
        let (mut vault, mut token) = setup();
        fund(&mut vault, &mut token, &alice(), 10_000);
        let s = strategy(7, 0);
        lend(&mut vault, &mut token, &s, 5_000, 1_000);
        assert_eq!(vault.total_debt(), 5_000);
        assert_eq!(vault.idle(), 5_000);

        // The position earns 1_000; the strategy returns it.
        token.mint(&s.address, 1_000);
        token.approve(&s.address, &vault_address(), 1_000).unwrap();
        let settlement = vault
            .report(
                &s.address,
                SettlementRequest {
                    total_assets_held: 6_000,
                    debt_payment: 1_000,
                    credit_requested: 0,
                },
                &mut token,
                11,
            )
            .unwrap();

        assert_eq!(settlement.gain, 1_000);
        assert_eq!(settlement.debt_after, 5_000);
        // 100 of fee priced against 10_900 assets over 10_000 shares.
        assert_eq!(settlement.strategist_fee_shares, 91);
        assert_eq!(settlement.rewards_fee_shares, 0);
        assert_eq!(vault.balance_of(&s.address), 91);
        assert_eq!(vault.total_supply(), 10_091);
        assert_eq!(vault.total_assets(), 11_000);
        assert_eq!(vault.idle(), 6_000);
    }

    #[test]
    fn rewards_fee_is_split_from_the_same_mint() {
        let (mut vault, mut token) = setup();
        vault.set_performance_fee(&gov(), 1_000).unwrap();
        fund(&mut vault, &mut token, &alice(), 10_000);
        let s = strategy(7, 0);
        lend(&mut vault, &mut token, &s, 5_000, 1_000);

        token.mint(&s.address, 1_000);
        let settlement = vault
            .report(
                &s.address,
                SettlementRequest {
                    total_assets_held: 6_000,
                    debt_payment: 0,
                    credit_requested: 0,
                },
                &mut token,
                11,
            )
            .unwrap_err();
        // Unreturned gain pushes debt above the limit.
        assert!(matches!(settlement, VaultError::DebtLimitExceeded { .. }));

        token.approve(&s.address, &vault_address(), 1_000).unwrap();
        let settlement = vault
            .report(
                &s.address,
                SettlementRequest {
                    total_assets_held: 6_000,
                    debt_payment: 1_000,
                    credit_requested: 0,
                },
                &mut token,
                11,
            )
            .unwrap();
        // 200 of fee against 10_800 assets: 185 shares, half each.
        assert_eq!(
            settlement.strategist_fee_shares + settlement.rewards_fee_shares,
            185
        );
        assert_eq!(settlement.strategist_fee_shares, 92);
        assert_eq!(vault.balance_of(&rewards()), 93);
    }

    #[test]
    fn failed_repayment_aborts_the_report() {
        let (mut vault, mut token) = setup();
        fund(&mut vault, &mut token, &alice(), 1_000);
        let s = strategy(7, 0);
        lend(&mut vault, &mut token, &s, 500, 0);
        let before = vault.events().len();

        // No approval for the payment.
        let err = vault
            .report(
                &s.address,
                SettlementRequest {
                    total_assets_held: 500,
                    debt_payment: 200,
                    credit_requested: 0,
                },
                &mut token,
                12,
            )
            .unwrap_err();
        assert!(matches!(err, VaultError::Token(_)));
        let record = vault.strategy(&s.address).unwrap();
        assert_eq!(record.debt.outstanding_debt, 500);
        assert_eq!(record.debt.last_report_block, 10);
        assert_eq!(vault.idle(), 500);
        assert_eq!(vault.events().len(), before);
        assert_eq!(record.phase, SettlementPhase::Reconciled);
    }

    #[test]
    fn unpriceable_report_commits_nothing() {
        let (mut vault, mut token) = setup();
        fund(&mut vault, &mut token, &alice(), 1);
        let s = strategy(7, 0);
        lend(&mut vault, &mut token, &s, 1, 0);
        let before = vault.events().len();

        // One share backed by 10^33 units prices above u128 at 6 decimals.
        let held = 10u128.pow(33);
        token.mint(&s.address, held - 1);
        token.approve(&s.address, &vault_address(), held - 1).unwrap();
        let err = vault
            .report(
                &s.address,
                SettlementRequest {
                    total_assets_held: held,
                    debt_payment: held - 1,
                    credit_requested: 0,
                },
                &mut token,
                12,
            )
            .unwrap_err();

        assert!(matches!(err, VaultError::ArithmeticOverflow));
        let record = vault.strategy(&s.address).unwrap();
        assert_eq!(record.debt.outstanding_debt, 1);
        assert_eq!(record.debt.last_report_block, 10);
        assert_eq!(record.phase, SettlementPhase::Reconciled);
        assert_eq!(vault.idle(), 0);
        assert_eq!(vault.events().len(), before);
        assert_eq!(token.balance_of(&vault_address()), 0);
        assert_eq!(token.balance_of(&s.address), held);
    }

    #[test]
    fn failed_credit_leg_returns_the_payment() {
        let (mut vault, mut token) = setup();
        fund(&mut vault, &mut token, &alice(), 1_000);
        let s = strategy(7, 0);
        lend(&mut vault, &mut token, &s, 500, 0);
        vault.update_strategy(&gov(), &s, 900, 500, 0).unwrap();

        // The vault's books say 500 idle but the token ledger holds 100.
        token
            .transfer(&vault_address(), &Address::repeat_byte(0xde), 400)
            .unwrap();
        token.approve(&s.address, &vault_address(), 50).unwrap();
        let err = vault
            .report(
                &s.address,
                SettlementRequest {
                    total_assets_held: 500,
                    debt_payment: 50,
                    credit_requested: 300,
                },
                &mut token,
                11,
            )
            .unwrap_err();

        assert!(matches!(
            err,
            VaultError::Token(TokenError::InsufficientBalance { .. })
        ));
        assert_eq!(token.balance_of(&s.address), 500);
        assert_eq!(token.balance_of(&vault_address()), 100);
        let record = vault.strategy(&s.address).unwrap();
        assert_eq!(record.debt.outstanding_debt, 500);
        assert_eq!(record.phase, SettlementPhase::Reconciled);
        assert_eq!(vault.idle(), 500);
    }

    #[test]
    fn report_during_open_settlement_is_rejected() {
        let (mut vault, mut token) = setup();
        fund(&mut vault, &mut token, &alice(), 1_000);
        let s = strategy(7, 0);
        lend(&mut vault, &mut token, &s, 500, 0);
        vault.registry.get_mut(&s.address).unwrap().phase = SettlementPhase::Reporting;

        let err = vault
            .report(&s.address, SettlementRequest::full_repayment(500), &mut token, 11)
            .unwrap_err();
        assert!(matches!(err, VaultError::StrategyInactive { .. }));
        assert_eq!(vault.strategy(&s.address).unwrap().debt.outstanding_debt, 500);
    }

    #[test]
    fn eighteen_decimal_vault_holds_a_million_tokens() {
        struct WideToken(TestToken);
        impl AssetToken for WideToken {
            fn address(&self) -> Address {
                self.0.address()
            }
            fn symbol(&self) -> &str {
                self.0.symbol()
            }
            fn decimals(&self) -> u8 {
                18
            }
            fn balance_of(&self, holder: &Address) -> u128 {
                self.0.balance_of(holder)
            }
            fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
                self.0.allowance(owner, spender)
            }
            fn transfer(&mut self, caller: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
                self.0.transfer(caller, to, amount)
            }
            fn transfer_from(
                &mut self,
                caller: &Address,
                from: &Address,
                to: &Address,
                amount: u128,
            ) -> Result<(), TokenError> {
                self.0.transfer_from(caller, from, to, amount)
            }
            fn approve(&mut self, caller: &Address, spender: &Address, amount: u128) -> Result<(), TokenError> {
                self.0.approve(caller, spender, amount)
            }
        }

        let mut token = WideToken(TestToken::default());
        let mut vault = Vault::new(
            VaultInit {
                address: vault_address(),
                governance: gov(),
                rewards: rewards(),
                guardian: None,
                name: None,
                symbol: None,
            },
            &token,
        )
        .unwrap();
        let ether = 10u128.pow(18);
        let amount = 1_000_000 * ether;
        token.0.mint(&alice(), amount);
        token.approve(&alice(), &vault_address(), amount).unwrap();
        let shares = vault.deposit(&alice(), amount, &mut token).unwrap();

        assert_eq!(shares, amount);
        assert_eq!(vault.price_per_share().unwrap(), ether);

        // Doubling the assets doubles the price.
        let s = strategy(7, 0);
        vault.add_strategy(&gov(), &s, amount, amount, 0, 0).unwrap();
        vault
            .report(
                &s.address,
                SettlementRequest {
                    total_assets_held: 0,
                    debt_payment: 0,
                    credit_requested: amount,
                },
                &mut token,
                1,
            )
            .unwrap();
        token.0.mint(&s.address, amount);
        token.approve(&s.address, &vault_address(), amount).unwrap();
        let settlement = vault
            .report(
                &s.address,
                SettlementRequest {
                    total_assets_held: 2 * amount,
                    debt_payment: amount,
                    credit_requested: 0,
                },
                &mut token,
                2,
            )
            .unwrap();
        assert_eq!(settlement.price_per_share, 2 * ether);
        assert_eq!(vault.total_assets(), 2 * amount);
    }

    #[test]
    fn report_from_non_strategy_is_rejected() {
        let (mut vault, mut token) = setup();
        let err = vault
            .report(
                &alice(),
                SettlementRequest::full_repayment(0),
                &mut token,
                1,
            )
            .unwrap_err();
        assert!(matches!(err, VaultError::StrategyInactive { .. }));
    }

    #[test]
    fn withdrawal_pulls_shortfall_from_queue() {
        let (mut vault, mut token) = setup();
        let shares = fund(&mut vault, &mut token, &alice(), 1_000);
        let mut s = strategy(7, u128::MAX);
        lend(&mut vault, &mut token, &s, 600, 0);

        let out = vault
            .withdraw(&alice(), shares, &mut token, &mut [&mut s], 20)
            .unwrap();
        assert_eq!(out, 1_000);
        assert_eq!(vault.total_debt(), 0);
        assert_eq!(vault.idle(), 0);
        assert!(vault
            .events()
            .iter()
            .any(|e| matches!(e, VaultEvent::StrategyLiquidated { amount: 600, .. })));
    }

    #[test]
    fn uncoverable_withdrawal_pulls_nothing() {
        let (mut vault, mut token) = setup();
        let shares = fund(&mut vault, &mut token, &alice(), 1_000);
        let mut s = strategy(7, 100);
        lend(&mut vault, &mut token, &s, 600, 0);

        let err = vault
            .withdraw(&alice(), shares, &mut token, &mut [&mut s], 20)
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::InsufficientBalance {
                available: 500,
                requested: 1_000
            }
        ));
        assert_eq!(vault.total_debt(), 600);
        assert_eq!(token.balance_of(&s.address), 600);
        assert_eq!(vault.balance_of(&alice()), 1_000);
    }

    #[test]
    fn strategy_registration_checks() {
        let (mut vault, _) = setup();
        let s = strategy(7, 0);
        assert!(matches!(
            vault.add_strategy(&alice(), &s, 1, 1, 0, 0),
            Err(VaultError::Unauthorized { .. })
        ));

        let mut foreign = strategy(8, 0);
        foreign.vault = Address::repeat_byte(0x42);
        assert!(matches!(
            vault.add_strategy(&gov(), &foreign, 1, 1, 0, 0),
            Err(VaultError::StrategyInactive { .. })
        ));

        vault.add_strategy(&gov(), &s, 1, 1, 0, 0).unwrap();
        assert!(matches!(
            vault.add_strategy(&gov(), &s, 1, 1, 0, 0),
            Err(VaultError::AlreadyActive(_))
        ));
    }

    #[test]
    fn strategist_may_only_lower_parameters() {
        let (mut vault, mut token) = setup();
        fund(&mut vault, &mut token, &alice(), 1_000);
        let s = strategy(7, 0);
        lend(&mut vault, &mut token, &s, 500, 100);

        assert!(matches!(
            vault.update_strategy(&strategist(), &s, 600, 500, 100),
            Err(VaultError::Unauthorized { .. })
        ));
        vault.update_strategy(&strategist(), &s, 300, 500, 50).unwrap();
        assert_eq!(vault.debt_outstanding(&s.address), 200);
        assert_eq!(vault.credit_available(&s.address, 100), 0);

        vault.update_strategy(&gov(), &s, 900, 500, 100).unwrap();
        assert_eq!(vault.debt_outstanding(&s.address), 0);
        assert!(matches!(
            vault.update_strategy(&alice(), &s, 1, 1, 1),
            Err(VaultError::Unauthorized { .. })
        ));
    }

    #[test]
    fn revoked_strategy_must_repay_in_full() {
        let (mut vault, mut token) = setup();
        fund(&mut vault, &mut token, &alice(), 1_000);
        let s = strategy(7, 0);
        lend(&mut vault, &mut token, &s, 500, 0);

        vault.revoke_strategy(&s.address, &s.address).unwrap();
        assert!(matches!(
            vault.revoke_strategy(&gov(), &s.address),
            Err(VaultError::StrategyInactive { .. })
        ));
        assert_eq!(vault.credit_available(&s.address, 50), 0);
        assert_eq!(vault.debt_outstanding(&s.address), 500);

        token.approve(&s.address, &vault_address(), 500).unwrap();
        vault
            .report(&s.address, SettlementRequest::full_repayment(500), &mut token, 20)
            .unwrap();
        let record = vault.strategy(&s.address).unwrap();
        assert_eq!(record.exit, crate::guard::ExitState::Exited);
        vault.remove_strategy(&gov(), &s.address).unwrap();
        assert_eq!(vault.idle(), 1_000);
    }

    #[test]
    fn guardian_pauses_but_only_governance_unpauses() {
        let (mut vault, mut token) = setup();
        let shares = fund(&mut vault, &mut token, &alice(), 100);
        assert!(vault.pause(&alice()).is_err());
        vault.pause(&guardian()).unwrap();
        assert!(vault.is_paused());
        assert!(matches!(
            vault.unpause(&guardian()),
            Err(VaultError::Unauthorized { .. })
        ));

        // Withdrawals still work while paused.
        vault
            .withdraw(&alice(), shares, &mut token, &mut [], 5)
            .unwrap();
        vault.unpause(&gov()).unwrap();
        assert!(!vault.is_paused());
    }

    #[test]
    fn governance_setters() {
        let (mut vault, _) = setup();
        assert!(matches!(
            vault.set_performance_fee(&gov(), 10_001),
            Err(VaultError::InvalidFeeRate(10_001))
        ));
        assert!(vault.set_rewards(&alice(), alice()).is_err());
        vault.set_guardian(&gov(), alice()).unwrap();
        assert_eq!(vault.guardian(), alice());
        vault.set_governance(&gov(), alice()).unwrap();
        assert!(vault.set_rewards(&gov(), gov()).is_err());
        vault.set_rewards(&alice(), gov()).unwrap();
        assert_eq!(vault.rewards(), gov());
    }

    #[test]
    fn snapshot_serializes() {
        let (mut vault, mut token) = setup();
        fund(&mut vault, &mut token, &alice(), 100);
        let json = serde_json::to_string(&vault.snapshot()).unwrap();
        assert!(json.contains("yvCRV"));
    }
}
