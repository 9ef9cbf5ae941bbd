//! The base strategy.
//!
//! A strategy borrows from exactly one vault, parks the capital in one
//! [`YieldVenue`], and periodically harvests: it works out what its
//! position is worth, hands back profit and anything the vault wants
//! returned, reports, and redeploys whatever it is left holding.
//!
//! ```text
//!   vault ──credit──► strategy ──deposit──► venue
//!   vault ◄─payment── strategy ◄─withdraw── venue
//! ```
//!
//! Once the exit latch is set (by the strategy's own principals or by the
//! vault revoking it), the next harvest pulls everything out of the venue
//! and repays the vault in full.

use tracing::{debug, info, warn};

use crate::address::Address;
use crate::error::VaultError;
use crate::guard::{self, ExitState, Operation, Roles};
use crate::token::AssetToken;
use crate::vault::{Settlement, SettlementRequest, StrategyHandle, Vault};
use crate::venue::{VenueError, YieldVenue};

use super::trigger::{HarvestTrigger, TriggerInputs};

/// A strategy deploying one vault's credit into one venue.
#[derive(Debug, Clone)]
pub struct Strategy<V> {
    address: Address,
    vault: Address,
    want: Address,
    strategist: Address,
    keeper: Address,
    /// Loose balance kept out of the venue after each harvest.
    reserve: u128,
    exit: ExitState,
    trigger: HarvestTrigger,
    venue: V,
}

impl<V: YieldVenue> Strategy<V> {
    /// Deploys a strategy for `vault`. The keeper starts out as the
    /// strategist.
    pub fn new(address: Address, vault: &Vault, strategist: Address, venue: V) -> Self {
        info!(
            strategy = %address,
            vault = %vault.address(),
            %strategist,
            venue = %venue.address(),
            "strategy deployed"
        );
        Self {
            address,
            vault: vault.address(),
            want: vault.token(),
            strategist,
            keeper: strategist,
            reserve: 0,
            exit: ExitState::Active,
            trigger: HarvestTrigger::default(),
            venue,
        }
    }

    /// Keeps `reserve` units loose instead of deploying them.
    pub fn with_reserve(mut self, reserve: u128) -> Self {
        self.reserve = reserve;
        self
    }

    /// Overrides the default harvest-trigger tuning.
    pub fn with_trigger(mut self, trigger: HarvestTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn vault(&self) -> Address {
        self.vault
    }

    pub fn want(&self) -> Address {
        self.want
    }

    pub fn strategist(&self) -> Address {
        self.strategist
    }

    pub fn keeper(&self) -> Address {
        self.keeper
    }

    pub fn reserve(&self) -> u128 {
        self.reserve
    }

    /// `true` once the exit latch is set.
    pub fn emergency_exit(&self) -> bool {
        self.exit.is_latched()
    }

    pub fn exit_state(&self) -> ExitState {
        self.exit
    }

    pub fn trigger(&self) -> &HarvestTrigger {
        &self.trigger
    }

    pub fn venue(&self) -> &V {
        &self.venue
    }

    pub fn venue_mut(&mut self) -> &mut V {
        &mut self.venue
    }

    /// Principals for an authorization check. Governance is whoever
    /// governs the vault this strategy was deployed for.
    fn roles(&self, vault: &Vault) -> Result<Roles, VaultError> {
        if vault.address() != self.vault {
            return Err(VaultError::inactive(
                &self.address,
                format!("bound to vault {}, not {}", self.vault, vault.address()),
            ));
        }
        Ok(Roles {
            governance: Some(vault.governance()),
            strategist: Some(self.strategist),
            keeper: Some(self.keeper),
            strategy: Some(self.address),
            vault: Some(self.vault),
            ..Roles::default()
        })
    }

    // -----------------------------------------------------------------------
    // Roles
    // -----------------------------------------------------------------------

    /// Governance or the current strategist.
    pub fn set_strategist(
        &mut self,
        caller: &Address,
        vault: &Vault,
        strategist: Address,
    ) -> Result<(), VaultError> {
        guard::authorize(Operation::SetStrategist, &self.roles(vault)?, caller)?;
        self.strategist = strategist;
        info!(strategy = %self.address, %strategist, "strategist changed");
        Ok(())
    }

    /// Governance or the strategist. The keeper cannot reassign itself.
    pub fn set_keeper(&mut self, caller: &Address, vault: &Vault, keeper: Address) -> Result<(), VaultError> {
        guard::authorize(Operation::SetKeeper, &self.roles(vault)?, caller)?;
        self.keeper = keeper;
        info!(strategy = %self.address, %keeper, "keeper changed");
        Ok(())
    }

    /// Latches the exit here and on the vault. Can only be set once.
    ///
    /// # Errors
    ///
    /// [`VaultError::Unauthorized`] unless governance or the strategist,
    /// [`VaultError::StrategyInactive`] if already set.
    pub fn set_emergency_exit(&mut self, caller: &Address, vault: &mut Vault) -> Result<(), VaultError> {
        guard::authorize(Operation::SetEmergencyExit, &self.roles(vault)?, caller)?;
        let exit = self.exit.request_exit(&self.address)?;

        let vault_side_open = vault
            .strategy(&self.address)
            .is_some_and(|record| !record.exit.is_latched());
        if vault_side_open {
            vault.revoke_strategy(&self.address, &self.address)?;
        }

        self.exit = exit;
        warn!(strategy = %self.address, by = %caller, "emergency exit set");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Valuation
    // -----------------------------------------------------------------------

    /// Loose balance plus the venue position.
    pub fn estimated_total_assets(&self, token: &dyn AssetToken, block: u64) -> u128 {
        token
            .balance_of(&self.address)
            .saturating_add(self.venue.valuation(block))
    }

    /// Unrealized gain over the debt the vault has on record.
    pub fn expected_return(&self, vault: &Vault, token: &dyn AssetToken, block: u64) -> u128 {
        let Some(record) = vault.strategy(&self.address) else {
            return 0;
        };
        self.estimated_total_assets(token, block)
            .saturating_sub(record.debt.outstanding_debt)
    }

    /// Whether a harvest costing `call_cost` is worth calling now. Always
    /// `false` until the vault has registered the strategy.
    pub fn harvest_trigger(
        &self,
        vault: &Vault,
        token: &dyn AssetToken,
        call_cost: u128,
        block: u64,
    ) -> bool {
        let Some(record) = vault.strategy(&self.address) else {
            return false;
        };
        let inputs = TriggerInputs {
            blocks_since_report: block.saturating_sub(record.debt.last_report_block),
            debt_outstanding: vault.debt_outstanding(&self.address),
            debt: record.debt.outstanding_debt,
            total_assets: self.estimated_total_assets(token, block),
            credit_available: vault.credit_available(&self.address, block),
        };
        self.trigger.should_harvest(&inputs, call_cost)
    }

    pub fn tend_trigger(&self, call_cost: u128) -> bool {
        self.trigger.should_tend(call_cost)
    }

    // -----------------------------------------------------------------------
    // Harvest
    // -----------------------------------------------------------------------

    /// Realizes gains and losses with the vault, repays what it wants back,
    /// draws available credit, and redeploys. Keeper, strategist or
    /// governance.
    ///
    /// # Errors
    ///
    /// Anything [`Vault::report`] rejects, plus [`VaultError::Venue`] if
    /// the venue cannot free capital an exit needs.
    pub fn harvest(
        &mut self,
        caller: &Address,
        vault: &mut Vault,
        token: &mut dyn AssetToken,
        block: u64,
    ) -> Result<Settlement, VaultError> {
        let role = guard::authorize(Operation::Harvest, &self.roles(vault)?, caller)?;
        let record = vault
            .strategy(&self.address)
            .ok_or_else(|| VaultError::inactive(&self.address, "not registered with the vault"))?;

        if self.exit.is_latched() || record.exit.is_latched() {
            return self.harvest_exit(vault, token, block);
        }

        let debt = record.debt.outstanding_debt;
        let outstanding = vault.debt_outstanding(&self.address);
        let total = self.estimated_total_assets(token, block);
        let profit = total.saturating_sub(debt);
        let to_free = profit.saturating_add(outstanding).min(total);

        let loose = self.free(token, to_free, block)?;
        let held = self.estimated_total_assets(token, block);
        let payment = to_free.min(loose);
        let credit = vault.preview_credit(&self.address, held, payment, block);
        debug!(
            strategy = %self.address,
            ?role,
            held,
            debt,
            payment,
            credit,
            "harvest computed"
        );

        token.approve(&self.address, &vault.address(), payment)?;
        let settlement = vault.report(
            &self.address,
            SettlementRequest {
                total_assets_held: held,
                debt_payment: payment,
                credit_requested: credit,
            },
            token,
            block,
        )?;

        // The settlement is committed; a venue refusing the redeploy only
        // leaves capital loose until the next tend or harvest.
        if let Err(err) = self.adjust_position(token, block) {
            warn!(strategy = %self.address, error = %err, "redeploy after harvest failed");
        }
        Ok(settlement)
    }

    /// Pulls the whole position out of the venue and repays the vault.
    fn harvest_exit(
        &mut self,
        vault: &mut Vault,
        token: &mut dyn AssetToken,
        block: u64,
    ) -> Result<Settlement, VaultError> {
        let position = self.venue.valuation(block);
        if position > 0 {
            let available = self.venue.withdrawable(block);
            if available < position {
                return Err(VenueError::InsufficientLiquidity {
                    requested: position,
                    available,
                }
                .into());
            }
            self.venue.withdraw(token, &self.address, position, block)?;
        }

        let held = token.balance_of(&self.address);
        token.approve(&self.address, &vault.address(), held)?;
        let settlement = vault.report(
            &self.address,
            SettlementRequest::full_repayment(held),
            token,
            block,
        )?;
        self.exit = self.exit.after_settlement(settlement.debt_after);

        warn!(strategy = %self.address, returned = held, "exit harvest repaid the vault");
        Ok(settlement)
    }

    /// Redeploys loose capital without reporting. Keeper, strategist or
    /// governance. Returns the amount deployed.
    pub fn tend(
        &mut self,
        caller: &Address,
        vault: &Vault,
        token: &mut dyn AssetToken,
        block: u64,
    ) -> Result<u128, VaultError> {
        guard::authorize(Operation::Tend, &self.roles(vault)?, caller)?;
        self.adjust_position(token, block)
    }

    /// Tops the loose balance up to `amount` from the venue, as far as the
    /// venue allows. Returns the loose balance afterwards.
    fn free(&mut self, token: &mut dyn AssetToken, amount: u128, block: u64) -> Result<u128, VaultError> {
        let loose = token.balance_of(&self.address);
        if loose < amount {
            let pull = (amount - loose).min(self.venue.withdrawable(block));
            if pull > 0 {
                self.venue.withdraw(token, &self.address, pull, block)?;
            }
        }
        Ok(token.balance_of(&self.address))
    }

    /// Deposits everything above the reserve into the venue.
    fn adjust_position(&mut self, token: &mut dyn AssetToken, block: u64) -> Result<u128, VaultError> {
        if self.exit.is_latched() {
            return Ok(0);
        }
        let deploy = token.balance_of(&self.address).saturating_sub(self.reserve);
        if deploy > 0 {
            self.venue.deposit(token, &self.address, deploy, block)?;
            debug!(strategy = %self.address, deploy, "capital deployed");
        }
        Ok(deploy)
    }
}

impl<V: YieldVenue> StrategyHandle for Strategy<V> {
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

    fn liquid_assets(&self, token: &dyn AssetToken, block: u64) -> u128 {
        token
            .balance_of(&self.address)
            .saturating_add(self.venue.withdrawable(block))
    }

    /// Vault only.
    fn liquidate(
        &mut self,
        caller: &Address,
        token: &mut dyn AssetToken,
        amount: u128,
        block: u64,
    ) -> Result<u128, VaultError> {
        let roles = Roles {
            vault: Some(self.vault),
            ..Roles::default()
        };
        guard::authorize(Operation::Liquidate, &roles, caller)?;

        let loose = self.free(token, amount, block)?;
        let freed = amount.min(loose);
        if freed > 0 {
            token.transfer(&self.address, caller, freed)?;
        }
        debug!(strategy = %self.address, requested = amount, freed, "liquidated");
        Ok(freed)
    }
}
