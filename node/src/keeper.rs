//! # Harvest Keeper
//!
//! On every tick the keeper asks each strategy whether a harvest is worth
//! its cost and harvests the ones that say yes, acting as each strategy's
//! configured keeper. A rejected harvest is logged and counted; it never
//! stops the other strategies from being evaluated.

use serde::Serialize;
use tracing::{error, info, warn};

use yvault_protocol::vault::Settlement;
use yvault_protocol::Address;

use crate::metrics::KeeperMetrics;
use crate::simulation::Simulation;

/// A harvest the trigger asked for that did not settle.
#[derive(Debug, Clone, Serialize)]
pub struct HarvestFailure {
    pub strategy: Address,
    pub error: String,
    pub retryable: bool,
}

/// What one tick did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub block: u64,
    pub harvested: Vec<Settlement>,
    pub failed: Vec<HarvestFailure>,
    /// Strategies whose trigger said the harvest was not worth it.
    pub skipped: usize,
}

/// Drives the strategies of one deployment.
pub struct Keeper {
    simulation: Simulation,
    /// Harvest cost estimate in asset units, weighed by each trigger.
    call_cost: u128,
    metrics: KeeperMetrics,
}

impl Keeper {
    pub fn new(simulation: Simulation, call_cost: u128, metrics: KeeperMetrics) -> Self {
        Self {
            simulation,
            call_cost,
            metrics,
        }
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    pub fn metrics(&self) -> &KeeperMetrics {
        &self.metrics
    }

    /// Advances to `block`, then evaluates and harvests every strategy.
    pub fn tick(&mut self, block: u64) -> TickReport {
        self.simulation.advance_to(block);
        let mut report = TickReport {
            block: self.simulation.block(),
            ..TickReport::default()
        };

        for index in 0..self.simulation.strategies().len() {
            let strategy = &self.simulation.strategies()[index];
            let (address, keeper) = (strategy.address(), strategy.keeper());

            if !self.simulation.harvest_trigger(index, self.call_cost) {
                report.skipped += 1;
                continue;
            }

            match self.simulation.harvest(index, &keeper) {
                Ok(settlement) => {
                    self.metrics.harvests_total.inc();
                    info!(
                        strategy = %address,
                        block = report.block,
                        gain = settlement.gain,
                        loss = settlement.loss,
                        credit = settlement.credit,
                        debt = settlement.debt_after,
                        "harvested"
                    );
                    report.harvested.push(settlement);
                }
                Err(e) => {
                    self.metrics.harvest_failures_total.inc();
                    let retryable = e.is_retryable();
                    if retryable {
                        warn!(strategy = %address, error = %e, "harvest deferred");
                    } else {
                        error!(strategy = %address, error = %e, "harvest rejected");
                    }
                    report.failed.push(HarvestFailure {
                        strategy: address,
                        error: e.to_string(),
                        retryable,
                    });
                }
            }
        }

        self.metrics.observe(self.simulation.vault(), report.block);
        report
    }
}
