//! # Strategy Module
//!
//! Strategies borrow from the vault and put the capital to work. This
//! module provides the base strategy every venue-specific strategy is
//! built from, plus the advisory triggers keepers consult before paying
//! for a harvest.
//!
//! ```text
//! base.rs     Strategy<V>: roles, exit latch, harvest, tend, liquidation
//! trigger.rs  When a harvest (or tend) is worth calling
//! ```

pub mod base;
pub mod trigger;

pub use base::Strategy;
pub use trigger::{HarvestTrigger, TriggerInputs};
