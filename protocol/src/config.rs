//! # Protocol Configuration & Constants
//!
//! Every magic number in yvault lives here. If you're hardcoding a
//! basis-point denominator somewhere else, you're doing it wrong.
//!
//! The values fall into three groups: fee arithmetic, share-token naming,
//! and the advisory harvest-trigger defaults that keepers use to decide
//! whether a settlement is worth paying for.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Engine version string, reported by the keeper binary.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// API version of the vault accounting model. Bumped whenever share or
/// settlement math changes in a way that existing keepers must know about.
pub const VAULT_API_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Fee Parameters
// ---------------------------------------------------------------------------

/// Basis-point denominator. 10_000 bps = 100%.
pub const MAX_BPS: u64 = 10_000;

/// Default vault-level performance fee paid to the rewards recipient.
/// Zero: only the strategist fee applies until governance opts in.
pub const DEFAULT_VAULT_PERFORMANCE_FEE_BPS: u64 = 0;

/// Strategist fee used by deployment tooling when none is configured.
/// 50 bps = 0.5% of realized gains.
pub const DEFAULT_STRATEGIST_FEE_BPS: u64 = 50;

// ---------------------------------------------------------------------------
// Share Token
// ---------------------------------------------------------------------------

/// Prefix prepended to the asset symbol to form the share-token symbol
/// when no override is supplied ("CRV" -> "yvCRV").
pub const SHARE_SYMBOL_PREFIX: &str = "yv";

/// Suffix appended to the asset symbol to form the share-token name
/// when no override is supplied ("CRV" -> "CRV yVault").
pub const SHARE_NAME_SUFFIX: &str = " yVault";

/// Largest supported decimals value. Amounts are `u128`, so an 18-decimal
/// asset still has room for roughly 3.4e20 whole tokens.
pub const MAX_DECIMALS: u8 = 18;

// ---------------------------------------------------------------------------
// Harvest Trigger Defaults
// ---------------------------------------------------------------------------

/// A strategy that hasn't reported for this many blocks should harvest
/// regardless of cost. Roughly one day at 13-second blocks.
pub const DEFAULT_MAX_REPORT_DELAY: u64 = 6_300;

/// Losses smaller than this are ignored by the harvest trigger, since
/// reporting dust costs more than it recovers.
pub const DEFAULT_DEBT_THRESHOLD: u128 = 0;

/// The expected benefit of a harvest must exceed the caller's cost
/// estimate by this factor.
pub const DEFAULT_PROFIT_FACTOR: u64 = 100;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Blocks per year, used only to annualize observed yield in reports.
pub const BLOCKS_PER_YEAR: u64 = 2_300_000;

/// Wall-clock block interval of the simulated chain driven by the keeper.
pub const BLOCK_TIME: Duration = Duration::from_secs(13);

/// Block interval as milliseconds. Keep in sync with [`BLOCK_TIME`].
pub const BLOCK_TIME_MS: u64 = 13_000;

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------

/// Default share-token symbol for an asset symbol.
pub fn default_share_symbol(asset_symbol: &str) -> String {
    format!("{SHARE_SYMBOL_PREFIX}{asset_symbol}")
}

/// Default share-token name for an asset symbol.
pub fn default_share_name(asset_symbol: &str) -> String {
    format!("{asset_symbol}{SHARE_NAME_SUFFIX}")
}
