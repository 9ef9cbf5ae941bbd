//! # Deployment Configuration
//!
//! One JSON file describes a deployment: the asset, the vault's roles and
//! naming, and the strategies governance registers at launch. Addresses are
//! checked for format when the file is parsed; nothing here can tell
//! whether an address belongs to anyone.
//!
//! ```json
//! {
//!   "deployer": "0xd0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0",
//!   "token": { "name": "Curve DAO Token", "symbol": "CRV", "decimals": 18 },
//!   "governance": "0x0101010101010101010101010101010101010101",
//!   "rewards": "0x0202020202020202020202020202020202020202",
//!   "strategies": [
//!     {
//!       "strategist": "0x0404040404040404040404040404040404040404",
//!       "debt_limit": 1000000000000000000000000,
//!       "rate_limit_per_block": 10000000000000000000000
//!     }
//!   ]
//! }
//! ```

use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};

use yvault_contracts::MarketConfig;
use yvault_protocol::config::{DEFAULT_STRATEGIST_FEE_BPS, MAX_BPS, MAX_DECIMALS};
use yvault_protocol::Address;

/// The asset the vault accepts. The deployer is its issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// A strategy registered at launch, lending into its own market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    pub strategist: Address,
    /// Defaults to the strategist.
    #[serde(default)]
    pub keeper: Option<Address>,
    pub debt_limit: u128,
    pub rate_limit_per_block: u128,
    #[serde(default = "default_strategist_fee")]
    pub performance_fee_bps: u64,
    /// Loose balance the strategy keeps out of the market.
    #[serde(default)]
    pub reserve: u128,
    #[serde(default)]
    pub market: MarketConfig,
}

fn default_strategist_fee() -> u64 {
    DEFAULT_STRATEGIST_FEE_BPS
}

/// A complete deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentConfig {
    /// Issues the token and deploys the vault and markets. Every contract
    /// address is derived from it.
    pub deployer: Address,
    pub token: TokenConfig,
    pub governance: Address,
    pub rewards: Address,
    /// Defaults to governance.
    #[serde(default)]
    pub guardian: Option<Address>,
    /// Share-token name override.
    #[serde(default)]
    pub name: Option<String>,
    /// Share-token symbol override.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Vault-level performance fee paid to `rewards`.
    #[serde(default)]
    pub performance_fee_bps: u64,
    /// Minted to governance and deposited right after deployment.
    #[serde(default)]
    pub seed_deposit: u128,
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
}

impl DeploymentConfig {
    /// Reads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read deployment config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid deployment config {}", path.display()))
    }

    /// Parses and validates a configuration from JSON text.
    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw).context("malformed JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything the vault would otherwise reject halfway through
    /// a deployment.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.token.decimals <= MAX_DECIMALS,
            "token decimals {} exceed {MAX_DECIMALS}",
            self.token.decimals
        );
        ensure!(!self.token.symbol.is_empty(), "token symbol is empty");
        for (role, address) in [
            ("deployer", self.deployer),
            ("governance", self.governance),
            ("rewards", self.rewards),
        ] {
            if address.is_zero() {
                bail!("{role} is the zero address");
            }
        }
        ensure!(
            self.performance_fee_bps <= MAX_BPS,
            "vault performance fee {} bps exceeds {MAX_BPS}",
            self.performance_fee_bps
        );
        for (index, strategy) in self.strategies.iter().enumerate() {
            ensure!(
                !strategy.strategist.is_zero(),
                "strategy {index}: strategist is the zero address"
            );
            ensure!(
                strategy.performance_fee_bps <= MAX_BPS,
                "strategy {index}: performance fee {} bps exceeds {MAX_BPS}",
                strategy.performance_fee_bps
            );
        }
        Ok(())
    }

    /// A single-strategy deployment on an 18-decimal asset, printed by
    /// `deploy --example`. One million tokens are seeded and may all be
    /// lent out, at most ten thousand per block.
    pub fn example() -> Self {
        let whole = 10u128.pow(18);
        Self {
            deployer: Address::repeat_byte(0xd0),
            token: TokenConfig {
                name: "Curve DAO Token".into(),
                symbol: "CRV".into(),
                decimals: 18,
            },
            governance: Address::repeat_byte(0x01),
            rewards: Address::repeat_byte(0x02),
            guardian: None,
            name: None,
            symbol: None,
            performance_fee_bps: 0,
            seed_deposit: 1_000_000 * whole,
            strategies: vec![StrategyConfig {
                strategist: Address::repeat_byte(0x04),
                keeper: None,
                debt_limit: 1_000_000 * whole,
                rate_limit_per_block: 10_000 * whole,
                performance_fee_bps: DEFAULT_STRATEGIST_FEE_BPS,
                reserve: 0,
                market: MarketConfig::default(),
            }],
        }
    }
}
