//! # Prometheus Metrics
//!
//! Operational metrics for the keeper. Scraped by Prometheus at the
//! `/metrics` HTTP endpoint when the keeper runs as a service, and
//! rendered on demand by `simulate`.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};

use yvault_protocol::Vault;

/// Holds all Prometheus metric handles for the keeper.
///
/// Prometheus handles are reference-counted, so clones share the same
/// underlying series.
#[derive(Clone)]
pub struct KeeperMetrics {
    registry: Registry,
    /// Harvests that settled with the vault.
    pub harvests_total: IntCounter,
    /// Harvests the trigger asked for that the vault or venue rejected.
    pub harvest_failures_total: IntCounter,
    /// Block the keeper last evaluated.
    pub block_height: IntGauge,
    /// Price per share in asset units, scaled down by the vault's decimals.
    pub price_per_share: Gauge,
    /// Capital lent to strategies, in whole tokens.
    pub total_debt: Gauge,
    /// Capital held by the vault itself, in whole tokens.
    pub idle: Gauge,
}

impl KeeperMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("yvault".into()), None)?;

        let harvests_total =
            IntCounter::new("harvests_total", "Total number of harvests settled with the vault")?;
        registry.register(Box::new(harvests_total.clone()))?;

        let harvest_failures_total = IntCounter::new(
            "harvest_failures_total",
            "Total number of triggered harvests that were rejected",
        )?;
        registry.register(Box::new(harvest_failures_total.clone()))?;

        let block_height = IntGauge::new("block_height", "Block last evaluated by the keeper")?;
        registry.register(Box::new(block_height.clone()))?;

        let price_per_share = Gauge::new("price_per_share", "Asset value of one vault share")?;
        registry.register(Box::new(price_per_share.clone()))?;

        let total_debt = Gauge::new("total_debt", "Capital lent to strategies")?;
        registry.register(Box::new(total_debt.clone()))?;

        let idle = Gauge::new("idle", "Capital held by the vault")?;
        registry.register(Box::new(idle.clone()))?;

        Ok(Self {
            registry,
            harvests_total,
            harvest_failures_total,
            block_height,
            price_per_share,
            total_debt,
            idle,
        })
    }

    /// Refreshes the gauges from the vault's current state.
    pub fn observe(&self, vault: &Vault, block: u64) {
        let decimals = vault.decimals();
        self.block_height.set(saturating_i64(block));
        self.total_debt.set(in_tokens(vault.total_debt(), decimals));
        self.idle.set(in_tokens(vault.idle(), decimals));
        if let Ok(price) = vault.price_per_share() {
            self.price_per_share.set(in_tokens(price, decimals));
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Raw asset units scaled down to whole tokens. Precision loss is fine for
/// a gauge.
fn in_tokens(amount: u128, decimals: u8) -> f64 {
    amount as f64 / 10f64.powi(i32::from(decimals))
}

/// Shared metrics state passed to the axum handler.
pub type SharedMetrics = Arc<KeeperMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

/// Router serving [`metrics_handler`] at `/metrics`.
pub fn router(metrics: SharedMetrics) -> axum::Router {
    axum::Router::new()
        .route("/metrics", axum::routing::get(metrics_handler))
        .with_state(metrics)
}
