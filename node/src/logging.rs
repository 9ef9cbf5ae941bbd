//! # Keeper Logging
//!
//! Every crate in the workspace logs through `tracing`; this module installs
//! the one subscriber that collects them:
//!
//! | Target             | What it records                                         |
//! |--------------------|---------------------------------------------------------|
//! | `yvault_keeper`    | deployments, ticks, settled / deferred / rejected harvests |
//! | `yvault_protocol`  | vault events, trigger decisions, settlement arithmetic  |
//! | `yvault_contracts` | token transfers and market accrual                      |
//!
//! Records go to stderr. Stdout carries the reports of `deploy --example`,
//! `deploy --json` and `simulate --json`, which are meant to be piped.
//!
//! The filter comes from `RUST_LOG` when it is set, otherwise from
//! `--log-level` / `YVAULT_LOG`. `--log-format` / `YVAULT_LOG_FORMAT`
//! picks between terminal output and JSON lines whose event fields
//! (`strategy`, `gain`, `credit`, ...) sit at the top level of each object.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor `--log-level` says otherwise.
/// Harvest outcomes from the keeper, vault events from the protocol.
pub const DEFAULT_DIRECTIVES: &str = "yvault_keeper=info,yvault_protocol=info,yvault_contracts=warn";

/// How records are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Terminal output with targets, for running the keeper by hand.
    Pretty,
    /// One JSON object per record, for log shipping when the keeper runs
    /// as a service.
    Json,
}

impl LogFormat {
    /// `json` in any case selects [`LogFormat::Json`]; anything else falls
    /// back to [`LogFormat::Pretty`] rather than refusing to start.
    pub fn from_flag(flag: &str) -> Self {
        if flag.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// `RUST_LOG` if set and valid, else `directives`. Invalid directives fall
/// back to [`DEFAULT_DIRECTIVES`].
fn keeper_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Installs the global subscriber. Called once from `main` before any
/// subcommand other than `version` runs; a second call panics.
pub fn init_logging(directives: &str, format: LogFormat) {
    let filter = keeper_filter(directives);

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_file(false),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_writer(std::io::stderr)
                        .with_target(true),
                )
                .init();
        }
    }

    tracing::debug!(?format, directives, "keeper logging ready");
}
