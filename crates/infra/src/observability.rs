//! Tracing initialization.

use my500_domain::{My500Error, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise `info` with the
/// workspace crates at `debug` when `verbose` is requested.
pub fn init_tracing(verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "info,my500_core=debug,my500_infra=debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .map_err(|err| My500Error::Internal(format!("failed to install tracing: {err}")))
}
