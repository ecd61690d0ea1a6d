//! Structured logging setup
//!
//! Compact human-readable output by default; `verbose` pulls in target,
//! span-close events, and debug-level orchestrator spans.

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initialise the global tracing subscriber. Safe to call once at process
/// start; returns an error if a subscriber is already installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| {
        if verbose {
            EnvFilter::try_new("passive_rec=debug,info")
        } else {
            EnvFilter::try_new("passive_rec=info,warn")
        }
    })?;

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).compact())
            .try_init()?;
    }

    Ok(())
}
