use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "banco_digital=debug";

/// Installs the global tracing subscriber.
///
/// Reads the filter from `RUST_LOG`, falling back to `default_filter`.
/// Safe to call more than once: later calls are ignored, so both a host
/// process and its tests can initialize logging.
///
/// # Returns
///
/// * `bool` - `true` if this call installed the subscriber.
pub fn init_tracing(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

/// Masks all but the last four characters of a sensitive value for log output.
pub fn mask(value: &str) -> String {
    let total = value.chars().count();
    let visible = total.saturating_sub(4);
    value
        .chars()
        .enumerate()
        .map(|(i, c)| if i < visible { '*' } else { c })
        .collect()
}
