//! Tracing subscriber setup for the binary.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Install the stderr subscriber.
///
/// `PRICING_LOG` (e.g. `PRICING_LOG=pricing_core=debug`) takes precedence
/// over `default_filter`. Only the first call has any effect.
pub fn init(default_filter: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("PRICING_LOG")
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        // A subscriber installed by an embedding process wins.
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .try_init();
    });
}
