#![forbid(unsafe_code)]

use std::sync::OnceLock;
use tracing_subscriber::{
    fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter,
};

static INIT: OnceLock<()> = OnceLock::new();

/// Install the stderr log subscriber.  `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let _ = INIT.get_or_init(|| {
        let default = if verbose { "debug" } else { "warn" };
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(env_filter)
            .try_init();
    });
}
