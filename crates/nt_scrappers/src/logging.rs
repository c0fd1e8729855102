use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Install the global subscriber. Safe to call more than once; only the first
/// call (and only if nothing else installed a subscriber) has an effect.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn init_logging(format: LogFormat) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false);
        // A subscriber installed elsewhere in the meantime is fine.
        let _ = match format {
            LogFormat::Pretty => builder.try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
    });
}
