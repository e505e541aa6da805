// Logging setup - tracing subscriber with an env filter

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Filter used when RUST_LOG is unset: the configured level for this crate, warnings elsewhere
pub fn default_filter(level: &str) -> String {
    format!("warn,posture_stream={level},posture_stream_lib={level}")
}

/// Install the global subscriber. RUST_LOG wins over the configured level.
/// Returns false if a subscriber was already installed.
pub fn init(level: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_filter(env_filter))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        let filter = default_filter("debug");
        assert!(filter.contains("posture_stream_lib=debug"));
        assert!(filter.parse::<EnvFilter>().is_ok());
    }

    #[test]
    fn test_second_init_is_refused() {
        let _ = init("info");
        assert!(!init("info"));
    }
}
