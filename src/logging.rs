//! Structured logging for the CLI.
//!
//! The library only emits `tracing` events; installing a subscriber is up to
//! the binary (or an embedding host).

use tracing_subscriber::EnvFilter;

/// Filter directives are read from this variable, e.g. `GLITCHLINE_LOG=glitchline=debug`.
pub const LOG_ENV_VAR: &str = "GLITCHLINE_LOG";

/// Default directive for a `-v` count when the env var is unset.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install a stderr `fmt` subscriber. Safe to call more than once; later calls are no-ops.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(1), "info");
        assert_eq!(default_directive(2), "debug");
        assert_eq!(default_directive(9), "trace");
    }

    #[test]
    fn repeated_init_does_not_panic() {
        init(0);
        init(2);
    }
}
