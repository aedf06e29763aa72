//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout carries only the run summary. `RUST_LOG`
//! (from the environment or `.env`) overrides the level chosen by `-v`.

use tracing_subscriber::EnvFilter;

pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "sml2iso=debug,info" } else { "info" }
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_enables_crate_debug_logs() {
        assert_eq!(default_directive(false), "info");
        assert!(default_directive(true).contains("sml2iso=debug"));
        init(true);
        init(false);
    }
}
