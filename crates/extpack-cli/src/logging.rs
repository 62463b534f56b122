//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Environment variable holding an explicit filter, e.g. `extpack_bundle=debug`.
pub const LOG_ENV: &str = "EXTPACK_LOG";

/// Level used when `EXTPACK_LOG` is unset.
pub fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Filter from `EXTPACK_LOG`, or from the `-v` count when it is unset or invalid.
pub fn filter(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Install the global subscriber, writing to stderr.
pub fn init(verbose: u8) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn default_directive___maps_verbosity_to_level() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(1), "info");
        assert_eq!(default_directive(2), "debug");
        assert_eq!(default_directive(3), "trace");
        assert_eq!(default_directive(9), "trace");
    }

    #[test]
    fn init___twice___does_not_panic() {
        init(1);
        init(2);
    }
}
