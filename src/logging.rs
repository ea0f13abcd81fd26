//! Diagnostic logging setup.

use crate::secret::{MASK, is_secret};
use std::any::Any;
use std::fmt::Display;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` for this crate when
/// `verbose` is on. Output goes to stderr so stdout stays machine-readable.
pub fn init(verbose: bool) {
    let default = if verbose {
        "info,kodegen_bundler_notarize=debug,kodegen_notarize=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Render `value` for a log line, masking it if it is a secret.
pub fn redacted<T: Any + Display>(value: &T) -> String {
    if is_secret(value) {
        MASK.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::make_secret;

    #[test]
    fn test_redacted_masks_secrets_only() {
        assert_eq!(redacted(&make_secret("app-specific")), MASK);
        assert_eq!(redacted(&"dev@example.test"), "dev@example.test");
        assert_eq!(redacted(&7), "7");
    }
}
