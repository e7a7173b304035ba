//! Logging bootstrap

use tracing_subscriber::EnvFilter;

use crate::error::{SeamcutError, SeamcutResult};

/// Levels accepted by `--log-level` and the `[logging]` section
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate and normalize a log level name
pub fn parse_level(level: &str) -> SeamcutResult<String> {
    let normalized = level.trim().to_lowercase();
    if LOG_LEVELS.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(SeamcutError::Config {
            message: format!(
                "invalid log level '{}', expected one of: {}",
                level,
                LOG_LEVELS.join(", ")
            ),
        })
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set. Logs go to stderr so
/// that command output on stdout stays machine readable.
pub fn init_logging(level: &str, json: bool) -> SeamcutResult<()> {
    let level = parse_level(level)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| SeamcutError::Config {
        message: format!("failed to initialize logging: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("INFO").unwrap(), "info");
        assert_eq!(parse_level(" debug ").unwrap(), "debug");
        assert!(parse_level("loud").is_err());
    }
}
