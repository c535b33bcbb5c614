//! Environment configuration helpers
//!
//! Typed lookups over process environment variables with defaults.

use std::env;
use std::str::FromStr;

/// Error for a present but unparseable environment variable
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

/// Read `key` and parse it, or fall back to `default` when unset or blank.
pub fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => parse_value(key, &raw),
        _ => Ok(default),
    }
}

/// Read `key` if set and non-blank.
pub fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<u32>("K", " 42 ").unwrap(), 42);
        assert!(matches!(
            parse_value::<u32>("K", "forty"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_env_or_default_when_unset() {
        let value: u64 = env_or("PLATFORM_TEST_SURELY_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
        assert!(env_opt("PLATFORM_TEST_SURELY_UNSET_VARIABLE").is_none());
    }
}
