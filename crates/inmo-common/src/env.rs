//! Environment variable lookups
//!
//! Every binary loads `.env` through `dotenvy` first; these helpers only read
//! the resulting process environment. Blank values count as unset.

use crate::error::{InmoError, Result};
use std::str::FromStr;

/// Read a variable, treating unset and whitespace-only values as absent
pub fn var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a variable or fall back to `default`
pub fn var_or(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|| default.to_string())
}

/// Parse a variable, returning `default` when unset.
///
/// A value that is present but does not parse is an error rather than a
/// silent fallback.
pub fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| InmoError::InvalidEnv {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_blank_is_unset() {
        std::env::set_var("INMO_TEST_BLANK", "   ");
        assert_eq!(var("INMO_TEST_BLANK"), None);
        assert_eq!(var_or("INMO_TEST_BLANK", "fallback"), "fallback");
        std::env::remove_var("INMO_TEST_BLANK");
    }

    #[test]
    #[serial]
    fn test_parse_or() {
        std::env::remove_var("INMO_TEST_PORT");
        assert_eq!(parse_or("INMO_TEST_PORT", 5432u16).unwrap(), 5432);

        std::env::set_var("INMO_TEST_PORT", "6543");
        assert_eq!(parse_or("INMO_TEST_PORT", 5432u16).unwrap(), 6543);

        std::env::set_var("INMO_TEST_PORT", "not-a-port");
        let err = parse_or("INMO_TEST_PORT", 5432u16).unwrap_err();
        assert!(err.to_string().contains("INMO_TEST_PORT"));

        std::env::remove_var("INMO_TEST_PORT");
    }
}
