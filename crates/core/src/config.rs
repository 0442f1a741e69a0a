use std::env;
use std::str::FromStr;

use crate::error::FetcherError;

/// Read an environment variable with a default, parsing it with `FromStr`.
/// An unparseable value is a configuration error (§7 point 5: fatal at
/// startup), not silently ignored.
pub fn env_parsed<T>(key: &str, default: T) -> Result<T, FetcherError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| FetcherError::Config(format!("{key}: invalid value {raw:?}: {e}"))),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => {
            Err(FetcherError::Config(format!("{key}: not valid UTF-8")))
        }
    }
}

/// Read a string environment variable with a default.
pub fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parsed_falls_back_to_default_when_unset() {
        env::remove_var("OTTO_TEST_ENV_PARSED_UNSET");
        let v: f64 = env_parsed("OTTO_TEST_ENV_PARSED_UNSET", 1.5).unwrap();
        assert_eq!(v, 1.5);
    }

    #[test]
    fn env_parsed_rejects_unparseable_value() {
        env::set_var("OTTO_TEST_ENV_PARSED_BAD", "not-a-number");
        let err = env_parsed::<u32>("OTTO_TEST_ENV_PARSED_BAD", 1).unwrap_err();
        assert!(matches!(err, FetcherError::Config(_)));
        env::remove_var("OTTO_TEST_ENV_PARSED_BAD");
    }

    #[test]
    fn env_string_uses_default_when_unset() {
        env::remove_var("OTTO_TEST_ENV_STRING_UNSET");
        assert_eq!(env_string("OTTO_TEST_ENV_STRING_UNSET", "fallback"), "fallback");
    }
}
