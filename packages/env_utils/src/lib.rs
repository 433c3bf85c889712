#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Runtime configuration helpers that read environment variables with typed defaults.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvUsizeError {
    #[error(transparent)]
    Var(#[from] std::env::VarError),
    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),
}

/// # Errors
///
/// * If the environment variable is missing
/// * If encounters an invalid digit in the value
pub fn env_usize(name: &str) -> Result<usize, EnvUsizeError> {
    Ok(std::env::var(name)?.parse::<usize>()?)
}

#[derive(Error, Debug)]
pub enum DefaultEnvUsizeError {
    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),
}

/// # Errors
///
/// * If encounters an invalid digit in the value
pub fn default_env_usize(name: &str, default: usize) -> Result<usize, DefaultEnvUsizeError> {
    match std::env::var(name) {
        Ok(value) => Ok(value.parse::<usize>()?),
        Err(_) => Ok(default),
    }
}

/// # Errors
///
/// * If encounters an invalid digit in the value
/// * If the value does not fit in a `u16`
pub fn default_env_u16(name: &str, default: u16) -> Result<u16, DefaultEnvUsizeError> {
    match std::env::var(name) {
        Ok(value) => Ok(value.parse::<u16>()?),
        Err(_) => Ok(default),
    }
}

#[derive(Error, Debug)]
pub enum OptionEnvUsizeError {
    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),
}

/// # Errors
///
/// * If encounters an invalid digit in the value
pub fn option_env_usize(name: &str) -> Result<Option<usize>, OptionEnvUsizeError> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value.parse::<usize>()?)),
        Err(_) => Ok(None),
    }
}

/// # Errors
///
/// * If encounters an invalid digit in the value
/// * If the value does not fit in a `u16`
pub fn option_env_u16(name: &str) -> Result<Option<u16>, OptionEnvUsizeError> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value.parse::<u16>()?)),
        Err(_) => Ok(None),
    }
}

#[must_use]
pub fn default_env(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Reads a boolean flag. `1`, `true` and `yes` (any case) are truthy, anything else set is
/// falsy, and an unset variable yields `default`.
#[must_use]
pub fn default_env_bool(name: &str, default: bool) -> bool {
    std::env::var(name).map_or(default, |value| {
        matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
    })
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    use super::*;

    fn set(name: &str, value: &str) {
        unsafe { std::env::set_var(name, value) };
    }

    fn unset(name: &str) {
        unsafe { std::env::remove_var(name) };
    }

    #[test_log::test]
    #[serial]
    fn default_env_falls_back_when_unset() {
        unset("BATTLEJONG_TEST_ENV");

        assert_eq!(default_env("BATTLEJONG_TEST_ENV", "fallback"), "fallback");
    }

    #[test_log::test]
    #[serial]
    fn default_env_reads_value_when_set() {
        set("BATTLEJONG_TEST_ENV", "value");

        assert_eq!(default_env("BATTLEJONG_TEST_ENV", "fallback"), "value");

        unset("BATTLEJONG_TEST_ENV");
    }

    #[test_log::test]
    #[serial]
    fn option_env_u16_rejects_out_of_range_port() {
        set("BATTLEJONG_TEST_PORT", "70000");

        assert!(option_env_u16("BATTLEJONG_TEST_PORT").is_err());

        unset("BATTLEJONG_TEST_PORT");
    }

    #[test_log::test]
    #[serial]
    fn default_env_usize_parses_value() {
        set("BATTLEJONG_TEST_USIZE", "42");

        assert_eq!(default_env_usize("BATTLEJONG_TEST_USIZE", 7).unwrap(), 42);

        unset("BATTLEJONG_TEST_USIZE");

        assert_eq!(default_env_usize("BATTLEJONG_TEST_USIZE", 7).unwrap(), 7);
    }

    #[test_log::test]
    #[serial]
    fn env_usize_errors_when_missing() {
        unset("BATTLEJONG_TEST_USIZE");

        assert!(matches!(
            env_usize("BATTLEJONG_TEST_USIZE"),
            Err(EnvUsizeError::Var(_))
        ));
    }

    #[test_log::test]
    #[serial]
    fn default_env_bool_understands_common_spellings() {
        set("BATTLEJONG_TEST_BOOL", "TRUE");
        assert!(default_env_bool("BATTLEJONG_TEST_BOOL", false));

        set("BATTLEJONG_TEST_BOOL", "0");
        assert!(!default_env_bool("BATTLEJONG_TEST_BOOL", true));

        unset("BATTLEJONG_TEST_BOOL");
        assert!(default_env_bool("BATTLEJONG_TEST_BOOL", true));
    }
}
