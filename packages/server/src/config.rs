//! Server configuration read from the environment at startup.

use std::{path::PathBuf, str::FromStr as _};

use battlejong_board::{WildcardPolicy, shuffle::DEFAULT_WILDCARD_CAP};
use battlejong_env_utils::{
    DefaultEnvUsizeError, OptionEnvUsizeError, default_env, default_env_bool, default_env_u16,
    default_env_usize, option_env_usize,
};
use battlejong_session::{DEFAULT_CAPACITY, TieBreak};
use battlejong_ws::GameConfig;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_WS_PORT: u16 = 8080;
pub const DEFAULT_HTTP_PORT: u16 = 80;
pub const DEFAULT_STATIC_DIR: &str = "../client/dist";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port argument '{0}'")]
    InvalidPortArgument(String),
    #[error("Invalid {name}: {source}")]
    InvalidNumber {
        name: &'static str,
        source: DefaultEnvUsizeError,
    },
    #[error("Invalid ACTIX_WORKERS: {0}")]
    InvalidWorkers(#[from] OptionEnvUsizeError),
    #[error(transparent)]
    WildcardPolicy(#[from] battlejong_board::shuffle::ParseWildcardPolicyError),
    #[error("Invalid TIE_BREAK '{0}' (expected 'second_player' or 'first_player')")]
    TieBreak(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub ws_port: u16,
    pub http_port: u16,
    /// Directory served by the static listener, or `None` when it is disabled.
    pub static_dir: Option<PathBuf>,
    pub actix_workers: Option<usize>,
    pub game: GameConfig,
}

impl ServerConfig {
    /// Reads the configuration. The first element of `args` after the program name, if
    /// present, overrides `WS_PORT`.
    ///
    /// # Errors
    ///
    /// * If any configured value fails to parse
    pub fn from_env(args: &[String]) -> Result<Self, ConfigError> {
        let ws_port = match args.get(1) {
            Some(arg) => arg
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPortArgument(arg.clone()))?,
            None => number("WS_PORT", default_env_u16("WS_PORT", DEFAULT_WS_PORT))?,
        };
        let http_port = number("HTTP_PORT", default_env_u16("HTTP_PORT", DEFAULT_HTTP_PORT))?;

        let static_dir = default_env_bool("SERVE_STATIC", true)
            .then(|| PathBuf::from(default_env("STATIC_DIR", DEFAULT_STATIC_DIR)));

        let capacity = number(
            "MAX_PLAYERS",
            default_env_usize("MAX_PLAYERS", DEFAULT_CAPACITY),
        )?;
        let wildcard_cap = number(
            "WILDCARD_CAP",
            default_env_usize("WILDCARD_CAP", DEFAULT_WILDCARD_CAP),
        )?;
        let wildcard_policy =
            WildcardPolicy::from_config(&default_env("WILDCARD_POLICY", "legacy"), wildcard_cap)?;

        let tie_break = default_env("TIE_BREAK", TieBreak::default().as_ref());
        let tie_break = TieBreak::from_str(tie_break.trim())
            .map_err(|_| ConfigError::TieBreak(tie_break.clone()))?;

        Ok(Self {
            bind_addr: default_env("BIND_ADDR", DEFAULT_BIND_ADDR),
            ws_port,
            http_port,
            static_dir,
            actix_workers: option_env_usize("ACTIX_WORKERS")?,
            game: GameConfig {
                capacity,
                wildcard_policy,
                tie_break,
            },
        })
    }
}

fn number<T>(name: &'static str, value: Result<T, DefaultEnvUsizeError>) -> Result<T, ConfigError> {
    value.map_err(|source| ConfigError::InvalidNumber { name, source })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    use super::*;

    const VARS: &[&str] = &[
        "BIND_ADDR",
        "WS_PORT",
        "HTTP_PORT",
        "STATIC_DIR",
        "SERVE_STATIC",
        "ACTIX_WORKERS",
        "MAX_PLAYERS",
        "WILDCARD_POLICY",
        "WILDCARD_CAP",
        "TIE_BREAK",
    ];

    fn clear() {
        for name in VARS {
            unsafe { std::env::remove_var(name) };
        }
    }

    fn set(name: &str, value: &str) {
        unsafe { std::env::set_var(name, value) };
    }

    fn args(extra: &[&str]) -> Vec<String> {
        std::iter::once("battlejong_server")
            .chain(extra.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test_log::test]
    #[serial]
    fn defaults() {
        clear();

        let config = ServerConfig::from_env(&args(&[])).unwrap();

        assert_eq!(
            config,
            ServerConfig {
                bind_addr: "0.0.0.0".into(),
                ws_port: 8080,
                http_port: 80,
                static_dir: Some(PathBuf::from("../client/dist")),
                actix_workers: None,
                game: GameConfig::default(),
            }
        );
    }

    #[test_log::test]
    #[serial]
    fn port_argument_wins_over_env() {
        clear();
        set("WS_PORT", "9000");

        assert_eq!(ServerConfig::from_env(&args(&[])).unwrap().ws_port, 9000);
        assert_eq!(
            ServerConfig::from_env(&args(&["9100"])).unwrap().ws_port,
            9100
        );

        clear();
    }

    #[test_log::test]
    #[serial]
    fn invalid_port_argument_is_rejected() {
        clear();

        assert!(matches!(
            ServerConfig::from_env(&args(&["eighty"])),
            Err(ConfigError::InvalidPortArgument(x)) if x == "eighty"
        ));
    }

    #[test_log::test]
    #[serial]
    fn game_settings() {
        clear();
        set("MAX_PLAYERS", "2");
        set("WILDCARD_POLICY", "capped");
        set("WILDCARD_CAP", "6");
        set("TIE_BREAK", "first_player");

        let config = ServerConfig::from_env(&args(&[])).unwrap();

        assert_eq!(
            config.game,
            GameConfig {
                capacity: 2,
                wildcard_policy: WildcardPolicy::Capped { max: 6 },
                tie_break: TieBreak::FirstPlayer,
            }
        );

        clear();
    }

    #[test_log::test]
    #[serial]
    fn static_listener_can_be_disabled() {
        clear();
        set("SERVE_STATIC", "0");

        assert_eq!(ServerConfig::from_env(&args(&[])).unwrap().static_dir, None);

        clear();
    }

    #[test_log::test]
    #[serial]
    fn invalid_values_are_errors() {
        clear();
        set("WILDCARD_POLICY", "unlimited");
        assert!(matches!(
            ServerConfig::from_env(&args(&[])),
            Err(ConfigError::WildcardPolicy(_))
        ));

        clear();
        set("TIE_BREAK", "coin_flip");
        assert!(matches!(
            ServerConfig::from_env(&args(&[])),
            Err(ConfigError::TieBreak(_))
        ));

        clear();
        set("MAX_PLAYERS", "many");
        assert!(matches!(
            ServerConfig::from_env(&args(&[])),
            Err(ConfigError::InvalidNumber {
                name: "MAX_PLAYERS",
                ..
            })
        ));

        clear();
    }
}
