use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};

/// Identifier handed to a player when it connects, e.g. `pid1700000000000`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub const PREFIX: &'static str = "pid";

    #[must_use]
    pub fn from_millis(millis: u128) -> Self {
        Self(format!("{}{millis}", Self::PREFIX))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for PlayerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Score and completion state of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub score: i64,
    /// Cleared once the player reports a dead end or a cleared board. Never set again.
    pub still_playing: bool,
}

impl Player {
    #[must_use]
    pub const fn new(id: PlayerId) -> Self {
        Self {
            id,
            score: 0,
            still_playing: true,
        }
    }
}

/// Who wins when the first two players finish with equal scores.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TieBreak {
    /// The player that registered second wins ties.
    #[default]
    SecondPlayer,
    FirstPlayer,
}
