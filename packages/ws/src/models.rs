//! Wire messages.
//!
//! Every message is plain text with its fields joined by `_`, the command first:
//! `match_pid1_10`, `update_pid1_10`, `start_[[[0,101,...]]]`.

use std::{fmt, num::ParseIntError, str::FromStr};

use battlejong_board::Board;
use battlejong_session::PlayerId;
use strum_macros::{AsRefStr, EnumString, IntoStaticStr};
use thiserror::Error;

pub const DELIMITER: char = '_';

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum InboundMessageType {
    Match,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum OutboundMessageType {
    Connected,
    Start,
    Update,
    GameOver,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseMessageError {
    #[error("Empty message")]
    Empty,
    #[error("Missing field '{field}' in '{command}' message")]
    MissingField {
        command: &'static str,
        field: &'static str,
    },
    #[error("Unexpected trailing fields in '{command}' message: '{rest}'")]
    TrailingFields { command: &'static str, rest: String },
    #[error("Invalid points '{value}': {source}")]
    InvalidPoints {
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("Invalid score '{value}': {source}")]
    InvalidScore {
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("Invalid board: {0}")]
    InvalidBoard(String),
    #[error("Unknown message type '{0}'")]
    UnknownType(String),
}

/// A message sent by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// The player cleared a tile pair worth `points`.
    Match { player_id: PlayerId, points: i64 },
    /// The player hit a dead end or cleared the board.
    Done { player_id: PlayerId },
    /// Any command this server does not know. Ignored.
    Unknown { command: String },
}

impl InboundMessage {
    #[must_use]
    pub fn message_type(&self) -> Option<InboundMessageType> {
        match self {
            Self::Match { .. } => Some(InboundMessageType::Match),
            Self::Done { .. } => Some(InboundMessageType::Done),
            Self::Unknown { .. } => None,
        }
    }
}

struct Fields<'a> {
    command: &'static str,
    parts: std::str::Split<'a, char>,
}

impl<'a> Fields<'a> {
    fn required(&mut self, field: &'static str) -> Result<&'a str, ParseMessageError> {
        self.parts
            .next()
            .filter(|x| !x.is_empty())
            .ok_or(ParseMessageError::MissingField {
                command: self.command,
                field,
            })
    }

    fn finish(mut self) -> Result<(), ParseMessageError> {
        match self.parts.next() {
            None => Ok(()),
            Some(first) => {
                let rest = std::iter::once(first)
                    .chain(self.parts)
                    .collect::<Vec<_>>()
                    .join(&DELIMITER.to_string());
                Err(ParseMessageError::TrailingFields {
                    command: self.command,
                    rest,
                })
            }
        }
    }
}

impl FromStr for InboundMessage {
    type Err = ParseMessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseMessageError::Empty);
        }

        let mut parts = s.split(DELIMITER);
        let command = parts.next().unwrap_or_default();

        let Ok(message_type) = InboundMessageType::from_str(command) else {
            return Ok(Self::Unknown {
                command: command.to_string(),
            });
        };

        let mut fields = Fields {
            command: message_type.into(),
            parts,
        };

        let message = match message_type {
            InboundMessageType::Match => {
                let player_id = fields.required("playerId")?.into();
                let value = fields.required("points")?;
                let points =
                    value
                        .parse::<i64>()
                        .map_err(|source| ParseMessageError::InvalidPoints {
                            value: value.to_string(),
                            source,
                        })?;
                Self::Match { player_id, points }
            }
            InboundMessageType::Done => Self::Done {
                player_id: fields.required("playerId")?.into(),
            },
        };

        fields.finish()?;

        Ok(message)
    }
}

impl fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match { player_id, points } => write!(f, "match_{player_id}_{points}"),
            Self::Done { player_id } => write!(f, "done_{player_id}"),
            Self::Unknown { command } => f.write_str(command),
        }
    }
}

/// A message sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Sent to a new connection only.
    Connected { player_id: PlayerId },
    /// The shuffled board, as JSON, broadcast once two players are connected.
    Start { board: String },
    /// A player's new total score.
    Update { player_id: PlayerId, score: i64 },
    GameOver { winner: PlayerId },
}

impl OutboundMessage {
    /// # Errors
    ///
    /// * If the board fails to serialize
    pub fn start(board: &Board) -> Result<Self, serde_json::Error> {
        Ok(Self::Start {
            board: board.to_json()?,
        })
    }

    #[must_use]
    pub const fn message_type(&self) -> OutboundMessageType {
        match self {
            Self::Connected { .. } => OutboundMessageType::Connected,
            Self::Start { .. } => OutboundMessageType::Start,
            Self::Update { .. } => OutboundMessageType::Update,
            Self::GameOver { .. } => OutboundMessageType::GameOver,
        }
    }

    /// Decodes the board of a `start` message.
    ///
    /// # Errors
    ///
    /// * If this is not a `start` message
    /// * If the payload is not a board
    pub fn board(&self) -> Result<Board, ParseMessageError> {
        match self {
            Self::Start { board } => serde_json::from_str(board)
                .map_err(|e| ParseMessageError::InvalidBoard(e.to_string())),
            _ => Err(ParseMessageError::InvalidBoard(format!(
                "'{}' message has no board",
                self.message_type().as_ref()
            ))),
        }
    }
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message_type = self.message_type();
        let message_type = message_type.as_ref();

        match self {
            Self::Connected { player_id } => write!(f, "{message_type}_{player_id}"),
            Self::Start { board } => write!(f, "{message_type}_{board}"),
            Self::Update { player_id, score } => {
                write!(f, "{message_type}_{player_id}_{score}")
            }
            Self::GameOver { winner } => write!(f, "{message_type}_{winner}"),
        }
    }
}

impl FromStr for OutboundMessage {
    type Err = ParseMessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseMessageError::Empty);
        }

        let (command, rest) = s.split_once(DELIMITER).unwrap_or((s, ""));
        let message_type = OutboundMessageType::from_str(command)
            .map_err(|_| ParseMessageError::UnknownType(command.to_string()))?;
        let missing = |field: &'static str| ParseMessageError::MissingField {
            command: message_type.into(),
            field,
        };

        Ok(match message_type {
            OutboundMessageType::Connected if !rest.is_empty() => Self::Connected {
                player_id: rest.into(),
            },
            OutboundMessageType::Start if !rest.is_empty() => Self::Start {
                board: rest.to_string(),
            },
            OutboundMessageType::Update => {
                let (player_id, score) = rest
                    .rsplit_once(DELIMITER)
                    .filter(|(id, _)| !id.is_empty())
                    .ok_or_else(|| missing("score"))?;
                Self::Update {
                    player_id: player_id.into(),
                    score: score
                        .parse::<i64>()
                        .map_err(|source| ParseMessageError::InvalidScore {
                            value: score.to_string(),
                            source,
                        })?,
                }
            }
            OutboundMessageType::GameOver if !rest.is_empty() => Self::GameOver {
                winner: rest.into(),
            },
            OutboundMessageType::Connected | OutboundMessageType::GameOver => {
                return Err(missing("playerId"));
            }
            OutboundMessageType::Start => return Err(missing("board")),
        })
    }
}
