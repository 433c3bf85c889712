//! Randomized dealing of tile types onto the template.
//!
//! Every slot gets a type drawn uniformly from the palette. No attempt is made to keep the
//! board clearable; some deals have no path to an empty board.

use std::str::FromStr;

use rand::Rng;
use strum_macros::{AsRefStr, EnumString};
use thiserror::Error;

use crate::{
    Board, FIRST_TILE_TYPE, TILE_TYPE_COUNT, WILDCARD,
    layout::{COLUMNS, LAYERS, LAYOUT, ROWS, SLOT_CELL},
};

/// Default wildcard limit of [`WildcardPolicy::Capped`].
pub const DEFAULT_WILDCARD_CAP: usize = 4;

/// Value a suppressed wildcard draw is bumped to.
pub const WILDCARD_REPLACEMENT: u16 = WILDCARD + 1;

/// Threshold the legacy counter is compared against.
const LEGACY_WILDCARD_THRESHOLD: u32 = 3;

/// How wildcard draws are limited while dealing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WildcardPolicy {
    /// The historical BattleJong counter. It is bumped by adding itself to itself on every
    /// admitted slot and compared against 3 before a wildcard is placed. Starting from 0 it
    /// never moves, so no wildcard is ever suppressed.
    #[default]
    Legacy,
    /// Counts placed wildcards one at a time. Once `max` are on the board any further
    /// wildcard draw becomes [`WILDCARD_REPLACEMENT`].
    Capped { max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum WildcardPolicyKind {
    Legacy,
    Capped,
}

#[derive(Debug, Error)]
pub enum ParseWildcardPolicyError {
    #[error("Invalid wildcard policy '{0}' (expected 'legacy' or 'capped')")]
    InvalidKind(String),
}

impl WildcardPolicy {
    /// Builds a policy from its configured name and the cap used by
    /// [`WildcardPolicy::Capped`].
    ///
    /// # Errors
    ///
    /// * If `kind` is not a known policy name
    pub fn from_config(kind: &str, cap: usize) -> Result<Self, ParseWildcardPolicyError> {
        let kind = WildcardPolicyKind::from_str(kind.trim())
            .map_err(|_| ParseWildcardPolicyError::InvalidKind(kind.to_string()))?;

        Ok(match kind {
            WildcardPolicyKind::Legacy => Self::Legacy,
            WildcardPolicyKind::Capped => Self::Capped { max: cap },
        })
    }

    #[must_use]
    pub const fn kind(&self) -> WildcardPolicyKind {
        match self {
            Self::Legacy => WildcardPolicyKind::Legacy,
            Self::Capped { .. } => WildcardPolicyKind::Capped,
        }
    }

    const fn gate(self) -> WildcardGate {
        match self {
            Self::Legacy => WildcardGate::Legacy { counter: 0 },
            Self::Capped { max } => WildcardGate::Capped { max, placed: 0 },
        }
    }
}

enum WildcardGate {
    Legacy { counter: u32 },
    Capped { max: usize, placed: usize },
}

impl WildcardGate {
    fn admit(&mut self, drawn: u16) -> u16 {
        match self {
            Self::Legacy { counter } => {
                if drawn == WILDCARD && *counter == LEGACY_WILDCARD_THRESHOLD {
                    WILDCARD_REPLACEMENT
                } else {
                    *counter = counter.saturating_add(*counter);
                    drawn
                }
            }
            Self::Capped { max, placed } => {
                if drawn != WILDCARD {
                    drawn
                } else if *placed >= *max {
                    WILDCARD_REPLACEMENT
                } else {
                    *placed += 1;
                    drawn
                }
            }
        }
    }
}

/// Deals a fresh board from the template using `rng`.
pub fn shuffle_with<R: Rng + ?Sized>(rng: &mut R, policy: WildcardPolicy) -> Board {
    let mut gate = policy.gate();
    let mut board = Board::empty();

    for layer in 0..LAYERS {
        for row in 0..ROWS {
            for column in 0..COLUMNS {
                if LAYOUT[layer][row][column] == SLOT_CELL {
                    let drawn = FIRST_TILE_TYPE + rng.random_range(0..TILE_TYPE_COUNT);
                    board.set(layer, row, column, gate.admit(drawn));
                }
            }
        }
    }

    log::trace!(
        "shuffle_with: policy={policy:?} wildcards={}",
        board.wildcard_count()
    );

    board
}

/// Deals a fresh board using the thread-local generator.
#[must_use]
pub fn shuffle(policy: WildcardPolicy) -> Board {
    shuffle_with(&mut rand::rng(), policy)
}
