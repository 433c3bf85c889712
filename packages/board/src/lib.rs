#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! BattleJong board template and shuffling.
//!
//! A [`Board`] is five layers of 9x15 cells. Shuffled boards hold `0` for cells without a
//! tile and a tile type in `101..=142` everywhere else; `101` is the wildcard. Boards
//! serialize as plain nested integer arrays, which is the payload of the `start` message.

use serde::{Deserialize, Serialize};

pub mod layout;
pub mod shuffle;

pub use shuffle::{WildcardPolicy, shuffle, shuffle_with};

use layout::{COLUMNS, LAYERS, ROWS};

/// Value of a cell without a tile.
pub const EMPTY: u16 = 0;

/// Number of distinct tile types.
pub const TILE_TYPE_COUNT: u16 = 42;

/// First tile type. Tile types map to client assets `tile101` through `tile142`.
pub const FIRST_TILE_TYPE: u16 = 101;

pub const LAST_TILE_TYPE: u16 = FIRST_TILE_TYPE + TILE_TYPE_COUNT - 1;

/// The tile type that matches any other tile.
pub const WILDCARD: u16 = FIRST_TILE_TYPE;

pub type Cells = [[[u16; COLUMNS]; ROWS]; LAYERS];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: Cells,
}

impl Board {
    /// A board with every cell empty.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            cells: [[[EMPTY; COLUMNS]; ROWS]; LAYERS],
        }
    }

    #[must_use]
    pub const fn cells(&self) -> &Cells {
        &self.cells
    }

    #[must_use]
    pub const fn get(&self, layer: usize, row: usize, column: usize) -> u16 {
        self.cells[layer][row][column]
    }

    pub(crate) const fn set(&mut self, layer: usize, row: usize, column: usize, value: u16) {
        self.cells[layer][row][column] = value;
    }

    /// Iterates every cell as `(layer, row, column, value)`.
    pub fn tiles(&self) -> impl Iterator<Item = (usize, usize, usize, u16)> + '_ {
        self.cells.iter().enumerate().flat_map(|(l, layer)| {
            layer.iter().enumerate().flat_map(move |(r, row)| {
                row.iter()
                    .enumerate()
                    .map(move |(c, value)| (l, r, c, *value))
            })
        })
    }

    /// Number of cells holding a tile.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.tiles().filter(|(.., value)| *value != EMPTY).count()
    }

    #[must_use]
    pub fn wildcard_count(&self) -> usize {
        self.tiles().filter(|(.., value)| *value == WILDCARD).count()
    }

    /// Serializes the board as nested arrays of integers.
    ///
    /// # Errors
    ///
    /// * If the board fails to serialize
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}
