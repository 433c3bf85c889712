#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory registry of BattleJong players.
//!
//! The registry is the only owner of player state. It is meant to be held by a single
//! writer (the websocket command loop) and is therefore not synchronized.
//!
//! Entries are never removed. Growth is bounded by an explicit capacity instead.

use std::collections::BTreeMap;

use thiserror::Error;

pub mod id;
pub mod models;

pub use id::{Clock, IdGenerator, SystemClock};
pub use models::{Player, PlayerId, TieBreak};

/// Default number of players a registry accepts over its lifetime.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Number of players a game is played between.
pub const PLAYERS_PER_GAME: usize = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Player {0} not found")]
    NotFound(PlayerId),
    #[error("Registry is full ({capacity} players)")]
    Full { capacity: usize },
    #[error("Score overflow for player {0}")]
    ScoreOverflow(PlayerId),
}

#[derive(Debug)]
pub struct SessionRegistry {
    players: BTreeMap<PlayerId, Player>,
    /// Ids in registration order.
    order: Vec<PlayerId>,
    capacity: usize,
    ids: IdGenerator,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SessionRegistry {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_id_generator(capacity, IdGenerator::default())
    }

    #[must_use]
    pub const fn with_id_generator(capacity: usize, ids: IdGenerator) -> Self {
        Self {
            players: BTreeMap::new(),
            order: vec![],
            capacity,
            ids,
        }
    }

    /// Creates a player with a zero score that is still playing.
    ///
    /// # Errors
    ///
    /// * If the registry has reached its capacity
    pub fn register(&mut self) -> Result<PlayerId, RegistryError> {
        if self.order.len() >= self.capacity {
            log::error!("register: registry is full capacity={}", self.capacity);
            return Err(RegistryError::Full {
                capacity: self.capacity,
            });
        }

        let id = self.ids.next_id();

        self.players.insert(id.clone(), Player::new(id.clone()));
        self.order.push(id.clone());

        log::debug!("register: id={id} players={}", self.order.len());

        if self.order.len() > PLAYERS_PER_GAME {
            log::warn!(
                "register: {} players registered, only the first {PLAYERS_PER_GAME} take part in the game",
                self.order.len()
            );
        }

        Ok(id)
    }

    /// Adds `points` to the player's score and returns the new total.
    ///
    /// # Errors
    ///
    /// * If no player with `id` is registered
    /// * If the score would overflow
    pub fn record_match(&mut self, id: &PlayerId, points: i64) -> Result<i64, RegistryError> {
        let player = self.get_mut(id)?;

        player.score = player
            .score
            .checked_add(points)
            .ok_or_else(|| RegistryError::ScoreOverflow(id.clone()))?;

        log::debug!("record_match: id={id} points={points} score={}", player.score);

        Ok(player.score)
    }

    /// Marks the player as no longer playing. Returns whether the flag changed, so a repeated
    /// report is a no-op.
    ///
    /// # Errors
    ///
    /// * If no player with `id` is registered
    pub fn record_done(&mut self, id: &PlayerId) -> Result<bool, RegistryError> {
        let player = self.get_mut(id)?;
        let changed = player.still_playing;

        player.still_playing = false;

        log::debug!("record_done: id={id} changed={changed}");

        Ok(changed)
    }

    #[must_use]
    pub fn count_done(&self) -> usize {
        self.players.values().filter(|x| !x.still_playing).count()
    }

    /// Ids in registration order.
    #[must_use]
    pub fn all_ids(&self) -> &[PlayerId] {
        &self.order
    }

    #[must_use]
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    /// Compares the first two registered players. A strictly higher score wins; equal
    /// scores are settled by `tie_break`.
    #[must_use]
    pub fn winner(&self, tie_break: TieBreak) -> Option<&PlayerId> {
        let [first, second, ..] = self.order.as_slice() else {
            return None;
        };

        let first_score = self.players.get(first)?.score;
        let second_score = self.players.get(second)?.score;

        Some(if first_score > second_score {
            first
        } else if first_score < second_score {
            second
        } else {
            match tie_break {
                TieBreak::SecondPlayer => second,
                TieBreak::FirstPlayer => first,
            }
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn get_mut(&mut self, id: &PlayerId) -> Result<&mut Player, RegistryError> {
        self.players
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }
}
