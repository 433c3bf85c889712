//! Time-derived player identifiers.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::PlayerId;

/// Source of wall-clock milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u128;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |x| x.as_millis())
    }
}

/// Hands out `pid<millis>` identifiers that are strictly increasing for the life of the
/// generator, even when two players connect within the same millisecond or the clock steps
/// backwards.
pub struct IdGenerator {
    clock: Box<dyn Clock>,
    last: Option<u128>,
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdGenerator")
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl IdGenerator {
    #[must_use]
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            last: None,
        }
    }

    pub fn next_id(&mut self) -> PlayerId {
        let now = self.clock.now_millis();
        let millis = match self.last {
            Some(last) if now <= last => {
                log::debug!("next_id: clock did not advance (now={now} last={last})");
                last + 1
            }
            _ => now,
        };

        self.last = Some(millis);

        PlayerId::from_millis(millis)
    }
}
