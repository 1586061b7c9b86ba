use std::collections::VecDeque;
use std::time::Instant;

use uuid::Uuid;

use crate::matchmaker::messages::MatchmakingSink;

pub struct Waiting {
    pub player_id: Uuid,
    pub sink: MatchmakingSink,
    pub enqueued_at: Instant,
}

/// Strictly FIFO-by-enqueue-time queue of waiting players. A single
/// `Matchmaker` actor is the only owner of this structure, so every
/// operation here runs to completion before the next message in the
/// actor's mailbox is handled — that serialisation is what gives the
/// "observable as one atomic step" guarantee matchmaking needs.
#[derive(Default)]
pub struct WaitQueue {
    entries: VecDeque<Waiting>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes any existing entry for `player_id` (a stale connection),
    /// returning it so the caller can notify its sink that it was
    /// superseded: a reconnecting client should supersede, not duplicate,
    /// its prior spot in line.
    pub fn take_existing(&mut self, player_id: Uuid) -> Option<Waiting> {
        let pos = self.entries.iter().position(|w| w.player_id == player_id)?;
        self.entries.remove(pos)
    }

    pub fn front_player(&self) -> Option<Uuid> {
        self.entries.front().map(|w| w.player_id)
    }

    pub fn pop_front(&mut self) -> Option<Waiting> {
        self.entries.pop_front()
    }

    pub fn push_back(&mut self, entry: Waiting) {
        self.entries.push_back(entry);
    }
}
