use std::collections::HashMap;
use std::time::Instant;

use uuid::Uuid;

use crate::domain::question::Choice;

/// The match engine's lifecycle.
/// `AbortedByDisconnect` is a label for "finalised early because both
/// players vanished" — the persisted `Match.status` still ends up
/// `Completed` either way; see `MatchEngine::finalise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Lobby,
    RoundActive,
    RoundReveal,
    Finalising,
    Completed,
    AbortedByDisconnect,
}

#[derive(Debug, Clone, Copy)]
pub struct PendingAnswer {
    pub choice: Choice,
    pub latency_seconds: f64,
}

/// Per-round scratch space. Reset at the top of every `begin_round`.
#[derive(Debug, Default)]
pub struct RoundScratch {
    pub answers: HashMap<Uuid, PendingAnswer>,
    pub started_at: Option<Instant>,
}

impl RoundScratch {
    pub fn reset(&mut self) {
        self.answers.clear();
        self.started_at = Some(Instant::now());
    }

    pub fn both_answered(&self) -> bool {
        self.answers.len() >= 2
    }
}
