use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use actix::Addr;
use uuid::Uuid;

use crate::engine::MatchEngine;

/// Registry-of-handles, not registry-of-state: the only shared
/// thing here is an actor address. All the mutable match state (round,
/// answers, sinks) lives inside the `MatchEngine` actor it points to.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    inner: Arc<Mutex<HashMap<Uuid, Addr<MatchEngine>>>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, match_id: Uuid, addr: Addr<MatchEngine>) {
        self.inner.lock().unwrap().insert(match_id, addr);
    }

    pub fn get(&self, match_id: Uuid) -> Option<Addr<MatchEngine>> {
        self.inner.lock().unwrap().get(&match_id).cloned()
    }

    pub fn remove(&self, match_id: Uuid) {
        self.inner.lock().unwrap().remove(&match_id);
    }
}
