use actix::{Message, Recipient};
use uuid::Uuid;

use crate::protocol::MatchmakingServerMessage;
use crate::session::Push;

pub type MatchmakingSink = Recipient<Push<MatchmakingServerMessage>>;

#[derive(Message)]
#[rtype(result = "Result<EnqueueOutcome, crate::error::MatchmakingError>")]
pub struct Enqueue {
    pub player_id: Uuid,
    pub sink: MatchmakingSink,
}

#[derive(Debug, Clone)]
pub enum EnqueueOutcome {
    Waiting,
    Paired {
        match_id: Uuid,
        player1: Uuid,
        player2: Uuid,
        total_rounds: i32,
    },
}

/// Sent by `Enqueue`'s caller-side session on an explicit `{action:"cancel"}`
/// and also by the session's `stopping()` hook on disconnect — an explicit
/// cancel and a dropped connection are the same operation from the queue's
/// point of view.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Cancel {
    pub player_id: Uuid,
}

/// Sent by a `MatchEngine` once a match it owns reaches `Completed` or
/// `AbortedByDisconnect`, so the matchmaker can drop its `AlreadyInGame`
/// bookkeeping for both participants.
#[derive(Message)]
#[rtype(result = "()")]
pub struct MatchFinished {
    pub player1: Uuid,
    pub player2: Uuid,
}
