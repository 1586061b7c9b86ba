use actix::{Message, Recipient};
use uuid::Uuid;

use crate::domain::question::Choice;
use crate::error::SessionError;
use crate::protocol::GameServerMessage;
use crate::session::Push;

pub type GameSink = Recipient<Push<GameServerMessage>>;

/// Sent once by a `GameSession` right after the websocket upgrade completes,
/// attaching (or re-attaching, on reconnect) the sink the engine should push
/// frames through for `player_id`.
#[derive(Message)]
#[rtype(result = "Result<(), SessionError>")]
pub struct JoinSession {
    pub player_id: Uuid,
    pub sink: GameSink,
}

/// Sent by a `GameSession`'s `stopping()` hook, whether the client closed
/// cleanly or the connection simply dropped — the engine treats both the
/// same way and doesn't need to distinguish them.
#[derive(Message)]
#[rtype(result = "()")]
pub struct PlayerDisconnected {
    pub player_id: Uuid,
}

/// `{"action":"ready"}`. Accepted at any time but only meaningful in
/// `Lobby` — both sessions attaching already drives the Lobby -> RoundActive
/// transition, so this is bookkeeping, not a gate.
#[derive(Message)]
#[rtype(result = "()")]
pub struct ClientReady {
    pub player_id: Uuid,
}

#[derive(Message)]
#[rtype(result = "Result<(), SessionError>")]
pub struct SubmitAnswer {
    pub player_id: Uuid,
    pub choice: Choice,
    pub client_latency_seconds: f64,
}

#[derive(Message)]
#[rtype(result = "Result<(), SessionError>")]
pub struct SendEmoji {
    pub player_id: Uuid,
    pub emoji: String,
}
