pub mod game_session;
pub mod matchmaking_session;

use actix::Message;

/// Generic outbound-frame envelope: wraps a `serde`-tagged server message so
/// it can be delivered through an `actix::Recipient<Push<T>>` held by a
/// matchmaker or match engine that does not otherwise depend on the
/// websocket session type. The session's `Handler<Push<T>>` just serialises
/// `0` and writes it to the socket.
pub struct Push<T>(pub T);

impl<T: 'static> Message for Push<T> {
    type Result = ();
}

pub use game_session::GameSession;
pub use matchmaking_session::MatchmakingSession;
