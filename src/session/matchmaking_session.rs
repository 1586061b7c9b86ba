use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, Addr, AsyncContext, Handler, Running, StreamHandler, WrapFuture};
use actix_web_actors::ws;
use uuid::Uuid;

use crate::matchmaker::{Cancel, Enqueue, Matchmaker};
use crate::persistence::PersistenceGateway;
use crate::protocol::{MatchmakingClientMessage, MatchmakingServerMessage};
use crate::session::Push;

/// One per open websocket, forwarding frames between the client and the
/// single `Matchmaker` actor.
/// Disconnection (clean or not) and an explicit `{"action":"cancel"}` are
/// the same operation from the matchmaker's point of view.
pub struct MatchmakingSession {
    player_id: Uuid,
    matchmaker: Addr<Matchmaker>,
    persistence: PersistenceGateway,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
    hb: Instant,
}

impl MatchmakingSession {
    pub fn new(
        player_id: Uuid,
        matchmaker: Addr<Matchmaker>,
        persistence: PersistenceGateway,
        heartbeat_interval: Duration,
        heartbeat_timeout: Duration,
    ) -> Self {
        Self {
            player_id,
            matchmaker,
            persistence,
            heartbeat_interval,
            heartbeat_timeout,
            hb: Instant::now(),
        }
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let timeout = self.heartbeat_timeout;
        ctx.run_interval(self.heartbeat_interval, move |act, ctx| {
            if Instant::now().duration_since(act.hb) > timeout {
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for MatchmakingSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.start_heartbeat(ctx);

        let persistence = self.persistence.clone();
        let player_id = self.player_id;
        ctx.spawn(
            async move {
                let _ = persistence.set_online(player_id, true).await;
            }
            .into_actor(self),
        );

        let sink = ctx.address().recipient();
        self.matchmaker.do_send(Enqueue {
            player_id: self.player_id,
            sink,
        });
    }

    fn stopping(&mut self, _ctx: &mut Self::Context) -> Running {
        self.matchmaker.do_send(Cancel {
            player_id: self.player_id,
        });

        let persistence = self.persistence.clone();
        let player_id = self.player_id;
        actix::spawn(async move {
            let _ = persistence.set_online(player_id, false).await;
        });

        Running::Stop
    }
}

impl Handler<Push<MatchmakingServerMessage>> for MatchmakingSession {
    type Result = ();

    fn handle(&mut self, msg: Push<MatchmakingServerMessage>, ctx: &mut Self::Context) {
        let is_terminal = matches!(
            msg.0,
            MatchmakingServerMessage::MatchFound { .. }
                | MatchmakingServerMessage::PairingFailed { .. }
                | MatchmakingServerMessage::Error { .. }
        );
        if let Ok(json) = serde_json::to_string(&msg.0) {
            ctx.text(json);
        }
        if is_terminal {
            ctx.stop();
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for MatchmakingSession {
    fn handle(&mut self, item: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let msg = match item {
            Ok(msg) => msg,
            Err(_) => {
                ctx.stop();
                return;
            }
        };

        match msg {
            ws::Message::Ping(bytes) => {
                self.hb = Instant::now();
                ctx.pong(&bytes);
            }
            ws::Message::Pong(_) => {
                self.hb = Instant::now();
            }
            ws::Message::Text(text) => {
                self.hb = Instant::now();
                match serde_json::from_str::<MatchmakingClientMessage>(&text) {
                    Ok(MatchmakingClientMessage::Cancel) => {
                        self.matchmaker.do_send(Cancel {
                            player_id: self.player_id,
                        });
                    }
                    Err(_) => { /* malformed frame: ignored */ }
                }
            }
            ws::Message::Close(reason) => {
                ctx.close(reason);
                ctx.stop();
            }
            _ => {}
        }
    }
}
