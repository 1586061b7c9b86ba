use std::time::{Duration, Instant};

use actix::{
    Actor, ActorContext, ActorFutureExt, Addr, AsyncContext, Handler, Running, StreamHandler,
    WrapFuture,
};
use actix_web_actors::ws;
use uuid::Uuid;

use crate::engine::{ClientReady, EngineRegistry, JoinSession, MatchEngine, PlayerDisconnected, SendEmoji, SubmitAnswer};
use crate::persistence::PersistenceGateway;
use crate::protocol::{ErrorCode, GameClientMessage, GameServerMessage};
use crate::session::Push;

/// One per open websocket against a specific match. Unlike
/// `MatchmakingSession`, this actor's lifetime is scoped to a single match
/// id and it resolves its `MatchEngine` address once, from the shared
/// `EngineRegistry`, at connect time.
pub struct GameSession {
    player_id: Uuid,
    match_id: Uuid,
    registry: EngineRegistry,
    persistence: PersistenceGateway,
    engine: Option<Addr<MatchEngine>>,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
    hb: Instant,
}

impl GameSession {
    pub fn new(
        player_id: Uuid,
        match_id: Uuid,
        registry: EngineRegistry,
        persistence: PersistenceGateway,
        heartbeat_interval: Duration,
        heartbeat_timeout: Duration,
    ) -> Self {
        Self {
            player_id,
            match_id,
            registry,
            persistence,
            engine: None,
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

    fn reject(ctx: &mut ws::WebsocketContext<Self>, code: ErrorCode, message: &str) {
        if let Ok(json) = serde_json::to_string(&GameServerMessage::Error {
            code,
            message: message.to_string(),
        }) {
            ctx.text(json);
        }
        ctx.stop();
    }
}

impl Actor for GameSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.start_heartbeat(ctx);

        let persistence = self.persistence.clone();
        let match_id = self.match_id;
        let player_id = self.player_id;
        let registry = self.registry.clone();
        let sink = ctx.address().recipient();

        let fut = async move {
            let is_participant = persistence
                .verify_player_in_match(match_id, player_id)
                .await
                .unwrap_or(false);
            if !is_participant {
                return Err("this player is not part of this match");
            }
            let engine = registry.get(match_id).ok_or("match is no longer active")?;
            engine
                .send(JoinSession { player_id, sink })
                .await
                .map_err(|_| "match engine is unreachable")?
                .map_err(|_| "this player is not part of this match")?;
            Ok(engine)
        };

        ctx.spawn(fut.into_actor(self).map(|res, act, ctx| match res {
            Ok(engine) => act.engine = Some(engine),
            Err(msg) => Self::reject(ctx, ErrorCode::NotAParticipant, msg),
        }));
    }

    fn stopping(&mut self, _ctx: &mut Self::Context) -> Running {
        if let Some(engine) = &self.engine {
            engine.do_send(PlayerDisconnected {
                player_id: self.player_id,
            });
        }
        Running::Stop
    }
}

impl Handler<Push<GameServerMessage>> for GameSession {
    type Result = ();

    fn handle(&mut self, msg: Push<GameServerMessage>, ctx: &mut Self::Context) {
        let is_terminal = matches!(
            msg.0,
            GameServerMessage::MatchEnd { .. } | GameServerMessage::Error { .. }
        );
        if let Ok(json) = serde_json::to_string(&msg.0) {
            ctx.text(json);
        }
        if is_terminal {
            ctx.stop();
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for GameSession {
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
                let Some(engine) = self.engine.clone() else {
                    return;
                };
                match serde_json::from_str::<GameClientMessage>(&text) {
                    Ok(GameClientMessage::Ready) => {
                        engine.do_send(ClientReady {
                            player_id: self.player_id,
                        });
                    }
                    Ok(GameClientMessage::Answer { answer, time }) => {
                        engine.do_send(SubmitAnswer {
                            player_id: self.player_id,
                            choice: answer,
                            client_latency_seconds: time,
                        });
                    }
                    Ok(GameClientMessage::Emoji { emoji }) => {
                        engine.do_send(SendEmoji {
                            player_id: self.player_id,
                            emoji,
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
