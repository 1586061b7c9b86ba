pub mod messages;
pub mod queue;

use std::collections::HashSet;
use std::sync::Arc;

use actix::{Actor, ActorFutureExt, Context, Handler, WrapFuture};
use tracing::{info, warn};
use uuid::Uuid;

pub use messages::{Cancel, Enqueue, EnqueueOutcome, MatchFinished};
use queue::{Waiting, WaitQueue};

use crate::config::Settings;
use crate::engine::{EngineRegistry, MatchEngine};
use crate::error::MatchmakingError;
use crate::metrics::MetricsCtx;
use crate::persistence::{PersistenceGateway, QuestionRepository};
use crate::protocol::MatchmakingServerMessage;
use crate::session::Push;

/// The single mutex, made of a single-threaded actix actor instead of a
/// lock: every `Enqueue` runs to completion — including the async pairing
/// work — before the next mailbox message is handled, so two simultaneous
/// enqueues can never both observe an empty queue.
pub struct Matchmaker {
    queue: WaitQueue,
    in_progress: HashSet<Uuid>,
    persistence: PersistenceGateway,
    questions: QuestionRepository,
    engines: EngineRegistry,
    settings: Arc<Settings>,
    metrics: MetricsCtx,
}

impl Matchmaker {
    pub fn new(
        persistence: PersistenceGateway,
        questions: QuestionRepository,
        engines: EngineRegistry,
        settings: Arc<Settings>,
        metrics: MetricsCtx,
    ) -> Self {
        Self {
            queue: WaitQueue::new(),
            in_progress: HashSet::new(),
            persistence,
            questions,
            engines,
            settings,
            metrics,
        }
    }
}

impl Actor for Matchmaker {
    type Context = Context<Self>;
}

impl Handler<Enqueue> for Matchmaker {
    type Result = actix::ResponseActFuture<Self, Result<EnqueueOutcome, MatchmakingError>>;

    fn handle(&mut self, msg: Enqueue, ctx: &mut Self::Context) -> Self::Result {
        // Replace-on-duplicate: a reconnecting client's new socket simply
        // supersedes its old queue entry rather than being rejected as
        // `AlreadyQueued`. The superseded sink is closed, not just told to
        // stop waiting — it no longer has a queue entry at all.
        if let Some(stale) = self.queue.take_existing(msg.player_id) {
            stale.sink.do_send(Push(MatchmakingServerMessage::Error {
                code: crate::protocol::ErrorCode::Superseded,
                message: "replaced by a newer connection".to_string(),
            }));
            self.metrics.players_in_queue.dec();
        }

        if self.in_progress.contains(&msg.player_id) {
            return Box::pin(async move { Err(MatchmakingError::AlreadyInGame) }.into_actor(self));
        }

        if self.queue.is_empty() {
            msg.sink.do_send(Push(MatchmakingServerMessage::MatchmakingStart {
                message: "Waiting for an opponent".to_string(),
            }));
            self.queue.push_back(Waiting {
                player_id: msg.player_id,
                sink: msg.sink,
                enqueued_at: std::time::Instant::now(),
            });
            self.metrics.players_in_queue.inc();
            return Box::pin(async move { Ok(EnqueueOutcome::Waiting) }.into_actor(self));
        }

        let waiting = self.queue.pop_front().expect("checked non-empty above");
        self.metrics.players_in_queue.dec();
        self.metrics
            .match_wait_duration_seconds
            .observe(waiting.enqueued_at.elapsed().as_secs_f64());

        let player1 = waiting.player_id;
        let player2 = msg.player_id;
        let sink1 = waiting.sink;
        let sink2 = msg.sink;
        let self_addr = ctx.address();

        let persistence = self.persistence.clone();
        let questions = self.questions.clone();
        let total_rounds = self.settings.matchmaking.total_rounds;

        let fut = async move {
            let picked = questions.random(total_rounds, None).await?;
            let created = persistence
                .create_match_with_rounds(player1, player2, &picked)
                .await
                .map_err(|_| crate::error::PairingError::PersistenceFailed)?;
            Ok::<_, crate::error::PairingError>((created, picked))
        };

        Box::pin(fut.into_actor(self).map(move |res, act, _ctx| {
            let created = match res {
                Ok((created, picked)) => {
                    let engine = MatchEngine::new(
                        created.id,
                        player1,
                        player2,
                        picked,
                        act.persistence.clone(),
                        self_addr,
                        act.engines.clone(),
                        act.settings.clone(),
                        act.metrics.clone(),
                    );
                    let addr = engine.start();
                    act.engines.insert(created.id, addr);
                    act.in_progress.insert(player1);
                    act.in_progress.insert(player2);

                    let outcome = MatchmakingServerMessage::MatchFound {
                        r#match: crate::protocol::MatchFoundPayload {
                            id: created.id,
                            player1,
                            player2,
                            total_rounds: created.total_rounds,
                        },
                    };
                    sink1.do_send(Push(outcome.clone()));
                    sink2.do_send(Push(outcome));
                    created
                }
                Err(e) => {
                    warn!("pairing failed for {} / {}: {}", player1, player2, e);
                    let failure = MatchmakingServerMessage::PairingFailed {
                        reason: e.to_string(),
                    };
                    sink1.do_send(Push(failure.clone()));
                    sink2.do_send(Push(failure));
                    return Err(MatchmakingError::PairingFailed(e.to_string()));
                }
            };

            Ok(EnqueueOutcome::Paired {
                match_id: created.id,
                player1,
                player2,
                total_rounds: created.total_rounds,
            })
        }))
    }
}

impl Handler<Cancel> for Matchmaker {
    type Result = ();

    fn handle(&mut self, msg: Cancel, _ctx: &mut Self::Context) -> Self::Result {
        if let Some(_stale) = self.queue.take_existing(msg.player_id) {
            self.metrics.players_in_queue.dec();
            info!(player_id = %msg.player_id, "removed from matchmaking queue");
        }
    }
}

impl Handler<MatchFinished> for Matchmaker {
    type Result = ();

    fn handle(&mut self, msg: MatchFinished, _ctx: &mut Self::Context) -> Self::Result {
        self.in_progress.remove(&msg.player1);
        self.in_progress.remove(&msg.player2);
    }
}
