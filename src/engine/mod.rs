pub mod messages;
pub mod registry;
pub mod state;

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use actix::{Actor, ActorFutureExt, Addr, AsyncContext, Context, Handler, WrapFuture};
use uuid::Uuid;

pub use messages::{ClientReady, GameSink, JoinSession, PlayerDisconnected, SendEmoji, SubmitAnswer};
pub use registry::EngineRegistry;
use state::{EngineState, PendingAnswer, RoundScratch};

use crate::config::Settings;
use crate::domain::Question;
use crate::error::{PersistenceError, SessionError};
use crate::matchmaker::messages::MatchFinished;
use crate::matchmaker::Matchmaker;
use crate::metrics::MetricsCtx;
use crate::persistence::retry::with_retry;
use crate::persistence::PersistenceGateway;
use crate::policy::rating::{apply_rating, Outcome};
use crate::policy::scoring::score_answer;
use crate::protocol::{
    ErrorCode, GameServerMessage, MatchEndPayload, MatchEndPlayerSummary, PlayerRoundResult,
    QuestionPayload, RoundEndPayload, RoundReview,
};
use crate::session::Push;

/// Owns every piece of mutable state for exactly one match: the round
/// machine, both players' sinks, and the scores that are only committed to
/// storage at round boundaries. One actor per match; the
/// `EngineRegistry` only ever hands out its address.
pub struct MatchEngine {
    match_id: Uuid,
    player1: Uuid,
    player2: Uuid,
    questions: Vec<Question>,
    state: EngineState,
    current_round: i32,
    scratch: RoundScratch,
    sinks: HashMap<Uuid, Option<GameSink>>,
    players_ready: HashSet<Uuid>,
    emoji_counts: HashMap<Uuid, u32>,
    score1: i32,
    score2: i32,
    persistence: PersistenceGateway,
    matchmaker: Addr<Matchmaker>,
    registry: EngineRegistry,
    settings: Arc<Settings>,
    metrics: MetricsCtx,
}

impl MatchEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        match_id: Uuid,
        player1: Uuid,
        player2: Uuid,
        questions: Vec<Question>,
        persistence: PersistenceGateway,
        matchmaker: Addr<Matchmaker>,
        registry: EngineRegistry,
        settings: Arc<Settings>,
        metrics: MetricsCtx,
    ) -> Self {
        let mut sinks = HashMap::new();
        sinks.insert(player1, None);
        sinks.insert(player2, None);

        Self {
            match_id,
            player1,
            player2,
            questions,
            state: EngineState::Lobby,
            current_round: 0,
            scratch: RoundScratch::default(),
            sinks,
            players_ready: HashSet::new(),
            emoji_counts: HashMap::new(),
            score1: 0,
            score2: 0,
            persistence,
            matchmaker,
            registry,
            settings,
            metrics,
        }
    }

    fn total_rounds(&self) -> i32 {
        self.questions.len() as i32
    }

    fn opponent_of(&self, player_id: Uuid) -> Uuid {
        if player_id == self.player1 {
            self.player2
        } else {
            self.player1
        }
    }

    fn push(&self, player_id: Uuid, msg: GameServerMessage) {
        if let Some(Some(sink)) = self.sinks.get(&player_id) {
            sink.do_send(Push(msg));
        }
    }

    fn broadcast(&self, msg: GameServerMessage) {
        self.push(self.player1, msg.clone());
        self.push(self.player2, msg);
    }

    fn begin_round(&mut self, round_number: i32, ctx: &mut Context<Self>) {
        if matches!(self.state, EngineState::Completed | EngineState::AbortedByDisconnect) {
            return;
        }
        self.current_round = round_number;
        self.state = EngineState::RoundActive;
        self.scratch.reset();

        let question = &self.questions[(round_number - 1) as usize];
        let payload = QuestionPayload {
            id: question.id,
            text: question.prompt.clone(),
            options: HashMap::from([
                ("A".to_string(), question.option_a.clone()),
                ("B".to_string(), question.option_b.clone()),
                ("C".to_string(), question.option_c.clone()),
                ("D".to_string(), question.option_d.clone()),
            ]),
            category: question.category_name.clone(),
        };
        self.broadcast(GameServerMessage::QuestionStart {
            round: round_number,
            question: payload,
        });

        let persistence = self.persistence.clone();
        let match_id = self.match_id;
        ctx.spawn(
            async move { persistence.update_match_current_round(match_id, round_number).await }
                .into_actor(self)
                .map(|res, _act, _ctx| {
                    if let Err(e) = res {
                        tracing::warn!("failed to persist current_round: {}", e);
                    }
                }),
        );

        let timeout = self.settings.matchmaking.round_timeout_seconds;
        ctx.run_later(Duration::from_secs(timeout), move |act, ctx| {
            act.on_round_deadline(round_number, ctx);
        });
    }

    /// Fires unconditionally `round_timeout_seconds` after `begin_round`;
    /// the round-number check is what makes this safe to cancel without an
    /// explicit timer handle — if the round already ended, this is a no-op.
    fn on_round_deadline(&mut self, round_number: i32, ctx: &mut Context<Self>) {
        if self.current_round != round_number || self.state != EngineState::RoundActive {
            return;
        }
        self.metrics.round_timeouts_total.inc();
        self.end_round(ctx);
    }

    fn end_round(&mut self, ctx: &mut Context<Self>) {
        self.state = EngineState::RoundReveal;
        let round_number = self.current_round;
        let question = self.questions[(round_number - 1) as usize].clone();
        let deadline_latency = self.settings.matchmaking.round_timeout_seconds as f64;

        let p1 = self.scratch.answers.get(&self.player1).copied();
        let p2 = self.scratch.answers.get(&self.player2).copied();

        let p1_answer = p1.map(|a: PendingAnswer| a.choice);
        let p2_answer = p2.map(|a: PendingAnswer| a.choice);
        let p1_latency = p1.map(|a| a.latency_seconds).unwrap_or(deadline_latency);
        let p2_latency = p2.map(|a| a.latency_seconds).unwrap_or(deadline_latency);
        let p1_correct = p1_answer.map(|c| question.is_correct(c)).unwrap_or(false);
        let p2_correct = p2_answer.map(|c| question.is_correct(c)).unwrap_or(false);
        let p1_score = score_answer(p1_correct, p1_latency);
        let p2_score = score_answer(p2_correct, p2_latency);

        self.score1 += p1_score;
        self.score2 += p2_score;

        let result_payload = RoundEndPayload {
            correct_answer: question.correct_option,
            explanation: question.explanation.clone(),
            players: HashMap::from([
                (
                    self.player1,
                    PlayerRoundResult {
                        answer: p1_answer,
                        time: p1_latency,
                        score: p1_score,
                        correct: p1_correct,
                    },
                ),
                (
                    self.player2,
                    PlayerRoundResult {
                        answer: p2_answer,
                        time: p2_latency,
                        score: p2_score,
                        correct: p2_correct,
                    },
                ),
            ]),
            total_scores: HashMap::from([(self.player1, self.score1), (self.player2, self.score2)]),
        };
        self.broadcast(GameServerMessage::RoundEnd {
            round: round_number,
            result: result_payload,
        });

        let persistence = self.persistence.clone();
        let settings = self.settings.clone();
        let metrics = self.metrics.clone();
        let match_id = self.match_id;
        let total_rounds = self.total_rounds();

        ctx.spawn(
            async move {
                with_retry(&settings.retry, &metrics, || {
                    let persistence = persistence.clone();
                    async move {
                        persistence
                            .record_round_result(
                                match_id, round_number, p1_answer, p1_latency, p1_score,
                                p2_answer, p2_latency, p2_score,
                            )
                            .await
                    }
                })
                .await
            }
            .into_actor(self)
            .map(move |res, act, ctx| {
                if let Err(e) = res {
                    tracing::error!("round result persistence failed permanently: {}", e);
                }
                if round_number < total_rounds {
                    let inter = act.settings.matchmaking.inter_round_seconds;
                    ctx.run_later(Duration::from_secs(inter), move |act, ctx| {
                        act.begin_round(round_number + 1, ctx);
                    });
                } else {
                    let pre = act.settings.matchmaking.pre_finalise_seconds;
                    ctx.run_later(Duration::from_secs(pre), |act, ctx| {
                        act.finalise(ctx);
                    });
                }
            }),
        );
    }

    /// Decides a winner from the accumulated scores, applies the rating
    /// policy, and commits. On a fatal persistence failure this still
    /// completes the match from the clients' point of view — only the
    /// storage write is left for reconciliation.
    fn finalise(&mut self, ctx: &mut Context<Self>) {
        if matches!(self.state, EngineState::Completed) {
            return;
        }
        self.state = EngineState::Finalising;

        let persistence = self.persistence.clone();
        let settings = self.settings.clone();
        let metrics = self.metrics.clone();
        let match_id = self.match_id;
        let (player1, player2) = (self.player1, self.player2);
        let (score1, score2) = (self.score1, self.score2);

        let fut = async move {
            let u1 = persistence.get_user(player1).await?;
            let u2 = persistence.get_user(player2).await?;
            let rounds = persistence.get_match_rounds(match_id).await?;

            let (outcome1, outcome2, winner) = match score1.cmp(&score2) {
                Ordering::Greater => (Outcome::Win, Outcome::Loss, Some(player1)),
                Ordering::Less => (Outcome::Loss, Outcome::Win, Some(player2)),
                Ordering::Equal => (Outcome::Draw, Outcome::Draw, None),
            };
            let delta1 = apply_rating(u1.rating, outcome1, &settings.rating);
            let delta2 = apply_rating(u2.rating, outcome2, &settings.rating);

            with_retry(&settings.retry, &metrics, || {
                let persistence = persistence.clone();
                async move {
                    persistence
                        .finalise_match(match_id, player1, player2, winner, score1, score2, delta1, delta2)
                        .await
                }
            })
            .await?;

            Ok::<_, PersistenceError>((u1, u2, delta1, delta2, winner, rounds))
        };

        ctx.spawn(fut.into_actor(self).map(move |res, act, ctx| {
            match res {
                Ok((u1, u2, delta1, delta2, winner, rounds)) => {
                    act.state = EngineState::Completed;
                    act.metrics.matches_completed_total.inc();
                    act.metrics.active_matches.dec();

                    let rounds_review: Vec<RoundReview> = rounds
                        .into_iter()
                        .map(|rw| RoundReview {
                            round_number: rw.round.round_number,
                            question_text: rw.question.prompt,
                            correct_answer: rw.question.correct_option,
                            explanation: rw.question.explanation,
                            player1_answer: rw.round.player1_answer,
                            player2_answer: rw.round.player2_answer,
                            player1_score: rw.round.player1_score,
                            player2_score: rw.round.player2_score,
                        })
                        .collect();

                    let payload = MatchEndPayload {
                        winner_id: winner,
                        player1: MatchEndPlayerSummary {
                            id: act.player1,
                            username: u1.display_name,
                            score: act.score1,
                            new_rating: delta1.new_rating,
                        },
                        player2: MatchEndPlayerSummary {
                            id: act.player2,
                            username: u2.display_name,
                            score: act.score2,
                            new_rating: delta2.new_rating,
                        },
                        rounds: rounds_review,
                    };
                    act.broadcast(GameServerMessage::MatchEnd { result: payload });
                }
                Err(e) => {
                    tracing::error!("finalisation failed permanently, falling back to best-effort: {}", e);
                    act.metrics.matches_aborted_total.inc();
                    act.metrics.active_matches.dec();
                    act.state = EngineState::Completed;

                    let persistence = act.persistence.clone();
                    let (p1, p2) = (act.player1, act.player2);
                    ctx.spawn(
                        async move {
                            let _ = persistence.clear_in_game(p1, p2).await;
                        }
                        .into_actor(act),
                    );
                    act.broadcast(GameServerMessage::Error {
                        code: ErrorCode::InternalError,
                        message: "match could not be finalised".to_string(),
                    });
                }
            }
            act.registry.remove(act.match_id);
            act.matchmaker.do_send(MatchFinished {
                player1: act.player1,
                player2: act.player2,
            });
        }));
    }

    fn check_force_finalise(&mut self, ctx: &mut Context<Self>) {
        if matches!(self.state, EngineState::Completed) {
            return;
        }
        let both_gone = self.sinks.get(&self.player1).map(|s| s.is_none()).unwrap_or(true)
            && self.sinks.get(&self.player2).map(|s| s.is_none()).unwrap_or(true);
        if both_gone {
            self.state = EngineState::AbortedByDisconnect;
            self.finalise(ctx);
        }
    }
}

impl Actor for MatchEngine {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        self.metrics.matches_started_total.inc();
        self.metrics.active_matches.inc();
    }
}

impl Handler<JoinSession> for MatchEngine {
    type Result = Result<(), SessionError>;

    fn handle(&mut self, msg: JoinSession, ctx: &mut Self::Context) -> Self::Result {
        if msg.player_id != self.player1 && msg.player_id != self.player2 {
            return Err(SessionError::NotAParticipant);
        }
        self.sinks.insert(msg.player_id, Some(msg.sink));

        let connected = self.sinks.values().filter(|s| s.is_some()).count();
        self.push(
            msg.player_id,
            GameServerMessage::Connected {
                match_id: self.match_id,
                players_ready: connected,
            },
        );

        if self.state == EngineState::Lobby && connected == 2 {
            self.broadcast(GameServerMessage::GameStart {
                message: "Both players connected".to_string(),
            });
            let vs = self.settings.matchmaking.vs_banner_seconds;
            ctx.run_later(Duration::from_secs(vs), |act, ctx| {
                act.begin_round(1, ctx);
            });
        }
        Ok(())
    }
}

impl Handler<PlayerDisconnected> for MatchEngine {
    type Result = ();

    fn handle(&mut self, msg: PlayerDisconnected, ctx: &mut Self::Context) -> Self::Result {
        if !self.sinks.contains_key(&msg.player_id) {
            return;
        }
        self.sinks.insert(msg.player_id, None);

        let both_gone = self.sinks.values().all(|s| s.is_none());
        if both_gone && !matches!(self.state, EngineState::Completed) {
            let grace = self.settings.matchmaking.disconnect_grace_seconds;
            ctx.run_later(Duration::from_secs(grace), |act, ctx| {
                act.check_force_finalise(ctx);
            });
        }
    }
}

impl Handler<ClientReady> for MatchEngine {
    type Result = ();

    fn handle(&mut self, msg: ClientReady, _ctx: &mut Self::Context) -> Self::Result {
        self.players_ready.insert(msg.player_id);
    }
}

impl Handler<SubmitAnswer> for MatchEngine {
    type Result = Result<(), SessionError>;

    fn handle(&mut self, msg: SubmitAnswer, ctx: &mut Self::Context) -> Self::Result {
        if msg.player_id != self.player1 && msg.player_id != self.player2 {
            return Err(SessionError::NotAParticipant);
        }
        if self.state != EngineState::RoundActive {
            return Ok(());
        }
        if self.scratch.answers.contains_key(&msg.player_id) {
            return Ok(());
        }

        let elapsed = self
            .scratch
            .started_at
            .map(|t: Instant| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let latency = msg.client_latency_seconds.min(elapsed);

        self.scratch.answers.insert(
            msg.player_id,
            PendingAnswer {
                choice: msg.choice,
                latency_seconds: latency,
            },
        );
        self.broadcast(GameServerMessage::AnswerSubmitted { user_id: msg.player_id });

        if self.scratch.both_answered() {
            self.end_round(ctx);
        }
        Ok(())
    }
}

impl Handler<SendEmoji> for MatchEngine {
    type Result = Result<(), SessionError>;

    fn handle(&mut self, msg: SendEmoji, _ctx: &mut Self::Context) -> Self::Result {
        if msg.player_id != self.player1 && msg.player_id != self.player2 {
            return Err(SessionError::NotAParticipant);
        }
        let limit = self.settings.matchmaking.emoji_limit_per_match;
        let count = self.emoji_counts.entry(msg.player_id).or_insert(0);
        if *count >= limit {
            return Ok(());
        }
        *count += 1;

        let opponent = self.opponent_of(msg.player_id);
        self.push(opponent, GameServerMessage::EmojiReceived { emoji: msg.emoji });
        Ok(())
    }
}
