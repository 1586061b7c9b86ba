use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix::{Actor, Context, Handler};
use quizduel::config::Settings;
use quizduel::domain::{Choice, Question};
use quizduel::engine::{EngineRegistry, JoinSession, MatchEngine, SendEmoji, SubmitAnswer};
use quizduel::matchmaker::Matchmaker;
use quizduel::metrics::MetricsCtx;
use quizduel::persistence::{PersistenceGateway, QuestionRepository};
use quizduel::protocol::GameServerMessage;
use quizduel::session::Push;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

/// Hand-rolled pool, same reasoning as `matchmaker_test.rs`: `MatchEngine`
/// is an actix actor, so these tests need to own a real `actix::System`
/// via `#[actix::test]` rather than `#[sqlx::test]`'s runtime.
async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch Postgres instance");
    let pool = PgPoolOptions::new().max_connections(5).connect(&url).await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

struct RecordingSink {
    received: Arc<Mutex<Vec<GameServerMessage>>>,
}

impl Actor for RecordingSink {
    type Context = Context<Self>;
}

impl Handler<Push<GameServerMessage>> for RecordingSink {
    type Result = ();
    fn handle(&mut self, msg: Push<GameServerMessage>, _ctx: &mut Self::Context) {
        self.received.lock().unwrap().push(msg.0);
    }
}

fn new_sink() -> (actix::Recipient<Push<GameServerMessage>>, Arc<Mutex<Vec<GameServerMessage>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let addr = RecordingSink {
        received: received.clone(),
    }
    .start();
    (addr.recipient(), received)
}

/// All timers shrunk to near-zero so a full multi-round match drives to
/// completion in well under a second of wall-clock test time, except
/// `round_timeout_seconds`, which the timeout test needs to actually
/// observe elapsing.
fn test_settings(round_timeout_seconds: u64) -> Arc<Settings> {
    Arc::new(Settings {
        server: quizduel::config::ServerSettings {
            bind_address: "127.0.0.1".into(),
            port: 0,
            log_level: "error".into(),
            metrics_auth_token: String::new(),
        },
        logging: quizduel::config::LoggingSettings {
            directory: "/tmp".into(),
            filename: "test.log".into(),
        },
        matchmaking: quizduel::config::MatchmakingSettings {
            total_rounds: 1,
            round_timeout_seconds,
            vs_banner_seconds: 0,
            inter_round_seconds: 0,
            pre_finalise_seconds: 0,
            emoji_limit_per_match: 5,
            disconnect_grace_seconds: 1,
            heartbeat_interval_seconds: 5,
            heartbeat_timeout_seconds: 10,
        },
        rating: quizduel::config::RatingSettings {
            win_delta: 20,
            loss_delta: -15,
            draw_delta: 0,
            rating_floor: 0,
            level_divisor: 200,
        },
        database: quizduel::config::DatabaseSettings { url: String::new() },
        auth: quizduel::config::AuthSettings {
            jwt_secret: "test".into(),
        },
        retry: quizduel::config::RetrySettings {
            max_elapsed_time_ms: 50,
            initial_interval_ms: 5,
            max_interval_ms: 10,
        },
    })
}

async fn seed_user(pool: &PgPool, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, display_name) VALUES ($1, $2)")
        .bind(id)
        .bind(name)
        .execute(pool)
        .await
        .unwrap();
    id
}

async fn seed_category(pool: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO categories (id, name) VALUES ($1, 'general')")
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
    id
}

async fn seed_question(pool: &PgPool, category_id: Uuid) -> Question {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO questions (id, prompt, option_a, option_b, option_c, option_d, correct_option, explanation, category_id)
         VALUES ($1, 'prompt', 'a', 'b', 'c', 'd', 'A', 'because', $2)",
    )
    .bind(id)
    .bind(category_id)
    .execute(pool)
    .await
    .unwrap();

    Question {
        id,
        prompt: "prompt".into(),
        option_a: "a".into(),
        option_b: "b".into(),
        option_c: "c".into(),
        option_d: "d".into(),
        correct_option: Choice::A,
        explanation: "because".into(),
        category_id,
        category_name: "general".into(),
    }
}

struct Harness {
    engine: actix::Addr<MatchEngine>,
    player1: Uuid,
    player2: Uuid,
    sink1: Arc<Mutex<Vec<GameServerMessage>>>,
    sink2: Arc<Mutex<Vec<GameServerMessage>>>,
}

async fn spawn_match(pool: &PgPool, questions: Vec<Question>, round_timeout_seconds: u64) -> Harness {
    let player1 = seed_user(pool, "alice").await;
    let player2 = seed_user(pool, "bob").await;

    let persistence = PersistenceGateway::new(pool.clone());
    let created = persistence
        .create_match_with_rounds(player1, player2, &questions)
        .await
        .unwrap();

    let settings = test_settings(round_timeout_seconds);
    let questions_repo = QuestionRepository::new(pool.clone());
    let registry = EngineRegistry::new();
    let matchmaker = Matchmaker::new(
        persistence.clone(),
        questions_repo,
        registry.clone(),
        settings.clone(),
        MetricsCtx::new(),
    )
    .start();

    let engine = MatchEngine::new(
        created.id,
        player1,
        player2,
        questions,
        persistence,
        matchmaker,
        registry,
        settings,
        MetricsCtx::new(),
    )
    .start();

    let (sink1, recv1) = new_sink();
    let (sink2, recv2) = new_sink();

    engine.send(JoinSession { player_id: player1, sink: sink1 }).await.unwrap().unwrap();
    engine.send(JoinSession { player_id: player2, sink: sink2 }).await.unwrap().unwrap();
    // Both sinks attached triggers the vs-banner timer, which (at 0s) fires
    // round 1's `QuestionStart` on the next few actor ticks.
    tokio::time::sleep(Duration::from_millis(100)).await;

    Harness {
        engine,
        player1,
        player2,
        sink1: recv1,
        sink2: recv2,
    }
}

fn match_ends(received: &Arc<Mutex<Vec<GameServerMessage>>>) -> Option<GameServerMessage> {
    received
        .lock()
        .unwrap()
        .iter()
        .find(|m| matches!(m, GameServerMessage::MatchEnd { .. }))
        .cloned()
}

#[actix::test]
async fn full_match_runs_every_round_and_finalises_with_a_winner() {
    let pool = test_pool().await;
    let category = seed_category(&pool).await;
    let mut questions = Vec::new();
    for _ in 0..5 {
        questions.push(seed_question(&pool, category).await);
    }

    let h = spawn_match(&pool, questions, 30).await;

    for _ in 0..5 {
        h.engine
            .send(SubmitAnswer {
                player_id: h.player1,
                choice: Choice::A,
                client_latency_seconds: 1.0,
            })
            .await
            .unwrap()
            .unwrap();
        // player2 never answers this round; round ends as soon as both
        // "answered" (player1 answered, player2 times out only at 30s, so
        // nothing ends the round here) -- instead we let player2 answer
        // incorrectly right away so each round ends immediately rather
        // than waiting out the deadline.
        h.engine
            .send(SubmitAnswer {
                player_id: h.player2,
                choice: Choice::B,
                client_latency_seconds: 1.0,
            })
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    tokio::time::sleep(Duration::from_millis(200)).await;

    let end = match_ends(&h.sink1).expect("match should have finalised");
    match end {
        GameServerMessage::MatchEnd { result } => {
            assert_eq!(result.winner_id, Some(h.player1));
            assert_eq!(result.player1.score, 500);
            assert_eq!(result.player2.score, 0);
            assert_eq!(result.player1.new_rating, 1020);
            assert_eq!(result.player2.new_rating, 985);
            assert_eq!(result.rounds.len(), 5);
        }
        _ => unreachable!(),
    }
    assert!(match_ends(&h.sink2).is_some());
}

#[actix::test]
async fn equal_scores_finalise_as_a_draw() {
    let pool = test_pool().await;
    let category = seed_category(&pool).await;
    let question = seed_question(&pool, category).await;

    let h = spawn_match(&pool, vec![question], 30).await;

    h.engine
        .send(SubmitAnswer {
            player_id: h.player1,
            choice: Choice::A,
            client_latency_seconds: 1.0,
        })
        .await
        .unwrap()
        .unwrap();
    h.engine
        .send(SubmitAnswer {
            player_id: h.player2,
            choice: Choice::A,
            client_latency_seconds: 1.0,
        })
        .await
        .unwrap()
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let end = match_ends(&h.sink1).expect("match should have finalised");
    match end {
        GameServerMessage::MatchEnd { result } => {
            assert_eq!(result.winner_id, None);
            assert_eq!(result.player1.score, result.player2.score);
            assert_eq!(result.player1.new_rating, 1000);
            assert_eq!(result.player2.new_rating, 1000);
        }
        _ => unreachable!(),
    }
}

#[actix::test]
async fn unanswered_round_ends_at_the_deadline() {
    let pool = test_pool().await;
    let category = seed_category(&pool).await;
    let question = seed_question(&pool, category).await;

    let h = spawn_match(&pool, vec![question], 1).await;

    h.engine
        .send(SubmitAnswer {
            player_id: h.player1,
            choice: Choice::A,
            client_latency_seconds: 0.5,
        })
        .await
        .unwrap()
        .unwrap();

    // player2 never answers; only the 1s deadline ends the round.
    tokio::time::sleep(Duration::from_millis(1300)).await;

    let round_end = h
        .sink1
        .lock()
        .unwrap()
        .iter()
        .find_map(|m| match m {
            GameServerMessage::RoundEnd { result, .. } => Some(result.clone()),
            _ => None,
        })
        .expect("round should have ended at the deadline");
    assert_eq!(round_end.players[&h.player2].answer, None);
    assert_eq!(round_end.players[&h.player2].score, 0);
    assert!(round_end.players[&h.player1].correct);

    let end = match_ends(&h.sink1).expect("single-round match should finalise right after");
    match end {
        GameServerMessage::MatchEnd { result } => {
            assert_eq!(result.winner_id, Some(h.player1));
        }
        _ => unreachable!(),
    }
}

#[actix::test]
async fn emoji_sends_beyond_the_limit_are_dropped() {
    let pool = test_pool().await;
    let category = seed_category(&pool).await;
    let question = seed_question(&pool, category).await;

    let h = spawn_match(&pool, vec![question], 30).await;

    for _ in 0..7 {
        h.engine
            .send(SendEmoji {
                player_id: h.player1,
                emoji: "🎉".to_string(),
            })
            .await
            .unwrap()
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let received_count = h
        .sink2
        .lock()
        .unwrap()
        .iter()
        .filter(|m| matches!(m, GameServerMessage::EmojiReceived { .. }))
        .count();
    assert_eq!(received_count, 5);
}
