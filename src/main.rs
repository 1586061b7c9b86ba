use std::sync::Arc;
use std::time::Duration;

use actix::Actor;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use actix_web_actors::ws;
use prometheus::{Encoder, Registry, TextEncoder};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use quizduel::auth::{authenticate, extract_token};
use quizduel::config::Settings;
use quizduel::engine::EngineRegistry;
use quizduel::logging::LoggerManager;
use quizduel::matchmaker::Matchmaker;
use quizduel::metrics::{register_custom_metrics, MetricsCtx};
use quizduel::persistence::{PersistenceGateway, QuestionRepository};
use quizduel::session::{GameSession, MatchmakingSession};
use quizduel::AppState;

async fn matchmaking_ws(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> actix_web::Result<HttpResponse> {
    let identity = authenticate(extract_token(&req).as_deref(), &state.settings.auth.jwt_secret)
        .map_err(actix_web::error::ErrorUnauthorized)?;

    let session = MatchmakingSession::new(
        identity.player_id,
        state.matchmaker.clone(),
        state.persistence.clone(),
        Duration::from_secs(state.settings.matchmaking.heartbeat_interval_seconds),
        Duration::from_secs(state.settings.matchmaking.heartbeat_timeout_seconds),
    );
    ws::start(session, &req, stream)
}

async fn game_ws(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> actix_web::Result<HttpResponse> {
    let identity = authenticate(extract_token(&req).as_deref(), &state.settings.auth.jwt_secret)
        .map_err(actix_web::error::ErrorUnauthorized)?;
    let match_id = path.into_inner();

    let session = GameSession::new(
        identity.player_id,
        match_id,
        state.engines.clone(),
        state.persistence.clone(),
        Duration::from_secs(state.settings.matchmaking.heartbeat_interval_seconds),
        Duration::from_secs(state.settings.matchmaking.heartbeat_timeout_seconds),
    );
    ws::start(session, &req, stream)
}

async fn metrics(req: HttpRequest, state: web::Data<AppState>, registry: web::Data<Registry>) -> HttpResponse {
    let expected = format!("Bearer {}", state.settings.server.metrics_auth_token);
    if state.settings.server.metrics_auth_token.is_empty()
        || req.headers().get("Authorization").and_then(|h| h.to_str().ok()) != Some(expected.as_str())
    {
        return HttpResponse::Unauthorized().finish();
    }

    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if encoder.encode(&registry.gather(), &mut buffer).is_err() {
        return HttpResponse::InternalServerError().finish();
    }
    HttpResponse::Ok().content_type(encoder.format_type()).body(buffer)
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

async fn ready(state: web::Data<AppState>) -> HttpResponse {
    match state.persistence.get_user(Uuid::nil()).await {
        Ok(_) | Err(quizduel::error::PersistenceError::Fatal(_)) => HttpResponse::Ok().json(serde_json::json!({ "status": "ready" })),
        Err(_) => HttpResponse::ServiceUnavailable().json(serde_json::json!({ "status": "not_ready" })),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let settings = Settings::new()?;
    let _logger = LoggerManager::setup(&settings);

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&settings.database.url)
        .await?;

    let registry = Registry::new();
    register_custom_metrics(&registry)?;
    let metrics = MetricsCtx::new();

    let persistence = PersistenceGateway::new(pool.clone());
    let questions = QuestionRepository::new(pool.clone());
    let engines = EngineRegistry::new();
    let settings = Arc::new(settings);

    let matchmaker = Matchmaker::new(
        persistence.clone(),
        questions.clone(),
        engines.clone(),
        settings.clone(),
        metrics.clone(),
    )
    .start();

    let state = AppState {
        settings: settings.clone(),
        matchmaker,
        persistence,
        questions,
        engines,
        metrics,
    };

    let bind_address = settings.server.bind_address.clone();
    let port = settings.server.port;

    tracing::info!("starting quizduel-match-server on {}:{}", bind_address, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(registry.clone()))
            .route("/ws/matchmaking", web::get().to(matchmaking_ws))
            .route("/ws/game/{match_id}", web::get().to(game_ws))
            .route("/metrics", web::get().to(metrics))
            .route("/health", web::get().to(health))
            .route("/ready", web::get().to(ready))
    })
    .bind((bind_address, port))?
    .run()
    .await?;

    Ok(())
}
