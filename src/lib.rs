pub mod auth;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod logging;
pub mod matchmaker;
pub mod metrics;
pub mod persistence;
pub mod policy;
pub mod protocol;
pub mod session;

use std::sync::Arc;

use actix::Addr;

use crate::config::Settings;
use crate::engine::EngineRegistry;
use crate::matchmaker::Matchmaker;
use crate::metrics::MetricsCtx;
use crate::persistence::{PersistenceGateway, QuestionRepository};

/// Shared application handles, cloned into every actix-web worker thread:
/// one long-lived bundle of addresses and pools rather than a grab-bag of
/// globals.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub matchmaker: Addr<Matchmaker>,
    pub persistence: PersistenceGateway,
    pub questions: QuestionRepository,
    pub engines: EngineRegistry,
    pub metrics: MetricsCtx,
}
