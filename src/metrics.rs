use lazy_static::lazy_static;
use prometheus::{opts, Histogram, HistogramOpts, IntCounter, IntGauge, Registry};

lazy_static! {
    pub static ref PLAYERS_IN_QUEUE: IntGauge =
        IntGauge::with_opts(opts!("players_in_queue", "Current number of players waiting in the matchmaking queue")).unwrap();

    pub static ref MATCHES_STARTED_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("matches_started_total", "Total number of matches started")).unwrap();

    pub static ref MATCHES_COMPLETED_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("matches_completed_total", "Total number of matches that reached Completed")).unwrap();

    pub static ref MATCHES_ABORTED_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("matches_aborted_total", "Total number of matches force-finalised due to disconnect")).unwrap();

    pub static ref ROUND_TIMEOUTS_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("round_timeouts_total", "Total number of rounds ended by the 15s deadline instead of both answers")).unwrap();

    pub static ref ACTIVE_MATCHES: IntGauge =
        IntGauge::with_opts(opts!("active_matches", "Number of matches currently in progress")).unwrap();

    pub static ref MATCH_WAIT_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "match_wait_duration_seconds",
            "Time a player spent queued before being paired"
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0])
    )
    .unwrap();

    pub static ref PERSISTENCE_RETRIES_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("persistence_retries_total", "Total number of persistence operations that needed a retry")).unwrap();
}

/// Bundled handles, cloned cheaply into `AppState`.
#[derive(Clone)]
pub struct MetricsCtx {
    pub players_in_queue: IntGauge,
    pub matches_started_total: IntCounter,
    pub matches_completed_total: IntCounter,
    pub matches_aborted_total: IntCounter,
    pub round_timeouts_total: IntCounter,
    pub active_matches: IntGauge,
    pub match_wait_duration_seconds: Histogram,
    pub persistence_retries_total: IntCounter,
}

impl MetricsCtx {
    pub fn new() -> Self {
        Self {
            players_in_queue: PLAYERS_IN_QUEUE.clone(),
            matches_started_total: MATCHES_STARTED_TOTAL.clone(),
            matches_completed_total: MATCHES_COMPLETED_TOTAL.clone(),
            matches_aborted_total: MATCHES_ABORTED_TOTAL.clone(),
            round_timeouts_total: ROUND_TIMEOUTS_TOTAL.clone(),
            active_matches: ACTIVE_MATCHES.clone(),
            match_wait_duration_seconds: MATCH_WAIT_DURATION_SECONDS.clone(),
            persistence_retries_total: PERSISTENCE_RETRIES_TOTAL.clone(),
        }
    }
}

impl Default for MetricsCtx {
    fn default() -> Self {
        Self::new()
    }
}

pub fn register_custom_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(PLAYERS_IN_QUEUE.clone()))?;
    registry.register(Box::new(MATCHES_STARTED_TOTAL.clone()))?;
    registry.register(Box::new(MATCHES_COMPLETED_TOTAL.clone()))?;
    registry.register(Box::new(MATCHES_ABORTED_TOTAL.clone()))?;
    registry.register(Box::new(ROUND_TIMEOUTS_TOTAL.clone()))?;
    registry.register(Box::new(ACTIVE_MATCHES.clone()))?;
    registry.register(Box::new(MATCH_WAIT_DURATION_SECONDS.clone()))?;
    registry.register(Box::new(PERSISTENCE_RETRIES_TOTAL.clone()))?;
    Ok(())
}
