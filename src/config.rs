use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub matchmaking: MatchmakingSettings,
    pub rating: RatingSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub retry: RetrySettings,
}

impl Settings {
    /// Loads `config/{RUN_MODE}.toml` (default `development`) and layers
    /// `APP__SECTION__KEY`-style environment overrides on top.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(
                File::with_name(&format!("config/{}", run_mode))
                    .format(FileFormat::Toml)
                    .required(true),
            )
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_address: String,
    pub port: u16,
    pub log_level: String,
    #[serde(default)]
    pub metrics_auth_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub directory: String,
    pub filename: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchmakingSettings {
    pub total_rounds: u32,
    pub round_timeout_seconds: u64,
    pub vs_banner_seconds: u64,
    pub inter_round_seconds: u64,
    pub pre_finalise_seconds: u64,
    pub emoji_limit_per_match: u32,
    pub disconnect_grace_seconds: u64,
    pub heartbeat_interval_seconds: u64,
    pub heartbeat_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RatingSettings {
    pub win_delta: i32,
    pub loss_delta: i32,
    pub draw_delta: i32,
    pub rating_floor: i32,
    pub level_divisor: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrySettings {
    pub max_elapsed_time_ms: u64,
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
}
