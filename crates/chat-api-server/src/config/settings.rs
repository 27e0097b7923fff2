use anyhow::Result;
use axum::http::HeaderValue;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub app: AppConfig,
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    pub redis: RedisConfig,
    pub memory: MemoryConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub name: String,
    pub environment: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    /// Sliding-window retention: every append pushes expiry out this far.
    pub ttl_seconds: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MemoryConfig {
    pub max_history_tokens: usize,
    pub max_history_turns: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    /// Explicit origin list for the CORS layer; `None` when any entry is
    /// the `*` wildcard. Entries that do not parse as header values are
    /// dropped rather than failing startup.
    pub fn origin_values(&self) -> Option<Vec<HeaderValue>> {
        if self.allowed_origins.iter().any(|origin| origin == "*") {
            return None;
        }

        Some(
            self.allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect(),
        )
    }
}

impl Settings {
    /// Load from `config/settings.toml` with `APP__`-prefixed environment
    /// overrides (e.g. `APP__GEMINI__API_KEY`). Read once at startup;
    /// immutable for the process lifetime.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(true))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }
}
