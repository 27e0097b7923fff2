mod settings;

pub use settings::{
    AppConfig, CorsConfig, GeminiConfig, MemoryConfig, RedisConfig, ServerConfig, Settings,
};
