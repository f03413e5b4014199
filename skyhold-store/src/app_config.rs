use serde::Deserialize;
use std::env;

use skyhold_core::rules::EngineRules;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub kafka: KafkaConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub engine: EngineRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    /// Publish engine events and consume booking events. Off means in-process events only.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_group_id")]
    pub group_id: String,
    #[serde(default = "default_confirmed_topic")]
    pub booking_confirmed_topic: String,
    #[serde(default = "default_cancelled_topic")]
    pub booking_cancelled_topic: String,
}

fn default_group_id() -> String { "skyhold-inventory".to_string() }
fn default_confirmed_topic() -> String { "booking.confirmed".to_string() }
fn default_cancelled_topic() -> String { "booking.cancelled".to_string() }

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    Postgres,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `SKYHOLD__ENGINE__HOLD_TTL_SECONDS=600`
            .add_source(config::Environment::with_prefix("SKYHOLD").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
