use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Application settings, layered as defaults < `config/default.*` file
/// < `HUDDLE__*` environment variables (e.g. `HUDDLE__DATABASE__URL`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub rooms: RoomSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomSettings {
    /// Length of generated room codes.
    pub code_length: usize,
    /// Length of generated join keys for private rooms created without one.
    pub join_key_length: usize,
    /// How many times a store transaction is re-run on transient conflicts
    /// before giving up.
    pub txn_retry_budget: u32,
    /// Buffered capacity of each live message channel.
    pub channel_capacity: usize,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "huddle")?
            .set_default("rooms.code_length", 6_i64)?
            .set_default("rooms.join_key_length", 12_i64)?
            .set_default("rooms.txn_retry_budget", 8_i64)?
            .set_default("rooms.channel_capacity", 256_i64)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(Environment::with_prefix("HUDDLE").separator("__"))
            .build()?
            .try_deserialize()
    }
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            code_length: 6,
            join_key_length: 12,
            txn_retry_budget: 8,
            channel_capacity: 256,
        }
    }
}
