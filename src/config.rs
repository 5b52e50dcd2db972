use crate::error::{env_error, BotResult};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use toml;

/// Default display name for dispatched bots when a user has no override
pub const DEFAULT_BOT_NAME: &str = "Meetscribe Notetaker";

/// Default interval between dispatch cycles, in seconds
pub const DEFAULT_CYCLE_INTERVAL_SECS: u64 = 60;

/// Default per-cycle deadline, in seconds
pub const DEFAULT_CYCLE_DEADLINE_SECS: u64 = 300;

/// Main configuration structure for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Calendar provider API key
    pub calendar_api_key: String,
    /// Calendar provider API base URI
    pub calendar_api_uri: String,
    /// Bot provider API base URI
    pub bot_api_base: String,
    /// Bot provider API key
    pub bot_api_key: String,
    /// Slack bot token for reminder delivery
    pub slack_bot_token: String,
    /// Redis connection URL for the dispatch cache
    pub redis_url: String,
    /// Postgres connection string for the meeting store
    pub database_url: String,
    /// Address for the health/trigger HTTP listener
    pub http_listen_addr: String,
    /// Seconds between dispatch cycles
    pub cycle_interval_secs: u64,
    /// Deadline for a single cycle before it is abandoned
    pub cycle_deadline_secs: u64,
    /// Whether the scheduled cycle actually runs (manual trigger always works)
    pub run_dispatch_cycle: bool,
    /// Map of component names to their enabled status
    pub components: HashMap<String, bool>,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> BotResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        // Required environment variables
        let calendar_api_key =
            env::var("CALENDAR_API_KEY").map_err(|_| env_error("CALENDAR_API_KEY"))?;
        let calendar_api_uri =
            env::var("CALENDAR_API_URI").map_err(|_| env_error("CALENDAR_API_URI"))?;
        let bot_api_base = env::var("BOT_API_BASE").map_err(|_| env_error("BOT_API_BASE"))?;
        let bot_api_key = env::var("BOT_API_KEY").map_err(|_| env_error("BOT_API_KEY"))?;
        let slack_bot_token =
            env::var("SLACK_BOT_TOKEN").map_err(|_| env_error("SLACK_BOT_TOKEN"))?;
        let database_url = env::var("DATABASE_URL").map_err(|_| env_error("DATABASE_URL"))?;

        // Optional values with defaults
        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| String::from("redis://127.0.0.1:6379"));
        let http_listen_addr =
            env::var("HTTP_LISTEN_ADDR").unwrap_or_else(|_| String::from("127.0.0.1:8080"));

        let cycle_interval_secs = match env::var("CYCLE_INTERVAL_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|_| env_error("Invalid CYCLE_INTERVAL_SECS format"))?,
            Err(_) => DEFAULT_CYCLE_INTERVAL_SECS,
        };

        let cycle_deadline_secs = match env::var("CYCLE_DEADLINE_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|_| env_error("Invalid CYCLE_DEADLINE_SECS format"))?,
            Err(_) => DEFAULT_CYCLE_DEADLINE_SECS,
        };

        let run_dispatch_cycle = env::var("RUN_DISPATCH_CYCLE")
            .map(|v| v == "true")
            .unwrap_or(false);

        // Initialize default components
        let mut components = HashMap::new();
        components.insert("meeting_dispatch".to_string(), true);
        components.insert("http_api".to_string(), true);

        // Load components configuration from file if it exists
        if let Ok(content) = fs::read_to_string("config/components.toml") {
            if let Ok(file_components) = toml::from_str::<HashMap<String, bool>>(&content) {
                // Merge with defaults
                for (key, value) in file_components {
                    components.insert(key, value);
                }
            }
        }

        Ok(Config {
            calendar_api_key,
            calendar_api_uri,
            bot_api_base,
            bot_api_key,
            slack_bot_token,
            redis_url,
            database_url,
            http_listen_addr,
            cycle_interval_secs,
            cycle_deadline_secs,
            run_dispatch_cycle,
            components,
        })
    }

    /// Check if a component is enabled
    pub fn is_component_enabled(&self, name: &str) -> bool {
        *self.components.get(name).unwrap_or(&false)
    }
}
