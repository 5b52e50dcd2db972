use crate::config::Config;
use crate::error::{cache_error, BotResult};
use crate::providers::DispatchCache;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client as RedisClient, ExistenceCheck, SetExpiry, SetOptions};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::info;

/// Cache key builders and TTLs for the three idempotency gates
pub mod keys {
    /// Presence means a bot was already dispatched for this occurrence
    pub fn event_gate(identifier: &str) -> String {
        format!("cal:{}", identifier)
    }

    /// Snapshot for downstream consumers of a dispatched bot
    pub fn bot_metadata(bot_id: &str) -> String {
        format!("botmeta:{}", bot_id)
    }

    /// Presence means a reminder already went to this user for this meeting
    pub fn reminder_gate(meeting_id: i64, user_id: i64) -> String {
        format!("reminder:{}:{}", meeting_id, user_id)
    }

    /// Must outlive the gap between dispatch and meeting end
    pub const EVENT_GATE_TTL_SECS: u64 = 7200;
    pub const BOT_METADATA_TTL_SECS: u64 = 18000;
    pub const REMINDER_GATE_TTL_SECS: u64 = 604_800;
}

/// The cache actor that processes messages
pub struct CacheActor {
    config: Arc<RwLock<Config>>,
    client: RedisClient,
    /// URL the client was opened with, to detect config changes
    client_url: String,
    command_rx: mpsc::Receiver<CacheCommand>,
}

/// Commands that can be sent to the cache actor
pub enum CacheCommand {
    Get(String, mpsc::Sender<BotResult<Option<String>>>),
    Set(String, String, u64, mpsc::Sender<BotResult<()>>),
    SetIfAbsent(String, String, u64, mpsc::Sender<BotResult<bool>>),
    Shutdown,
}

/// Handle for communicating with the cache actor
#[derive(Clone)]
pub struct CacheActorHandle {
    command_tx: mpsc::Sender<CacheCommand>,
}

impl CacheActorHandle {
    /// Get a value from the cache
    pub async fn get_value(&self, key: &str) -> BotResult<Option<String>> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(CacheCommand::Get(key.to_string(), response_tx))
            .await
            .map_err(|e| cache_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| cache_error("Response channel closed"))?
    }

    /// Set a value with a TTL in seconds
    pub async fn set_value(&self, key: &str, value: &str, ttl_secs: u64) -> BotResult<()> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(CacheCommand::Set(
                key.to_string(),
                value.to_string(),
                ttl_secs,
                response_tx,
            ))
            .await
            .map_err(|e| cache_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| cache_error("Response channel closed"))?
    }

    /// Set a value only when the key is absent; returns whether this call won
    pub async fn set_value_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> BotResult<bool> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(CacheCommand::SetIfAbsent(
                key.to_string(),
                value.to_string(),
                ttl_secs,
                response_tx,
            ))
            .await
            .map_err(|e| cache_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| cache_error("Response channel closed"))?
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> BotResult<()> {
        let _ = self.command_tx.send(CacheCommand::Shutdown).await;
        Ok(())
    }
}

#[async_trait]
impl DispatchCache for CacheActorHandle {
    async fn get(&self, key: &str) -> BotResult<Option<String>> {
        self.get_value(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> BotResult<()> {
        self.set_value(key, value, ttl_secs).await
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: u64) -> BotResult<bool> {
        self.set_value_if_absent(key, value, ttl_secs).await
    }
}

impl CacheActor {
    /// Create a new actor and return its handle
    pub fn new(config: Arc<RwLock<Config>>, redis_url: &str) -> BotResult<(Self, CacheActorHandle)> {
        let (command_tx, command_rx) = mpsc::channel(32);

        let client = RedisClient::open(redis_url)
            .map_err(|e| cache_error(&format!("Failed to create Redis client: {}", e)))?;

        let actor = Self {
            config,
            client,
            client_url: redis_url.to_string(),
            command_rx,
        };

        let handle = CacheActorHandle { command_tx };

        Ok((actor, handle))
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Cache actor started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                CacheCommand::Get(key, response_tx) => {
                    let result = self.get_from_redis(&key).await;
                    let _ = response_tx.send(result).await;
                }
                CacheCommand::Set(key, value, ttl_secs, response_tx) => {
                    let result = self.set_in_redis(&key, &value, ttl_secs).await;
                    let _ = response_tx.send(result).await;
                }
                CacheCommand::SetIfAbsent(key, value, ttl_secs, response_tx) => {
                    let result = self.set_in_redis_if_absent(&key, &value, ttl_secs).await;
                    let _ = response_tx.send(result).await;
                }
                CacheCommand::Shutdown => {
                    info!("Cache actor shutting down");
                    break;
                }
            }
        }

        info!("Cache actor shut down");
    }

    /// Get a redis connection
    async fn get_redis_connection(&self) -> BotResult<MultiplexedConnection> {
        // Reconnect with the configured URL if it changed since startup
        let redis_url = {
            let config_guard = self.config.read().await;
            config_guard.redis_url.clone()
        };

        let client = if redis_url != self.client_url {
            RedisClient::open(redis_url.as_str())
                .map_err(|e| cache_error(&format!("Failed to create Redis client: {}", e)))?
        } else {
            self.client.clone()
        };

        client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| cache_error(&format!("Failed to connect to Redis: {}", e)))
    }

    async fn get_from_redis(&self, key: &str) -> BotResult<Option<String>> {
        let mut conn = self.get_redis_connection().await?;

        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| cache_error(&format!("Failed to read key {}: {}", key, e)))?;

        Ok(value)
    }

    async fn set_in_redis(&self, key: &str, value: &str, ttl_secs: u64) -> BotResult<()> {
        let mut conn = self.get_redis_connection().await?;

        () = conn
            .set_ex(key, value, ttl_secs)
            .await
            .map_err(|e| cache_error(&format!("Failed to write key {}: {}", key, e)))?;

        Ok(())
    }

    async fn set_in_redis_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> BotResult<bool> {
        let mut conn = self.get_redis_connection().await?;

        let options = SetOptions::default()
            .conditional_set(ExistenceCheck::NX)
            .with_expiration(SetExpiry::EX(ttl_secs));

        let outcome: Option<String> = conn
            .set_options(key, value, options)
            .await
            .map_err(|e| cache_error(&format!("Failed to write key {}: {}", key, e)))?;

        Ok(outcome.is_some())
    }
}
