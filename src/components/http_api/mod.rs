use crate::components::cache_service::CacheActorHandle;
use crate::components::meeting_dispatch::DispatchHandle;
use crate::config::Config;
use crate::error::BotResult;
use async_trait::async_trait;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Health endpoint plus the manual "run one dispatch cycle now" trigger
pub struct HttpApi {
    handle: DispatchHandle,
}

impl HttpApi {
    pub fn new(handle: DispatchHandle) -> Self {
        Self { handle }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/cron/run", post(run_cycle))
            .with_state(self.handle.clone())
    }
}

/// Generic health route to sanity check the service
async fn health() -> &'static str {
    "ok"
}

/// Trigger one dispatch cycle. Returns only overall success; failure detail
/// lives in the logs. Concurrent calls queue behind the running cycle.
async fn run_cycle(State(handle): State<DispatchHandle>) -> Json<Value> {
    match handle.run_cycle_now().await {
        Ok(success) => Json(json!({ "success": success })),
        Err(e) => {
            error!("Manual cycle trigger failed: {}", e);
            Json(json!({ "success": false }))
        }
    }
}

#[async_trait]
impl super::Component for HttpApi {
    fn name(&self) -> &'static str {
        "http_api"
    }

    async fn init(
        &self,
        config: Arc<RwLock<Config>>,
        _cache_handle: CacheActorHandle,
    ) -> BotResult<()> {
        let listen_addr = {
            let config_read = config.read().await;
            config_read.http_listen_addr.clone()
        };

        let router = self.router();

        tokio::spawn(async move {
            let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
                Ok(listener) => listener,
                Err(e) => {
                    error!("Failed to bind HTTP listener on {}: {}", listen_addr, e);
                    return;
                }
            };

            info!("HTTP API listening on {}", listen_addr);
            if let Err(e) = axum::serve(listener, router).await {
                error!("HTTP server error: {}", e);
            }
        });

        Ok(())
    }

    async fn shutdown(&self) -> BotResult<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
