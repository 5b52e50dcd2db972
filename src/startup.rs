use crate::components::cache_service::CacheActor;
use crate::components::http_api::HttpApi;
use crate::components::meeting_dispatch::{DispatchCycle, DispatchHandle, MeetingDispatch};
use crate::components::ComponentManager;
use crate::config::Config;
use crate::error::Error;
use crate::providers::{
    BotApiClient, CalendarApiClient, PostgresRepository, SlackMessenger,
};
use crate::shutdown;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub async fn load_config() -> miette::Result<Arc<RwLock<Config>>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(RwLock::new(config))),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Wire the collaborators, start all components, and block until shutdown
pub async fn start_service(config: Arc<RwLock<Config>>) -> miette::Result<()> {
    let config_snapshot = {
        let config_read = config.read().await;
        config_read.clone()
    };

    // Start the cache actor
    let (mut cache_actor, cache_handle) =
        CacheActor::new(Arc::clone(&config), &config_snapshot.redis_url)
            .map_err(miette::Report::from)?;
    tokio::spawn(async move {
        cache_actor.run().await;
    });

    // External collaborators
    let repository = PostgresRepository::connect(&config_snapshot.database_url)
        .await
        .map_err(miette::Report::from)?;
    let calendar = CalendarApiClient::new(
        config_snapshot.calendar_api_key.clone(),
        config_snapshot.calendar_api_uri.clone(),
    );
    let bot_provider = BotApiClient::new(
        config_snapshot.bot_api_base.clone(),
        config_snapshot.bot_api_key.clone(),
    );
    let messenger = SlackMessenger::new(config_snapshot.slack_bot_token.clone());

    // The dispatch cycle and its actor
    let cycle = DispatchCycle::new(
        Arc::new(repository),
        Arc::new(calendar),
        Arc::new(bot_provider),
        Arc::new(messenger),
        Arc::new(cache_handle.clone()),
    );
    let dispatch_handle = DispatchHandle::new(
        cycle,
        Duration::from_secs(config_snapshot.cycle_deadline_secs),
    );

    // Register components
    let mut component_manager = ComponentManager::new(Arc::clone(&config));
    component_manager.register(MeetingDispatch::new(dispatch_handle.clone()));
    component_manager.register(HttpApi::new(dispatch_handle.clone()));
    let component_manager = Arc::new(component_manager);

    // Create shutdown channel and spawn the signal handler task
    let (shutdown_send, shutdown_recv) = oneshot::channel();
    let shutdown_components = Arc::clone(&component_manager);
    let shutdown_cache = cache_handle.clone();
    tokio::spawn(async move {
        shutdown::handle_signals(shutdown_send, shutdown_components, shutdown_cache).await;
    });

    // Initialize components
    component_manager
        .init_all(cache_handle)
        .await
        .map_err(miette::Report::from)?;

    info!("meetscribe started");

    // Block until a termination signal arrives
    let _ = shutdown_recv.await;
    info!("Received shutdown signal, exiting");

    Ok(())
}
