mod actor;
mod handle;
pub mod cycle;
pub mod dispatcher;
pub mod matcher;
pub mod models;
pub mod reminder;
mod scheduler;
pub mod window;

pub use cycle::DispatchCycle;
pub use handle::DispatchHandle;

use crate::components::cache_service::CacheActorHandle;
use crate::config::Config;
use crate::error::BotResult;
use async_trait::async_trait;
use scheduler::start_scheduler;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Meeting dispatch component: owns the cycle actor and its scheduler
pub struct MeetingDispatch {
    handle: DispatchHandle,
}

impl MeetingDispatch {
    /// Create the component around an already-wired dispatch handle
    pub fn new(handle: DispatchHandle) -> Self {
        Self { handle }
    }

    /// The trigger surface for other components
    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }
}

#[async_trait]
impl super::Component for MeetingDispatch {
    fn name(&self) -> &'static str {
        "meeting_dispatch"
    }

    async fn init(
        &self,
        config: Arc<RwLock<Config>>,
        _cache_handle: CacheActorHandle,
    ) -> BotResult<()> {
        start_scheduler(config, self.handle.clone()).await;
        Ok(())
    }

    async fn shutdown(&self) -> BotResult<()> {
        self.handle.shutdown().await
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
