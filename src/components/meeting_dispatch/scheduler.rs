use lazy_static::lazy_static;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{sleep, Duration as TokioDuration};
use tracing::{debug, error, info, warn};

use super::handle::DispatchHandle;
use crate::config::Config;

lazy_static! {
    static ref SCHEDULER_INSTANCES: AtomicU32 = AtomicU32::new(0);
    static ref SCHEDULER_TASK_RUNNING: AtomicBool = AtomicBool::new(false);
}

/// Start the periodic dispatch scheduler
pub async fn start_scheduler(config: Arc<RwLock<Config>>, handle: DispatchHandle) {
    // Increment instance counter and log
    let instance_count = SCHEDULER_INSTANCES.fetch_add(1, Ordering::SeqCst) + 1;
    if instance_count > 1 {
        warn!(
            "Multiple dispatch schedulers detected! Instance count: {}",
            instance_count
        );
    }
    info!("Starting dispatch scheduler (instance {})", instance_count);

    let config_read = config.read().await;
    let interval_secs = config_read.cycle_interval_secs;
    let run_enabled = config_read.run_dispatch_cycle;
    drop(config_read);

    // Only spawn the scheduler task if it's not already running
    if !SCHEDULER_TASK_RUNNING.swap(true, Ordering::SeqCst) {
        info!(interval_secs, "Starting dispatch cycle task");

        tokio::spawn(async move {
            run_scheduler_loop(interval_secs, run_enabled, handle).await;
        });
    } else {
        warn!("Dispatch cycle task is already running, skipping initialization");
    }
}

/// Main scheduler loop. Each tick awaits the full cycle before sleeping
/// again, so a slow cycle delays the next tick instead of stacking up.
async fn run_scheduler_loop(interval_secs: u64, run_enabled: bool, handle: DispatchHandle) {
    loop {
        sleep(TokioDuration::from_secs(interval_secs)).await;

        if !run_enabled {
            debug!("RUN_DISPATCH_CYCLE is not enabled, skipping scheduled cycle");
            continue;
        }

        match handle.run_cycle_now().await {
            Ok(true) => {}
            Ok(false) => warn!("Scheduled dispatch cycle reported failure"),
            Err(e) => error!("Failed to run scheduled dispatch cycle: {}", e),
        }
    }
}
