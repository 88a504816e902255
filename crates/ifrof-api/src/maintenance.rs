//! Periodic expiry of old searches and daily quota resets.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use ifrof_db::PgMaintenanceRepository;

/// Spawn the maintenance loop. An interval of zero disables it.
pub fn spawn_maintenance(
    maintenance: PgMaintenanceRepository,
    interval_secs: u64,
) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        info!(subsystem = "maintenance", "Maintenance loop disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = maintenance.run().await {
                error!(
                    subsystem = "maintenance",
                    error = %e,
                    "Maintenance run failed"
                );
            }
        }
    }))
}
