use std::time::Duration;

use bastion_application::JanitorService;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Runs cleanup passes on a fixed interval until the process exits.
pub fn spawn_janitor(janitor: JanitorService, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match janitor.run_once().await {
                Ok(report) => debug!(
                    swept_counters = report.swept_counters,
                    purged_revocations = report.purged_revocations,
                    "janitor pass finished"
                ),
                Err(error) => warn!(error = %error, "janitor pass failed"),
            }
        }
    })
}
