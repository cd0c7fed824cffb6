use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use guestchat_api::presence::PresenceTracker;

/// Background task that reaps expired presence entries.
///
/// Runs on an interval until `shutdown` is cancelled, so online counts never
/// have to clean up on the read path.
pub async fn run_sweep_loop(tracker: PresenceTracker, every: Duration, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Presence sweep stopped");
                return;
            }
            _ = interval.tick() => {}
        }

        let reaper = tracker.clone();
        match tokio::task::spawn_blocking(move || reaper.reap()).await {
            Ok(Ok(count)) => {
                if count > 0 {
                    info!("Sweep: reaped {} expired sessions", count);
                }
            }
            Ok(Err(e)) => warn!("Sweep error: {}", e),
            Err(e) => warn!("Sweep task failed: {}", e),
        }
    }
}
