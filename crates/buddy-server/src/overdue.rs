use std::time::Duration;
use tracing::{info, warn};

use buddy_api::auth::AppState;
use buddy_api::requests::run_overdue_sweep;

/// Background task that flips past-due requests to overdue.
///
/// Runs on an interval so overdue items surface even when no client is
/// active. The mark-overdue endpoint stays available for on-demand sweeps.
pub async fn run_sweep_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(sweep_period(interval_secs));

    loop {
        interval.tick().await;

        let db = state.clone();
        let result = tokio::task::spawn_blocking(move || run_overdue_sweep(&db)).await;

        match result {
            Ok(Ok(count)) => {
                if count > 0 {
                    info!("Overdue sweep: flipped {} requests", count);
                }
            }
            Ok(Err(e)) => {
                warn!("Overdue sweep error: {}", e);
            }
            Err(e) => {
                warn!("Overdue sweep join error: {}", e);
            }
        }
    }
}

/// A zero-second interval would panic in `tokio::time::interval`.
fn sweep_period(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_clamped_to_one_second() {
        assert_eq!(sweep_period(0), Duration::from_secs(1));
        assert_eq!(sweep_period(300), Duration::from_secs(300));
    }
}
