use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;

/// Current wall clock in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Sleeps for `duration`, returning `true` if shutdown was requested before
/// the sleep completed. Retry loops use this so they stay cancellable
/// between attempts.
pub async fn sleep_cancellable(duration: Duration, shutdown: &watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return true;
    }
    let mut shutdown = shutdown.clone();
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = shutdown.changed() => true,
    }
}
