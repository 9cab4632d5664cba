//! Polling waits for background-policy effects.

use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Poll `condition` every 25 ms until it holds or `timeout` elapses.
/// Returns whether the condition was met.
pub async fn wait_until<F>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(25)).await;
    }
}
