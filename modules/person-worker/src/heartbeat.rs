//! Liveness heartbeat
//!
//! A low-frequency loop that proves the worker is alive independent of
//! message traffic. It has no data dependency on message processing and
//! is never blocked by it.

use std::time::Duration;
use tokio::sync::watch;

/// Run the heartbeat loop until the shutdown signal fires.
pub async fn run_heartbeat(interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                tracing::info!(interval_secs = interval.as_secs(), "Worker alive");
            }
        }
    }

    tracing::info!("Heartbeat stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_runs_until_shutdown() {
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_heartbeat(Duration::from_secs(5), rx));

        // Several intervals pass without the loop exiting on its own
        tokio::time::advance(Duration::from_secs(17)).await;
        assert!(!handle.is_finished());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
