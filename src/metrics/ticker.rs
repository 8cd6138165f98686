use crate::shutdown::ShutdownSignal;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub seconds: u64,
}

/// Sends a `Tick` every `period` until shutdown is raised or the receiver is
/// dropped. The first tick fires one full period after the start.
pub fn spawn(period: Duration, mut shutdown: ShutdownSignal) -> (mpsc::Receiver<Tick>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(1);
    let seconds = period.as_secs().max(1);

    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = interval.tick() => {
                    if tx.send(Tick { seconds }).await.is_err() {
                        break;
                    }
                }
            }
        }
        log::debug!("Ticker stopped");
    });

    (rx, handle)
}
