use crate::metrics::snapshot::ReplaySnapshot;
use crate::metrics::ticker::Tick;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// Outcome of one line, sent by a worker to the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayEvent {
    Hit,
    Failed,
    Filtered,
    Skipped,
}

/// Hits per second over one report interval, truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSample(pub u64);

impl fmt::Display for RateSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} req/s", self.0)
    }
}

/// Owns every counter. Workers only reach it through the event channel, so
/// the counters are mutated from a single loop.
pub struct RateReporter {
    hits: u64,
    previous_hits: u64,
    failures: u64,
    filtered: u64,
    skipped: u64,
    last_rate: u64,
    start_time: Instant,
    snapshots: Option<Arc<watch::Sender<ReplaySnapshot>>>,
}

impl Default for RateReporter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl RateReporter {
    pub fn new(snapshots: Option<Arc<watch::Sender<ReplaySnapshot>>>) -> Self {
        Self {
            hits: 0,
            previous_hits: 0,
            failures: 0,
            filtered: 0,
            skipped: 0,
            last_rate: 0,
            start_time: Instant::now(),
            snapshots,
        }
    }

    pub fn record(&mut self, event: ReplayEvent) {
        match event {
            ReplayEvent::Hit => self.hits += 1,
            ReplayEvent::Failed => self.failures += 1,
            ReplayEvent::Filtered => self.filtered += 1,
            ReplayEvent::Skipped => self.skipped += 1,
        }
    }

    /// Computes the sample for the interval that just ended and moves the
    /// baseline to the current hit count.
    pub fn tick(&mut self, tick: Tick) -> RateSample {
        let delta = self.hits - self.previous_hits;
        self.previous_hits = self.hits;
        self.last_rate = delta / tick.seconds.max(1);
        RateSample(self.last_rate)
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn snapshot(&self) -> ReplaySnapshot {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        ReplaySnapshot {
            hits: self.hits,
            failures: self.failures,
            filtered: self.filtered,
            skipped: self.skipped,
            last_rate: self.last_rate,
            requests_per_second: if elapsed > 0.0 {
                self.hits as f64 / elapsed
            } else {
                0.0
            },
            elapsed_seconds: elapsed,
        }
    }

    fn publish(&self) {
        if let Some(tx) = &self.snapshots {
            tx.send_replace(self.snapshot());
        }
    }

    /// Multiplexes events and ticks until every event sender is gone, then
    /// returns the final counts. Ticks stop arriving once the ticker observes
    /// shutdown; events still queued at that point are counted.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<ReplayEvent>,
        mut ticks: mpsc::Receiver<Tick>,
    ) -> ReplaySnapshot {
        let mut ticking = true;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.record(event),
                    None => break,
                },
                tick = ticks.recv(), if ticking => match tick {
                    Some(tick) => {
                        let sample = self.tick(tick);
                        log::info!("{}", sample);
                        self.publish();
                    }
                    None => ticking = false,
                },
            }
        }

        self.publish();
        log::debug!("Reporter stopped after {} hits", self.hits);
        self.snapshot()
    }
}
