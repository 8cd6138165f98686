use crate::config::ReplayConfig;
use crate::error::{Error, Result};
use crate::extract::FilterSet;
use crate::metrics::snapshot::ReplaySnapshot;
use crate::metrics::{RateReporter, ticker};
use crate::pump::{self, LogSource, PumpOutcome};
use crate::queue;
use crate::requester::{HttpRequester, Requester};
use crate::shutdown::Shutdown;
use crate::worker::Worker;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use validator::Validate;

const EVENT_BUFFER: usize = 1024;

pub struct ReplayEngine {
    config: Arc<ReplayConfig>,
    shutdown: Shutdown,
    snapshots: Arc<watch::Sender<ReplaySnapshot>>,
}

impl ReplayEngine {
    pub fn new(config: Arc<ReplayConfig>) -> Self {
        let (snapshots, _) = watch::channel(ReplaySnapshot::default());
        Self {
            config,
            shutdown: Shutdown::new(),
            snapshots: Arc::new(snapshots),
        }
    }

    /// Handle for stopping a run from outside, e.g. on Ctrl-C.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Updated on every report tick and once more when the run ends.
    pub fn watch_metrics(&self) -> watch::Receiver<ReplaySnapshot> {
        self.snapshots.subscribe()
    }

    /// Replays the configured log with one HTTP session per worker.
    pub async fn run(&self) -> Result<ReplaySnapshot> {
        let config = self.config.clone();
        self.run_with(move |id| HttpRequester::new(id, &config)).await
    }

    pub async fn run_with<R, F>(&self, factory: F) -> Result<ReplaySnapshot>
    where
        R: Requester + 'static,
        F: Fn(usize) -> Result<R>,
    {
        let config = self.config.clone();
        config.validate().map_err(Error::Validation)?;
        let source = LogSource::open(&config.log_file).await?;
        let requesters = (0..config.concurrency)
            .map(&factory)
            .collect::<Result<Vec<_>>>()?;

        let (lines_tx, lines_rx) = queue::channel(config.queue_size);
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let filters = Arc::new(FilterSet::new(config.filters.iter().cloned()));

        let (ticks, ticker) = ticker::spawn(config.report_period(), self.shutdown.subscribe());
        let reporter = tokio::spawn(
            RateReporter::new(Some(self.snapshots.clone())).run(events_rx, ticks),
        );

        let workers: Vec<_> = requesters
            .into_iter()
            .enumerate()
            .map(|(id, requester)| {
                let worker = Worker::new(
                    id,
                    requester,
                    config.clone(),
                    filters.clone(),
                    lines_rx.clone(),
                    events_tx.clone(),
                    self.shutdown.subscribe(),
                );
                tokio::spawn(worker.run())
            })
            .collect();
        drop(events_tx);
        drop(lines_rx);

        let pumped = pump::run(source, config.repeat, lines_tx, self.shutdown.subscribe()).await;
        match &pumped {
            Ok(PumpOutcome::Finished { lines, passes }) => {
                log::debug!("Pump finished: {} lines in {} pass(es)", lines, passes)
            }
            Ok(PumpOutcome::Interrupted { lines, .. }) => {
                log::info!("Replay interrupted after {} lines", lines)
            }
            Err(e) => log::error!("Reading log source failed: {}", e),
        }

        // The queue is closed now; workers drain it and exit.
        let mut worker_failure = None;
        for joined in join_all(workers).await {
            if let Err(e) = joined {
                worker_failure.get_or_insert(Error::Internal(format!("worker task failed: {}", e)));
            }
        }
        log::debug!("All workers stopped");

        self.shutdown.trigger();
        ticker
            .await
            .map_err(|e| Error::Internal(format!("ticker task failed: {}", e)))?;
        let snapshot = reporter
            .await
            .map_err(|e| Error::Internal(format!("reporter task failed: {}", e)))?;

        pumped?;
        if let Some(e) = worker_failure {
            return Err(e);
        }
        Ok(snapshot)
    }
}
