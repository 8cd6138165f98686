use crate::config::ReplayConfig;
use crate::extract::{FilterSet, LineDecision, classify};
use crate::metrics::ReplayEvent;
use crate::queue::LineReceiver;
use crate::requester::Requester;
use crate::shutdown::ShutdownSignal;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct Worker<R> {
    id: usize,
    requester: R,
    config: Arc<ReplayConfig>,
    filters: Arc<FilterSet>,
    lines: LineReceiver,
    events: mpsc::Sender<ReplayEvent>,
    shutdown: ShutdownSignal,
}

impl<R: Requester> Worker<R> {
    pub fn new(
        id: usize,
        requester: R,
        config: Arc<ReplayConfig>,
        filters: Arc<FilterSet>,
        lines: LineReceiver,
        events: mpsc::Sender<ReplayEvent>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            id,
            requester,
            config,
            filters,
            lines,
            events,
            shutdown,
        }
    }

    /// Takes lines until the queue is closed and drained or shutdown is
    /// raised. A request already in flight always completes first. Returns
    /// the number of lines this worker handled.
    pub async fn run(mut self) -> u64 {
        log::debug!("[worker {}] started", self.id);
        let mut handled = 0;

        loop {
            let line = tokio::select! {
                biased;
                _ = self.shutdown.wait() => break,
                line = self.lines.recv() => match line {
                    Some(line) => line,
                    None => break,
                },
            };

            let event = self.process_line(&line).await;
            handled += 1;
            if self.events.send(event).await.is_err() {
                log::debug!("[worker {}] reporter gone", self.id);
                break;
            }
        }

        log::debug!("[worker {}] stopped after {} lines", self.id, handled);
        handled
    }

    pub async fn process_line(&self, line: &str) -> ReplayEvent {
        let path = match classify(line, &self.filters) {
            LineDecision::Replay(path) => path,
            LineDecision::Filtered(_) => return ReplayEvent::Filtered,
            LineDecision::Skipped => return ReplayEvent::Skipped,
        };

        let url = format!("{}{}", self.config.base_url, path);
        if self.config.verbose {
            log::info!("URL {}", url);
        }

        match self.requester.get(&url).await {
            Ok(()) => ReplayEvent::Hit,
            Err(e) => {
                if !self.config.suppress_errors {
                    log::warn!("[worker {}] {}", self.id, e);
                }
                ReplayEvent::Failed
            }
        }
    }
}
