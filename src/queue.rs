use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Bounded hand-off from the pump to the workers.
///
/// `send` waits while the queue is full, which throttles ingestion to the
/// rate at which workers accept lines. Each line is received by exactly one
/// worker.
pub fn channel(capacity: usize) -> (LineSender, LineReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        LineSender { tx },
        LineReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

pub struct LineSender {
    tx: mpsc::Sender<String>,
}

impl LineSender {
    /// Returns the line back if every receiver is gone.
    pub async fn send(&self, line: String) -> Result<(), String> {
        self.tx.send(line).await.map_err(|e| e.0)
    }
}

#[derive(Clone)]
pub struct LineReceiver {
    rx: Arc<Mutex<mpsc::Receiver<String>>>,
}

impl LineReceiver {
    /// Next line, or `None` once the sender is dropped and the queue drained.
    pub async fn recv(&self) -> Option<String> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}
