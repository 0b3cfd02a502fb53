use crate::detector::FallConfirmed;
use crate::stage::OutputCollector;
use spdlog::{info, warn};
use std::sync::Arc;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs the alert handler on its own thread so the sample path never waits on it.
///
/// Events are handed over through an unbounded channel. Dropping the dispatcher stops
/// the worker after it has drained whatever was already sent.
pub struct AlertDispatcher {
    sender: Option<Sender<FallConfirmed>>,
    running: Arc<AtomicBool>,
    delivered: Arc<AtomicU64>,
    handle: Option<thread::JoinHandle<()>>,
}

/// Cheap, cloneable handle that feeds an [`AlertDispatcher`].
#[derive(Clone)]
pub struct AlertSender {
    tx: Sender<FallConfirmed>,
}

impl AlertDispatcher {
    pub fn spawn(handler: impl FnMut(FallConfirmed) + Send + 'static) -> Self {
        let (tx, rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let delivered = Arc::new(AtomicU64::new(0));

        let handle = {
            let running = running.clone();
            let delivered = delivered.clone();
            thread::Builder::new()
                .name("fallwatch-alerts".into())
                .spawn(move || run_worker(rx, handler, running, delivered))
        };
        let handle = match handle {
            Ok(h) => Some(h),
            Err(e) => {
                warn!("[AlertDispatcher] Could not start worker: {}", e);
                None
            }
        };

        Self {
            sender: Some(tx),
            running,
            delivered,
            handle,
        }
    }

    pub fn sender(&self) -> Option<AlertSender> {
        self.sender.as_ref().map(|tx| AlertSender { tx: tx.clone() })
    }

    /// Number of events the handler has finished with.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Relaxed)
    }

    pub fn is_worker_panicked(&self) -> bool {
        match &self.handle {
            Some(h) => h.is_finished() && self.running.load(Relaxed),
            None => true,
        }
    }

    /// Stops the worker once the channel is drained and waits for it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.running.store(false, Relaxed);
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("[AlertDispatcher] Worker panicked");
            }
        }
    }
}

impl Drop for AlertDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(
    rx: Receiver<FallConfirmed>,
    mut handler: impl FnMut(FallConfirmed),
    running: Arc<AtomicBool>,
    delivered: Arc<AtomicU64>,
) {
    let mut deliver = |event: FallConfirmed| {
        info!(
            "[AlertDispatcher] Fall at {}ms in session {}",
            event.at_ms, event.session_id
        );
        handler(event);
        delivered.fetch_add(1, Relaxed);
    };

    while running.load(Relaxed) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => deliver(event),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // Senders may outlive the dispatcher; deliver what already arrived.
    while let Ok(event) = rx.try_recv() {
        deliver(event);
    }
}

impl AlertSender {
    /// Queues `event`; returns false when the dispatcher is gone.
    pub fn send(&self, event: FallConfirmed) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "[AlertDispatcher] Dropping alert at {}ms: dispatcher stopped",
                    e.0.at_ms
                );
                false
            }
        }
    }
}

impl OutputCollector<FallConfirmed> for AlertSender {
    #[inline(always)]
    fn push(&mut self, item: FallConfirmed) {
        self.send(item);
    }
}
