//! Server monitoring and periodic status reporting

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Frame and connection counters shared across server tasks.
///
/// Counters are atomics so the hot paths never take a lock; the monitor task
/// reads them on an interval.
pub struct ServerCounters {
    connections: AtomicU64,
    frames_received: AtomicU64,
    frames_sent: AtomicU64,
    errors: AtomicU64,
}

impl ServerCounters {
    pub fn new() -> Self {
        Self {
            connections: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn connection_opened(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn connection_closed(&self) {
        self.connections.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            connections: self.connections.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for ServerCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time counter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub connections: u64,
    pub frames_received: u64,
    pub frames_sent: u64,
    pub errors: u64,
}

/// Periodically logs counter deltas. Idle intervals are logged at debug only
/// so a quiet server does not flood the log.
pub struct ServerMonitor {
    counters: Arc<ServerCounters>,
    interval: Duration,
}

impl ServerMonitor {
    pub fn new(counters: Arc<ServerCounters>, update_interval_ms: u64) -> Self {
        Self {
            counters,
            interval: Duration::from_millis(update_interval_ms),
        }
    }

    /// Spawn the status task. Runs until the shutdown signal flips or its
    /// sender is dropped.
    pub fn start(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.tick().await;
            let mut last = self.counters.snapshot();
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let current = self.counters.snapshot();
                        let sent = current.frames_sent - last.frames_sent;
                        let received = current.frames_received - last.frames_received;
                        if sent > 0 || received > 0 {
                            info!(
                                connections = current.connections,
                                sent = sent,
                                received = received,
                                errors = current.errors,
                                "Server status"
                            );
                        } else {
                            debug!(connections = current.connections, "Server idle");
                        }
                        last = current;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Monitor stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let counters = ServerCounters::new();
        counters.connection_opened();
        counters.increment_received();
        counters.increment_sent();
        counters.increment_sent();
        counters.increment_error();

        let snap = counters.snapshot();
        assert_eq!(snap.connections, 1);
        assert_eq!(snap.frames_received, 1);
        assert_eq!(snap.frames_sent, 2);
        assert_eq!(snap.errors, 1);

        counters.connection_closed();
        assert_eq!(counters.snapshot().connections, 0);
    }

    #[tokio::test]
    async fn test_monitor_stops_on_shutdown() {
        let counters = Arc::new(ServerCounters::new());
        let monitor = ServerMonitor::new(Arc::clone(&counters), 10);
        let (tx, rx) = watch::channel(false);
        let handle = monitor.start(rx);
        tx.send(true).expect("monitor receiver alive");
        handle.await.expect("monitor task panicked");
    }
}
