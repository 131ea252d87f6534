use crate::protocol::{generate_payload, now_nanos, BroadcastEvent, Message};
use crate::server::monitor::ServerCounters;
use crate::server::registry::ConnectionRegistry;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

/// Broadcast engine: on every timer tick, serialize one event and fan the
/// identical bytes out to every registered connection.
///
/// Each per-connection dispatch is a non-blocking enqueue onto that
/// connection's outbound queue, drained by its own writer task. A full or
/// closed queue fails only that connection's delivery.
pub struct PushEngine {
    registry: Arc<ConnectionRegistry>,
    counters: Arc<ServerCounters>,
    sequence: AtomicI64,
    interval: Duration,
    payload_size: usize,
}

impl PushEngine {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        counters: Arc<ServerCounters>,
        interval: Duration,
        payload_size: usize,
    ) -> Self {
        Self {
            registry,
            counters,
            sequence: AtomicI64::new(0),
            interval,
            payload_size,
        }
    }

    /// Spawn the broadcast timer. Runs until the shutdown signal flips or
    /// its sender is dropped; in-flight per-connection sends are not awaited.
    pub fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval_ms = self.interval.as_millis() as u64,
                payload_size = self.payload_size,
                "Broadcast engine running"
            );
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick of a tokio interval is immediate; consume it so
            // events start one full interval after startup.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.broadcast_tick(),
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Broadcast engine stopped");
        })
    }

    /// One tick: allocate the next sequence, stamp the event, serialize once
    /// and dispatch to a registry snapshot.
    fn broadcast_tick(&self) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let event = BroadcastEvent::new(
            now_nanos(),
            sequence,
            generate_payload(self.payload_size),
        );

        let frame = match Message::Event(event).encode() {
            Ok(frame) => frame,
            Err(e) => {
                self.counters.increment_error();
                warn!(error = %e, "Failed to serialize broadcast event");
                return;
            }
        };

        for connection in self.registry.snapshot() {
            match connection.sender.try_send(WsMessage::Text(frame.clone())) {
                Ok(()) => self.counters.increment_sent(),
                Err(e) => {
                    self.counters.increment_error();
                    warn!(
                        connection = connection.id,
                        error = %e,
                        "Dropping broadcast for connection"
                    );
                }
            }
        }
        debug!(sequence = sequence, "Broadcast dispatched");
    }
}
