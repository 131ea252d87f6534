use crate::client::config::ClientConfig;
use crate::client::constants::{DRAIN_TIMEOUT_MS, REPORT_INTERVAL_SECS, SAMPLE_LOG_EVERY};
use crate::client::error::Result;
use crate::client::progress::ProgressTracker;
use crate::client::reporter::Reporter;
use crate::client::socket::{self, WsStream};
use crate::client::statistics::{LatencyStats, StatisticsCalculator};
use crate::protocol::{now_nanos, Message};
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{interval_at, sleep_until, timeout, Instant};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

/// Aggregate results of a completed broadcast-consumption run.
pub struct PushOutcome {
    pub latency: LatencyStats,
    /// Broadcast events received (including warm-up)
    pub received: usize,
    /// Warm-up samples excluded from the working set
    pub skipped: usize,
}

/// Push-mode client: passively consumes broadcast events and measures
/// one-way latency from the embedded server timestamp.
pub struct PushClient {
    config: ClientConfig,
    stats: Arc<Mutex<StatisticsCalculator>>,
}

impl PushClient {
    pub fn new(config: ClientConfig) -> Self {
        let prewarm = config.prewarm_count;
        Self {
            config,
            stats: Arc::new(Mutex::new(StatisticsCalculator::new(prewarm))),
        }
    }

    /// Run the measurement to completion and return the final aggregates.
    pub async fn run(self) -> Result<PushOutcome> {
        let ws = socket::connect(&self.config.server, self.config.insecure).await?;
        info!(
            server = %self.config.server,
            continuous = self.config.continuous,
            "Broadcast measurement started"
        );

        let (mut sink, source) = ws.split();
        let mut listener = tokio::spawn(listen(source, Arc::clone(&self.stats)));

        let now = Instant::now();
        let report_interval = Duration::from_secs(REPORT_INTERVAL_SECS);
        let mut report = interval_at(now + report_interval, report_interval);
        let mut progress_tick = interval_at(now + Duration::from_secs(1), Duration::from_secs(1));

        let deadline = (!self.config.continuous).then(|| now + self.config.test_duration());
        let deadline_wait = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => futures_util::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline_wait);
        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);

        let progress = if self.config.continuous {
            ProgressTracker::continuous(self.config.quiet)
        } else {
            ProgressTracker::for_duration(self.config.duration, self.config.quiet)
        };
        let reporter = Reporter;
        let started = Instant::now();

        let drain = loop {
            tokio::select! {
                _ = report.tick() => {
                    let latency = self.stats.lock().unwrap().calculate();
                    progress.suspend(|| reporter.print_interim("one-way", &latency));
                }
                _ = progress_tick.tick() => {
                    progress.set_elapsed(started.elapsed().as_secs());
                    let received = self.stats.lock().unwrap().processed_count();
                    progress.set_message(format!("{} received", received));
                }
                _ = &mut deadline_wait => {
                    info!(seconds = self.config.duration, "Test duration completed");
                    break true;
                }
                _ = &mut interrupt => {
                    info!("Interrupt received, closing connection");
                    break true;
                }
                _ = &mut listener => {
                    warn!("Connection closed by server");
                    break false;
                }
            }
        };

        if drain {
            debug!("Draining in-flight events");
            if let Err(e) = sink.send(WsMessage::Close(None)).await {
                debug!(error = %e, "Close frame failed");
            }
            let window = Duration::from_millis(DRAIN_TIMEOUT_MS);
            if timeout(window, &mut listener).await.is_err() {
                debug!("Drain window elapsed");
                listener.abort();
            }
        }
        progress.finish();

        let outcome = {
            let calc = self.stats.lock().unwrap();
            PushOutcome {
                latency: calc.calculate(),
                received: calc.processed_count(),
                skipped: calc.skipped_count(),
            }
        };
        info!(received = outcome.received, "Broadcast measurement finished");
        Ok(outcome)
    }
}

/// Listener: one-way latency per broadcast event, fed to a single engine.
async fn listen(mut source: SplitStream<WsStream>, stats: Arc<Mutex<StatisticsCalculator>>) {
    while let Some(frame) = source.next().await {
        let data = match frame {
            Ok(WsMessage::Text(text)) => text.into_bytes(),
            Ok(WsMessage::Binary(data)) => data,
            Ok(WsMessage::Close(_)) => {
                debug!("Close frame received");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "Read failed");
                break;
            }
        };

        let receive_ts = now_nanos();

        let event = match Message::decode(&data) {
            Ok(Message::Event(event)) => event,
            Ok(_) => {
                debug!("Ignoring non-event frame");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                continue;
            }
        };

        let one_way = receive_ts - event.timestamp;
        let (added, samples) = {
            let mut calc = stats.lock().unwrap();
            (calc.add_sample(one_way), calc.sample_count())
        };
        if added && samples % SAMPLE_LOG_EVERY == 0 {
            debug!(samples = samples, "Events received after warm-up");
        }
    }
    debug!("Listener exited");
}
