use crate::client::config::ClientConfig;
use crate::client::constants::{
    DRAIN_TIMEOUT_MS, PENDING_MAX_AGE_SECS, REPORT_INTERVAL_SECS, SAMPLE_LOG_EVERY,
};
use crate::client::error::Result;
use crate::client::pending::PendingRequests;
use crate::client::progress::ProgressTracker;
use crate::client::reporter::Reporter;
use crate::client::socket::{self, WsStream};
use crate::client::statistics::{LatencyStats, StatisticsCalculator};
use crate::protocol::{generate_payload, now_nanos, Message, RttRequest};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{interval_at, sleep_until, timeout, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

type WsSink = SplitSink<WsStream, WsMessage>;

/// Aggregate results of a completed RTT run.
pub struct RttOutcome {
    pub rtt: LatencyStats,
    pub one_way: LatencyStats,
    /// Requests written to the transport
    pub sent: u64,
    /// Responses matched against a pending entry (including warm-up)
    pub matched: usize,
    /// Warm-up samples excluded from the working sets
    pub skipped: usize,
    /// Pending entries still unanswered at termination
    pub outstanding: usize,
    /// Pending entries dropped by the stale-entry sweep
    pub evicted: usize,
}

/// Why the Active phase ended.
enum StopCause {
    /// Test duration elapsed or interrupt received; drain before terminating.
    Drain,
    /// Connection failed or closed unexpectedly; terminate directly.
    Terminate,
}

/// RTT-mode client: paces sequence-numbered requests, matches echoed
/// responses by sequence, and feeds two independent statistics engines.
pub struct RttClient {
    config: ClientConfig,
    rtt_stats: Arc<Mutex<StatisticsCalculator>>,
    one_way_stats: Arc<Mutex<StatisticsCalculator>>,
    pending: Arc<PendingRequests>,
    sequence: AtomicI64,
    evicted: AtomicU64,
}

impl RttClient {
    pub fn new(config: ClientConfig) -> Self {
        let prewarm = config.prewarm_count;
        Self {
            config,
            rtt_stats: Arc::new(Mutex::new(StatisticsCalculator::new(prewarm))),
            one_way_stats: Arc::new(Mutex::new(StatisticsCalculator::new(prewarm))),
            pending: Arc::new(PendingRequests::new()),
            sequence: AtomicI64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    /// Run the measurement to completion and return the final aggregates.
    pub async fn run(self) -> Result<RttOutcome> {
        let ws = socket::connect(&self.config.server, self.config.insecure).await?;
        info!(
            server = %self.config.server,
            rate = self.config.rate,
            payload_size = self.config.payload_size,
            continuous = self.config.continuous,
            "RTT measurement started"
        );

        let (mut sink, source) = ws.split();

        let mut listener = tokio::spawn(listen(
            source,
            Arc::clone(&self.pending),
            Arc::clone(&self.rtt_stats),
            Arc::clone(&self.one_way_stats),
        ));

        // Tickers fire after their first full interval, not immediately.
        let now = Instant::now();
        let request_interval = self.config.request_interval();
        let mut pacer = interval_at(now + request_interval, request_interval);
        pacer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let report_interval = Duration::from_secs(REPORT_INTERVAL_SECS);
        let mut report = interval_at(now + report_interval, report_interval);
        let mut progress_tick = interval_at(now + Duration::from_secs(1), Duration::from_secs(1));

        let deadline =
            (!self.config.continuous).then(|| now + self.config.test_duration());
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
        let mut sent: u64 = 0;

        let stop_cause = loop {
            tokio::select! {
                _ = pacer.tick() => {
                    match self.send_request(&mut sink).await {
                        Ok(()) => sent += 1,
                        Err(e) => {
                            warn!(error = %e, "Request send failed, aborting run");
                            break StopCause::Terminate;
                        }
                    }
                }
                _ = report.tick() => {
                    self.sweep_stale_entries();
                    let rtt = self.rtt_stats.lock().unwrap().calculate();
                    let one_way = self.one_way_stats.lock().unwrap().calculate();
                    progress.suspend(|| {
                        reporter.print_interim("rtt", &rtt);
                        reporter.print_interim("one-way", &one_way);
                    });
                }
                _ = progress_tick.tick() => {
                    progress.set_elapsed(started.elapsed().as_secs());
                    progress.set_message(format!("{} sent", sent));
                }
                _ = &mut deadline_wait => {
                    info!(seconds = self.config.duration, "Test duration completed");
                    break StopCause::Drain;
                }
                _ = &mut interrupt => {
                    info!("Interrupt received, closing connection");
                    break StopCause::Drain;
                }
                _ = &mut listener => {
                    warn!("Connection closed by server");
                    break StopCause::Terminate;
                }
            }
        };

        if let StopCause::Drain = stop_cause {
            debug!("Draining in-flight responses");
            if let Err(e) = sink.send(WsMessage::Close(None)).await {
                debug!(error = %e, "Close frame failed");
            }
            let drain = Duration::from_millis(DRAIN_TIMEOUT_MS);
            if timeout(drain, &mut listener).await.is_err() {
                debug!("Drain window elapsed with responses still in flight");
                listener.abort();
            }
        }
        progress.finish();

        // Terminated: final aggregates, computed exactly once.
        let outcome = {
            let rtt_calc = self.rtt_stats.lock().unwrap();
            let one_way_calc = self.one_way_stats.lock().unwrap();
            RttOutcome {
                rtt: rtt_calc.calculate(),
                one_way: one_way_calc.calculate(),
                sent,
                matched: rtt_calc.processed_count(),
                skipped: rtt_calc.skipped_count(),
                outstanding: self.pending.len(),
                evicted: self.evicted.load(Ordering::Relaxed) as usize,
            }
        };
        info!(
            sent = outcome.sent,
            matched = outcome.matched,
            outstanding = outcome.outstanding,
            "RTT measurement finished"
        );
        Ok(outcome)
    }

    /// Pacer tick: allocate the next sequence, record the pending entry and
    /// send one request. The timestamp is sampled at construction.
    async fn send_request(&self, sink: &mut WsSink) -> Result<()> {
        let timestamp = now_nanos();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let payload = generate_payload(self.config.payload_size);
        let request = RttRequest::new(timestamp, sequence, payload);

        self.pending.insert(sequence, timestamp);

        let frame = Message::Request(request).encode()?;
        sink.send(WsMessage::Text(frame)).await?;
        debug!(sequence = sequence, "Request sent");
        Ok(())
    }

    /// Responses that never arrive would pin their pending entries forever;
    /// sweep anything older than the stale threshold on the report tick.
    fn sweep_stale_entries(&self) {
        let max_age_ns = (PENDING_MAX_AGE_SECS * 1_000_000_000) as i64;
        let evicted = self.pending.evict_older_than(now_nanos(), max_age_ns);
        if evicted > 0 {
            self.evicted.fetch_add(evicted as u64, Ordering::Relaxed);
            warn!(evicted = evicted, "Evicted stale pending requests");
        }
    }
}

/// Listener: decode every inbound frame, match responses against the pending
/// table and feed both statistics engines. Runs until the stream ends.
async fn listen(
    mut source: SplitStream<WsStream>,
    pending: Arc<PendingRequests>,
    rtt_stats: Arc<Mutex<StatisticsCalculator>>,
    one_way_stats: Arc<Mutex<StatisticsCalculator>>,
) {
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

        // Receive time is sampled before decoding so parsing cost does not
        // inflate the measurement.
        let receive_ts = now_nanos();

        let response = match Message::decode(&data) {
            Ok(Message::Response(response)) => response,
            Ok(_) => {
                debug!("Ignoring non-response frame");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                continue;
            }
        };

        let Some(send_ts) = pending.take(response.sequence) else {
            warn!(
                sequence = response.sequence,
                "Response for unknown sequence"
            );
            continue;
        };

        let rtt = receive_ts - send_ts;
        let one_way = receive_ts - response.server_send_time;

        let (added, samples) = {
            let mut calc = rtt_stats.lock().unwrap();
            (calc.add_sample(rtt), calc.sample_count())
        };
        one_way_stats.lock().unwrap().add_sample(one_way);

        if added && samples % SAMPLE_LOG_EVERY == 0 {
            debug!(samples = samples, "Responses matched after warm-up");
        }
    }
    debug!("Listener exited");
}
