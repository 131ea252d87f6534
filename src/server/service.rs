use crate::protocol::{now_nanos, Message};
use crate::server::config::{ServerConfig, ServerMode};
use crate::server::echo;
use crate::server::monitor::{ServerCounters, ServerMonitor};
use crate::server::push::PushEngine;
use crate::server::registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};
use anyhow::{Context, Result};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};
use tracing::{debug, error, info, warn};

const WS_PATH: &str = "/ws";
const HEALTH_PROBE: &[u8] = b"GET /health";
const HEALTH_BODY: &str = r#"{"status":"ok"}"#;

/// Outbound frames queued per connection before sends fail over to drops.
const OUTBOUND_QUEUE_DEPTH: usize = 64;

type WsSink = SplitSink<WebSocketStream<TcpStream>, WsMessage>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// The WebSocket server: accepts upgrades on `/ws`, answers `/health`, and
/// runs the mode's traffic engine.
pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    registry: Arc<ConnectionRegistry>,
    counters: Arc<ServerCounters>,
    shutdown_tx: watch::Sender<bool>,
}

impl Server {
    /// Bind the listen socket. No traffic flows until [`Server::run`].
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let addr = format!("0.0.0.0:{}", config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            listener,
            registry: Arc::new(ConnectionRegistry::new()),
            counters: Arc::new(ServerCounters::new()),
            shutdown_tx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().context("no local address")
    }

    /// Accept connections until the process is interrupted.
    pub async fn run(self) -> Result<()> {
        let Server {
            config,
            listener,
            registry,
            counters,
            shutdown_tx,
        } = self;

        info!(
            address = %listener.local_addr().context("no local address")?,
            mode = ?config.mode,
            "Server listening"
        );

        if let ServerMode::Push = config.mode {
            let engine = Arc::new(PushEngine::new(
                Arc::clone(&registry),
                Arc::clone(&counters),
                config.event_interval(),
                config.payload_size,
            ));
            engine.start(shutdown_tx.subscribe());
        }
        ServerMonitor::new(Arc::clone(&counters), config.update_interval)
            .start(shutdown_tx.subscribe());

        let mode = config.mode;
        let accept_loop = async {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        let registry = Arc::clone(&registry);
                        let counters = Arc::clone(&counters);
                        tokio::spawn(async move {
                            if let Err(e) =
                                serve_connection(stream, peer, mode, registry, counters).await
                            {
                                debug!(peer = %peer, error = %e, "Connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        counters.increment_error();
                        error!(error = %e, "Failed to accept connection");
                    }
                }
            }
        };

        tokio::select! {
            _ = accept_loop => Ok(()),
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                let _ = shutdown_tx.send(true);
                Ok(())
            }
        }
    }
}

/// Handle one accepted socket: health probe, upgrade, then the mode's read
/// loop. Any failure here tears down this connection only.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    mode: ServerMode,
    registry: Arc<ConnectionRegistry>,
    counters: Arc<ServerCounters>,
) -> Result<()> {
    let _ = stream.set_nodelay(true);

    // A single peek is enough in practice: the request line arrives in the
    // first segment for both health probes and upgrade requests.
    let mut probe = [0u8; 16];
    let n = stream.peek(&mut probe).await?;
    if n >= HEALTH_PROBE.len() && &probe[..HEALTH_PROBE.len()] == HEALTH_PROBE {
        return serve_health(stream, peer).await;
    }

    let ws = accept_hdr_async(stream, |request: &Request, response: Response| {
        if request.uri().path() == WS_PATH {
            Ok(response)
        } else {
            let mut not_found = ErrorResponse::new(Some("not found".to_string()));
            *not_found.status_mut() = StatusCode::NOT_FOUND;
            Err(not_found)
        }
    })
    .await
    .context("websocket handshake failed")?;

    let (sink, source) = ws.split();
    let (sender, outbound) = mpsc::channel::<WsMessage>(OUTBOUND_QUEUE_DEPTH);

    let id = registry.allocate_id();
    registry.register(ConnectionHandle {
        id,
        peer,
        sender: sender.clone(),
    });
    counters.connection_opened();
    info!(connection = id, peer = %peer, "Client connected");

    let writer = tokio::spawn(write_loop(
        sink,
        outbound,
        id,
        Arc::clone(&registry),
        Arc::clone(&counters),
    ));

    // The read-loop strategy is picked once from the mode fixed at startup.
    match mode {
        ServerMode::Rtt => read_loop_rtt(source, sender.clone(), id, Arc::clone(&counters)).await,
        ServerMode::Push => read_loop_push(source, id, Arc::clone(&counters)).await,
    }

    registry.unregister(id);
    counters.connection_closed();
    // The writer exits once every sender clone is gone; the registry entry
    // and the local handle are the last ones.
    drop(sender);
    let _ = writer.await;
    info!(connection = id, peer = %peer, "Client disconnected");
    Ok(())
}

/// Plain HTTP health check on the shared port.
async fn serve_health(mut stream: TcpStream, peer: SocketAddr) -> Result<()> {
    debug!(peer = %peer, "Health check");
    let mut request = [0u8; 512];
    let _ = stream.read(&mut request).await;
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        HEALTH_BODY.len(),
        HEALTH_BODY
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Single writer per connection: every outbound frame for this socket funnels
/// through here, so producers never interleave partial frames.
async fn write_loop(
    mut sink: WsSink,
    mut outbound: mpsc::Receiver<WsMessage>,
    id: ConnectionId,
    registry: Arc<ConnectionRegistry>,
    counters: Arc<ServerCounters>,
) {
    while let Some(message) = outbound.recv().await {
        if let Err(e) = sink.send(message).await {
            counters.increment_error();
            warn!(connection = id, error = %e, "Write failed");
            registry.unregister(id);
            break;
        }
    }
    let _ = sink.close().await;
    debug!(connection = id, "Writer exited");
}

/// RTT mode: each inbound request is answered independently of other
/// in-flight requests; responses go only to the originating connection.
async fn read_loop_rtt(
    mut source: WsSource,
    sender: mpsc::Sender<WsMessage>,
    id: ConnectionId,
    counters: Arc<ServerCounters>,
) {
    while let Some(frame) = source.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => {
                counters.increment_received();
                let sender = sender.clone();
                let counters = Arc::clone(&counters);
                tokio::spawn(handle_request(text.into_bytes(), sender, id, counters));
            }
            Ok(WsMessage::Binary(data)) => {
                counters.increment_received();
                let sender = sender.clone();
                let counters = Arc::clone(&counters);
                tokio::spawn(handle_request(data, sender, id, counters));
            }
            Ok(WsMessage::Close(_)) => {
                debug!(connection = id, "Close frame received");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                counters.increment_error();
                warn!(connection = id, error = %e, "Read failed");
                break;
            }
        }
    }
}

/// Push mode: clients send nothing meaningful; drain inbound frames until the
/// connection closes so transport-level messages keep flowing.
async fn read_loop_push(mut source: WsSource, id: ConnectionId, counters: Arc<ServerCounters>) {
    while let Some(frame) = source.next().await {
        match frame {
            Ok(WsMessage::Close(_)) => {
                debug!(connection = id, "Close frame received");
                break;
            }
            Ok(_) => debug!(connection = id, "Ignoring inbound frame in push mode"),
            Err(e) => {
                counters.increment_error();
                warn!(connection = id, error = %e, "Read failed");
                break;
            }
        }
    }
}

/// Echo one request. A malformed or unexpected frame is logged and dropped;
/// the connection stays open.
async fn handle_request(
    data: Vec<u8>,
    sender: mpsc::Sender<WsMessage>,
    id: ConnectionId,
    counters: Arc<ServerCounters>,
) {
    let message = match Message::decode(&data) {
        Ok(message) => message,
        Err(e) => {
            counters.increment_error();
            warn!(connection = id, error = %e, "Dropping malformed frame");
            return;
        }
    };
    let processing_ts = now_nanos();

    let request = match message {
        Message::Request(request) => request,
        _ => {
            warn!(connection = id, "Dropping non-request frame");
            return;
        }
    };
    debug!(connection = id, sequence = request.sequence, "Request received");

    let frame = match echo::encode_response(request, processing_ts) {
        Ok(frame) => frame,
        Err(e) => {
            counters.increment_error();
            warn!(connection = id, error = %e, "Failed to serialize response");
            return;
        }
    };

    if sender.send(WsMessage::Text(frame)).await.is_err() {
        debug!(connection = id, "Connection gone before response was queued");
        return;
    }
    counters.increment_sent();
}
