use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use wspulse::client::{socket, ClientConfig, ClientMode, PushClient, RttClient};
use wspulse::protocol::{Message, RttRequest};
use wspulse::server::{Server, ServerConfig, ServerMode};

/// Test helper: bind a server on an ephemeral port and run it in the
/// background, returning its URL and the task handle.
async fn start_test_server(
    mode: ServerMode,
    rate: u32,
) -> (String, u16, tokio::task::JoinHandle<()>) {
    let config = ServerConfig {
        port: 0,
        mode,
        rate,
        payload_size: 64,
        update_interval: 5000,
        log_level: "info".to_string(),
        log_format: "text".to_string(),
    };
    let server = Server::bind(config).await.expect("failed to bind server");
    let addr = server.local_addr().expect("no local address");
    let handle = tokio::spawn(async move {
        let _ = server.run().await;
    });
    // Give the accept loop time to start.
    sleep(Duration::from_millis(150)).await;
    (
        format!("ws://127.0.0.1:{}/ws", addr.port()),
        addr.port(),
        handle,
    )
}

fn client_config(url: String, mode: ClientMode, rate: u32, duration: u64) -> ClientConfig {
    ClientConfig {
        server: url,
        mode,
        rate,
        duration,
        payload_size: 32,
        prewarm_count: 0,
        continuous: false,
        insecure: false,
        quiet: true,
        log_level: "info".to_string(),
        log_format: "text".to_string(),
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_url, port, server) = start_test_server(ServerMode::Rtt, 10).await;

    let mut stream = TcpStream::connect(("127.0.0.1", port))
        .await
        .expect("failed to connect");
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .expect("failed to write request");

    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("failed to read response");

    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains(r#"{"status":"ok"}"#));

    server.abort();
}

#[tokio::test]
async fn test_push_broadcast_delivery() {
    // 10 events/sec for 3 seconds with one connected client: approximately
    // 30 deliveries, and a final sample count within [28, 32].
    let (url, _port, server) = start_test_server(ServerMode::Push, 10).await;

    let outcome = PushClient::new(client_config(url, ClientMode::Push, 10, 3))
        .run()
        .await
        .expect("push run failed");

    assert!(
        (28..=32).contains(&outcome.latency.count),
        "expected ~30 broadcast samples, got {}",
        outcome.latency.count
    );
    assert_eq!(outcome.received, outcome.latency.count + outcome.skipped);

    server.abort();
}

#[tokio::test]
async fn test_rtt_echo_round_trip() {
    let (url, _port, server) = start_test_server(ServerMode::Rtt, 10).await;

    let outcome = RttClient::new(client_config(url, ClientMode::Rtt, 20, 2))
        .run()
        .await
        .expect("rtt run failed");

    assert!(
        (35..=41).contains(&outcome.sent),
        "expected ~40 requests sent, got {}",
        outcome.sent
    );
    assert!(
        outcome.matched >= 30,
        "expected most responses matched, got {} of {}",
        outcome.matched,
        outcome.sent
    );
    assert!(outcome.matched as u64 <= outcome.sent);
    assert_eq!(outcome.rtt.count, outcome.matched);
    assert_eq!(outcome.one_way.count, outcome.matched);
    assert!(outcome.rtt.min >= 0, "RTT must be non-negative");
    assert!(outcome.rtt.p50 <= outcome.rtt.p99);

    server.abort();
}

#[tokio::test]
async fn test_warmup_samples_excluded_end_to_end() {
    let (url, _port, server) = start_test_server(ServerMode::Rtt, 10).await;

    let mut config = client_config(url, ClientMode::Rtt, 20, 2);
    config.prewarm_count = 10;
    let outcome = RttClient::new(config).run().await.expect("rtt run failed");

    assert_eq!(outcome.skipped, 10);
    assert_eq!(outcome.rtt.count, outcome.matched - outcome.skipped);

    server.abort();
}

#[tokio::test]
async fn test_malformed_frames_keep_connection_open() {
    let (url, _port, server) = start_test_server(ServerMode::Rtt, 10).await;

    let ws = socket::connect(&url, false).await.expect("connect failed");
    let (mut sink, mut source) = ws.split();

    // Garbage and an unknown discriminator are logged and dropped by the
    // server without closing the connection.
    sink.send(WsMessage::Text("not json at all".to_string()))
        .await
        .expect("send failed");
    sink.send(WsMessage::Text(r#"{"type":"bogus","timestamp":1}"#.to_string()))
        .await
        .expect("send failed");

    // A valid request on the same connection is still echoed.
    let request = RttRequest::new(1_000_000, 7, "ABC".to_string());
    let frame = Message::Request(request).encode().expect("encode failed");
    sink.send(WsMessage::Text(frame)).await.expect("send failed");

    let reply = timeout(Duration::from_secs(2), source.next())
        .await
        .expect("timed out waiting for response")
        .expect("stream ended")
        .expect("read failed");

    let text = match reply {
        WsMessage::Text(text) => text,
        other => panic!("expected text frame, got {:?}", other),
    };
    match Message::decode(text.as_bytes()).expect("decode failed") {
        Message::Response(response) => {
            assert_eq!(response.sequence, 7);
            assert_eq!(response.client_timestamp, 1_000_000);
            assert_eq!(response.payload, "ABC");
        }
        other => panic!("expected response, got {:?}", other),
    }

    server.abort();
}
