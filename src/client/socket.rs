use crate::client::error::Result;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info};

/// The client's half of the upgraded channel.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open the WebSocket channel to the server.
///
/// TCP_NODELAY is requested on the dialed socket so Nagle's algorithm does
/// not show up in the measurements. With `insecure` set, wss:// targets skip
/// certificate and hostname verification.
pub async fn connect(url: &str, insecure: bool) -> Result<WsStream> {
    debug!(url = url, insecure = insecure, "Connecting to server");

    let connector = if insecure {
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()?;
        Some(Connector::NativeTls(tls))
    } else {
        None
    };

    let (stream, response) = connect_async_tls_with_config(url, None, true, connector).await?;
    info!(url = url, status = %response.status(), "Connected to server");
    Ok(stream)
}
