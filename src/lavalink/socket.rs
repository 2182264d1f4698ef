//! Lavalink WebSocket connection with automatic reconnection.
//!
//! The node pushes `ready`, `playerUpdate`, `stats` and `event` frames over
//! `/v4/websocket`. Parsed frames are forwarded to the music controller; the
//! connection is re-established with jittered exponential backoff so a node
//! restart never takes the bot down with it.

use std::time::Duration;

use backon::BackoffBuilder;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::common::error::LavalinkError;
use crate::config::types::LavalinkConfig;
use crate::lavalink::protocol::SocketMessage;

const CLIENT_NAME: &str = concat!("superintendent/", env!("CARGO_PKG_VERSION"));

/// 2s initial, 1min max, with jitter, unlimited retries.
fn socket_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(2))
        .with_max_delay(Duration::from_secs(60))
        .with_jitter()
        .without_max_times()
        .build()
}

async fn connect(
    config: &LavalinkConfig,
    user_id: u64,
) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>, LavalinkError> {
    let mut request = config.socket_url().into_client_request()?;
    let headers = request.headers_mut();
    headers.insert("Authorization", HeaderValue::from_str(&config.password)?);
    headers.insert("User-Id", HeaderValue::from_str(&user_id.to_string())?);
    headers.insert("Client-Name", HeaderValue::from_static(CLIENT_NAME));

    let (stream, _response) = connect_async(request).await?;
    Ok(stream)
}

/// Run the socket until the receiving side of `events_tx` is dropped.
pub async fn run(
    config: LavalinkConfig,
    user_id: u64,
    events_tx: mpsc::UnboundedSender<SocketMessage>,
) {
    let mut backoff = socket_backoff();

    loop {
        match connect(&config, user_id).await {
            Ok(mut stream) => {
                info!(
                    "Connected to Lavalink node at {}:{}",
                    config.host, config.port
                );
                backoff = socket_backoff();

                while let Some(frame) = stream.next().await {
                    match frame {
                        Ok(Message::Text(text)) => {
                            match serde_json::from_str::<SocketMessage>(&text) {
                                Ok(message) => {
                                    if events_tx.send(message).is_err() {
                                        debug!("Lavalink event receiver dropped, stopping socket");
                                        return;
                                    }
                                }
                                Err(e) => debug!("Skipping unparsed Lavalink frame: {}", e),
                            }
                        }
                        Ok(Message::Close(close)) => {
                            warn!("Lavalink closed the socket: {:?}", close);
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!("Lavalink socket read error: {}", e);
                            break;
                        }
                    }
                }
            }
            Err(e) => error!("Failed to connect to Lavalink: {}", e),
        }

        if events_tx.is_closed() {
            return;
        }

        let delay = backoff.next().unwrap_or(Duration::from_secs(60));
        info!("Reconnecting to Lavalink in {:.1} seconds...", delay.as_secs_f64());
        tokio::time::sleep(delay).await;
    }
}
