//! Websocket transport for one exchange.
//!
//! Opens the connection, writes the request body exactly once from a
//! spawned task (the write never blocks the event-delivery path), and
//! converts inbound frames into typed [`TransportEvent`]s on an mpsc
//! channel. Dropping the receiver tears the connection down: the next
//! inbound frame fails to deliver and both halves are dropped.

use futures_util::{SinkExt, StreamExt};
use log::{debug, info};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::error::SparkError;
use crate::protocol::StreamFrame;

/// Inbound event as seen by the session loop.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A parsed service frame.
    Frame(StreamFrame),
    /// The peer closed the connection.
    Closed,
    /// Connection-level failure, including frames that do not parse.
    Failed(String),
}

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Connect to `signed_url`, send `request_body`, and stream the inbound
/// events. Returns as soon as the handshake completes.
pub async fn open_exchange(
    signed_url: &str,
    request_body: String,
) -> Result<mpsc::Receiver<TransportEvent>, SparkError> {
    let (ws_stream, _response) = connect_async(signed_url)
        .await
        .map_err(|e| SparkError::Transport(format!("connect failed: {e}")))?;
    debug!("Websocket handshake complete");

    let (mut sink, mut stream) = ws_stream.split();
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

    // The request body goes out from its own task, once, right after the
    // connection is ready.
    let send_tx = tx.clone();
    tokio::spawn(async move {
        info!("Sending request body ({} bytes)", request_body.len());
        if let Err(e) = sink.send(Message::Text(request_body)).await {
            let _ = send_tx
                .send(TransportEvent::Failed(format!("send failed: {e}")))
                .await;
        }
    });

    tokio::spawn(async move {
        while let Some(item) = stream.next().await {
            let event = match item {
                Ok(Message::Text(text)) => match serde_json::from_str::<StreamFrame>(&text) {
                    Ok(frame) => TransportEvent::Frame(frame),
                    Err(e) => TransportEvent::Failed(format!("malformed frame: {e}")),
                },
                Ok(Message::Close(_)) => TransportEvent::Closed,
                Ok(_) => continue,
                Err(e) => TransportEvent::Failed(e.to_string()),
            };

            let stop = matches!(event, TransportEvent::Closed | TransportEvent::Failed(_));
            if tx.send(event).await.is_err() {
                // Receiver dropped: the session reached a terminal state.
                debug!("Event receiver dropped, closing connection");
                break;
            }
            if stop {
                break;
            }
        }
        debug!("Transport read loop finished");
    });

    Ok(rx)
}
