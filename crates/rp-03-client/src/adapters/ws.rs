//! tokio-tungstenite transport.

use crate::ports::{Connector, Transport, TransportError};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

/// Opens real WebSocket connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Transport, TransportError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| TransportError(format!("failed to connect to {url}: {e}")))?;

        let (mut write, mut read) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();

        // Frame pump; ends when either side goes away. Transport pings are
        // answered by tungstenite while reading.
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    outgoing = out_rx.recv() => {
                        let Some(text) = outgoing else {
                            let _ = write.close().await;
                            break;
                        };
                        if let Err(e) = write.send(Message::text(text)).await {
                            warn!(error = %e, "WebSocket send failed");
                            break;
                        }
                    }
                    incoming = read.next() => {
                        let text = match incoming {
                            Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                            Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                                Ok(text) => text.to_owned(),
                                Err(e) => {
                                    warn!(error = %e, "non UTF-8 binary frame dropped");
                                    continue;
                                }
                            },
                            Some(Ok(Message::Close(frame))) => {
                                debug!(?frame, "server closed connection");
                                break;
                            }
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                warn!(error = %e, "WebSocket receive failed");
                                break;
                            }
                            None => break,
                        };
                        if in_tx.send(text).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Ok(Transport {
            outgoing: out_tx,
            incoming: in_rx,
        })
    }
}
