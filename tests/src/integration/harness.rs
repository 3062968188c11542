//! Test fixtures: a seeded node on a loopback port plus clients for it.

use futures_util::{SinkExt, StreamExt};
use node_runtime::{NodeConfig, NodeRuntime};
use rp_03_client::{ClientConfig, ClientEvent, CorrelationClient, WsConnector};
use shared_types::{AccountId, ReceiptId, Response};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub const WAIT: Duration = Duration::from_secs(5);

pub fn account(raw: &str) -> AccountId {
    AccountId::parse(raw).unwrap()
}

pub fn receipt(raw: i64) -> ReceiptId {
    ReceiptId::new(raw).unwrap()
}

/// Seeded node listening on 127.0.0.1 with an ephemeral port.
pub struct TestNode {
    pub runtime: NodeRuntime,
    pub addr: SocketAddr,
}

impl TestNode {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(tweak: impl FnOnce(&mut NodeConfig)) -> Self {
        let mut config = NodeConfig::default();
        config.gateway.websocket.host = "127.0.0.1".parse().unwrap();
        config.gateway.websocket.port = 0;
        tweak(&mut config);

        let mut runtime = NodeRuntime::new(config).unwrap();
        let addr = runtime.start().await.unwrap();
        Self { runtime, addr }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Connected client whose welcome frame has already arrived, so the
    /// server has registered it.
    pub async fn client(&self) -> TestClient {
        let client = CorrelationClient::new(ClientConfig::with_url(self.url()), WsConnector).unwrap();
        let mut events = client.subscribe();
        client.connect().await.unwrap();
        let welcome = next_server_event(&mut events, "connection_established").await;
        assert!(welcome.data.unwrap()["clientId"].is_string());
        TestClient { client, events }
    }

    /// Bare WebSocket for sending frames the client would never produce.
    pub async fn raw(&self) -> RawSocket {
        let (stream, _) = connect_async(self.url()).await.unwrap();
        let mut socket = RawSocket { stream };
        let welcome = socket.next_response().await;
        assert_eq!(welcome.message_type, "connection_established");
        socket
    }

    pub async fn shutdown(mut self) {
        self.runtime.shutdown().await;
    }
}

pub struct TestClient {
    pub client: CorrelationClient<WsConnector>,
    pub events: broadcast::Receiver<ClientEvent>,
}

impl TestClient {
    /// Server events received so far, without waiting.
    pub fn drain_server_events(&mut self) -> Vec<Response> {
        let mut seen = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if let ClientEvent::Server(response) = event {
                seen.push(response);
            }
        }
        seen
    }
}

/// Wait for a server event of `message_type`, skipping everything else.
pub async fn next_server_event(
    events: &mut broadcast::Receiver<ClientEvent>,
    message_type: &str,
) -> Response {
    timeout(WAIT, async {
        loop {
            match events.recv().await.unwrap() {
                ClientEvent::Server(response) if response.message_type == message_type => {
                    return response
                }
                _ => continue,
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {message_type} event within {WAIT:?}"))
}

pub struct RawSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RawSocket {
    pub async fn send(&mut self, text: &str) {
        self.stream.send(Message::text(text)).await.unwrap();
    }

    pub async fn send_binary(&mut self, data: Vec<u8>) {
        self.stream.send(Message::binary(data)).await.unwrap();
    }

    /// Wait until the server closes the socket. Text frames are an error.
    pub async fn expect_closed(&mut self) {
        timeout(WAIT, async {
            loop {
                match self.stream.next().await {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
                    Some(Ok(Message::Text(text))) => panic!("unexpected frame: {text}"),
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await
        .expect("socket still open")
    }

    /// Next text frame decoded as a response. Control frames are skipped.
    pub async fn next_response(&mut self) -> Response {
        timeout(WAIT, async {
            loop {
                match self.stream.next().await.unwrap().unwrap() {
                    Message::Text(text) => return Response::decode(text.as_str()).unwrap(),
                    Message::Close(frame) => panic!("socket closed: {frame:?}"),
                    _ => continue,
                }
            }
        })
        .await
        .expect("no frame received")
    }
}
