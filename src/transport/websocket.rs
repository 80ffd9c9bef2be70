use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;
use url::Url;

use crate::error::{TransportError, ValidationError};

use super::{Connection, Connector, FrameSink, FrameStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dials `ws://<host>:<port>/ws?id=<identity>`.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    base: Url,
}

impl WebSocketConnector {
    /// Builds a connector for the given server.
    ///
    /// # Errors
    ///
    /// Returns an error when the host does not form a valid URL.
    pub fn new(host: &str, port: u16) -> Result<Self, ValidationError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ValidationError::EmptyServer);
        }
        let raw = format!("ws://{}:{}/ws", host, port);
        let base = Url::parse(&raw).map_err(|err| ValidationError::InvalidTargetUrl {
            value: raw,
            source: err,
        })?;
        Ok(Self { base })
    }

    #[must_use]
    pub fn endpoint(&self, identity: &str) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut().append_pair("id", identity);
        url
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, identity: &str) -> Result<Connection, TransportError> {
        let url = self.endpoint(identity);
        let (stream, _) =
            connect_async(url.as_str())
                .await
                .map_err(|err| TransportError::Connect {
                    identity: identity.to_owned(),
                    source: Box::new(err),
                })?;
        debug!(worker = identity, url = %url, "WebSocket connected");
        let (sink, stream) = stream.split();
        Ok(Connection {
            outbound: Box::new(WsSink {
                sink,
                closed: false,
            }),
            inbound: Box::new(WsSource { stream }),
        })
    }
}

struct WsSink {
    sink: SplitSink<WsStream, Message>,
    closed: bool,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.sink
            .send(Message::Binary(frame))
            .await
            .map_err(|err| TransportError::Send {
                source: Box::new(err),
            })
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        drop(self.sink.close().await);
    }
}

struct WsSource {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl FrameStream for WsSource {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            let Some(message) = self.stream.next().await else {
                return Ok(None);
            };
            let message = message.map_err(|err| TransportError::Receive {
                source: Box::new(err),
            })?;
            match message {
                Message::Binary(data) => return Ok(Some(data)),
                Message::Text(text) => return Ok(Some(text.into_bytes())),
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }
}
