//! The websocket contract the shard runs over, and its tungstenite-backed
//! production implementation.
use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::{frame::coding::CloseCode, CloseFrame};
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use glint_model::{Error, ErrorKind, Result};

/// A websocket frame, reduced to what the shard cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
    /// A close frame carrying the remote's close code, when one was sent.
    Close(Option<u16>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
}

/// One open websocket connection.
pub trait Connection: Send {
    fn send(&mut self, message: WsMessage) -> BoxFuture<'_, Result<()>>;
    /// The next inbound frame; `None` once the stream is exhausted.
    fn next(&mut self) -> BoxFuture<'_, Option<Result<WsMessage>>>;
    fn close(&mut self, code: u16) -> BoxFuture<'_, Result<()>>;
}

/// Dials websocket URLs. Production uses tungstenite; tests script the wire.
pub trait Connector: Send + Sync {
    fn connect(&self, url: String) -> BoxFuture<'_, Result<Box<dyn Connection>>>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// The production connector, dialing TLS websockets via tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    fn connect(&self, url: String) -> BoxFuture<'_, Result<Box<dyn Connection>>> {
        Box::pin(async move {
            let (stream, _) = connect_async(url).await.map_err(ws_error)?;
            Ok(Box::new(TungsteniteConnection { stream }) as Box<dyn Connection>)
        })
    }
}

struct TungsteniteConnection {
    stream: WsStream,
}

impl Connection for TungsteniteConnection {
    fn send(&mut self, message: WsMessage) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let frame = match message {
                WsMessage::Text(text) => TungsteniteMessage::Text(text),
                WsMessage::Binary(data) => TungsteniteMessage::Binary(data),
                WsMessage::Ping(data) => TungsteniteMessage::Ping(data),
                WsMessage::Pong(data) => TungsteniteMessage::Pong(data),
                WsMessage::Close(code) => TungsteniteMessage::Close(code.map(|code| CloseFrame {
                    code: CloseCode::from(code),
                    reason: "".into(),
                })),
            };
            self.stream.send(frame).await.map_err(ws_error)
        })
    }

    fn next(&mut self) -> BoxFuture<'_, Option<Result<WsMessage>>> {
        Box::pin(async move {
            let frame = self.stream.next().await?;
            Some(frame.map_err(ws_error).map(|frame| match frame {
                TungsteniteMessage::Text(text) => WsMessage::Text(text),
                TungsteniteMessage::Binary(data) => WsMessage::Binary(data),
                TungsteniteMessage::Ping(data) => WsMessage::Ping(data),
                TungsteniteMessage::Pong(data) => WsMessage::Pong(data),
                TungsteniteMessage::Close(frame) => {
                    WsMessage::Close(frame.map(|f| f.code.into()))
                }
                TungsteniteMessage::Frame(_) => WsMessage::Binary(Vec::new()),
            }))
        })
    }

    fn close(&mut self, code: u16) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.stream
                .close(Some(CloseFrame {
                    code: CloseCode::from(code),
                    reason: "".into(),
                }))
                .await
                .map_err(ws_error)
        })
    }
}

fn ws_error(err: tokio_tungstenite::tungstenite::Error) -> Error {
    use tokio_tungstenite::tungstenite::Error as E;
    let kind = match &err {
        E::Io(_) => ErrorKind::Network,
        E::ConnectionClosed | E::AlreadyClosed => ErrorKind::Websocket,
        _ => ErrorKind::Websocket,
    };
    Error::with_source(kind, err.to_string(), err)
}
