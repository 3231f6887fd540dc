use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::Transport;
use crate::error::TransportError;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket client on `tokio-tungstenite`.
#[derive(Default)]
pub struct NativeTransport {
    socket: Option<Socket>,
}

impl NativeTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for NativeTransport {
    async fn open(&mut self, url: &str) -> Result<(), TransportError> {
        self.close().await;
        let (socket, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Open(e.to_string()))?;
        self.socket = Some(socket);
        Ok(())
    }

    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        let socket = self.socket.as_mut().ok_or(TransportError::NotOpen)?;
        socket
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            let socket = self.socket.as_mut()?;
            match socket.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => tracing::warn!("dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!("server closed socket: {:?}", frame);
                    self.socket = None;
                    return None;
                }
                // ping/pong are answered by tungstenite itself
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    self.socket = None;
                    return Some(Err(TransportError::Receive(e.to_string())));
                }
                None => {
                    self.socket = None;
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            if let Err(e) = socket.close(None).await {
                tracing::debug!("close handshake failed: {}", e);
            }
        }
    }
}
