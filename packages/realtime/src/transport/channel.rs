//! In-memory transport driven from the "server" side through channels.
//!
//! Each call to [`Transport::open`] consumes the next queued session:
//! [`ChannelTransport::accept`] queues one that opens and returns the sender
//! the test (or preview) pushes server frames into; dropping that sender
//! closes the socket once its queued frames are read.
//! [`ChannelTransport::refuse`] queues a failed open, and an empty queue also
//! refuses. Everything the client sends is recorded.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;

use super::Transport;
use crate::error::TransportError;

#[derive(Default)]
struct Shared {
    sessions: VecDeque<Option<UnboundedReceiver<String>>>,
    sent: Vec<String>,
    opened: Vec<String>,
}

/// Clones share the session queue and the sent-frame log, not the open socket.
#[derive(Default)]
pub struct ChannelTransport {
    shared: Rc<RefCell<Shared>>,
    current: Option<UnboundedReceiver<String>>,
}

impl Clone for ChannelTransport {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            current: None,
        }
    }
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a session that opens successfully.
    pub fn accept(&self) -> UnboundedSender<String> {
        let (tx, rx) = unbounded();
        self.shared.borrow_mut().sessions.push_back(Some(rx));
        tx
    }

    /// Queue a failed open.
    pub fn refuse(&self) {
        self.shared.borrow_mut().sessions.push_back(None);
    }

    /// Text frames written by the client, in order.
    pub fn sent(&self) -> Vec<String> {
        self.shared.borrow().sent.clone()
    }

    /// How many times `open` was called, refused attempts included.
    pub fn open_count(&self) -> usize {
        self.shared.borrow().opened.len()
    }
}

impl Transport for ChannelTransport {
    async fn open(&mut self, url: &str) -> Result<(), TransportError> {
        self.current = None;
        let next = {
            let mut shared = self.shared.borrow_mut();
            shared.opened.push(url.to_string());
            shared.sessions.pop_front().flatten()
        };
        match next {
            Some(rx) => {
                self.current = Some(rx);
                Ok(())
            }
            None => Err(TransportError::Open(format!("{url} refused"))),
        }
    }

    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.current.is_none() {
            return Err(TransportError::NotOpen);
        }
        self.shared.borrow_mut().sent.push(text);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        let rx = self.current.as_mut()?;
        let next = rx.next().await;
        if next.is_none() {
            self.current = None;
        }
        next.map(Ok)
    }

    async fn close(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sessions_are_consumed_in_order() {
        let transport = ChannelTransport::new();
        transport.refuse();
        let server = transport.accept();
        server.unbounded_send("hello".to_string()).unwrap();
        drop(server);

        let mut client = transport.clone();
        assert!(client.open("ws://test").await.is_err());
        assert!(client.send("early".to_string()).await.is_err());

        client.open("ws://test").await.unwrap();
        client.send("hi".to_string()).await.unwrap();
        assert_eq!(client.recv().await, Some(Ok("hello".to_string())));
        assert_eq!(client.recv().await, None);
        assert!(client.recv().await.is_none());

        assert!(client.open("ws://test").await.is_err());
        assert_eq!(transport.open_count(), 3);
        assert_eq!(transport.sent(), vec!["hi".to_string()]);
    }
}
