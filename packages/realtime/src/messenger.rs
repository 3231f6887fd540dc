//! Text message delivery with REST fallback.
//!
//! While the socket is authenticated, messages go out as `send-message` /
//! `send-direct-message` frames and the server echoes the stored record back
//! as an event. `Delivery::Realtime` is only reported once the frame has been
//! written. Otherwise, including when the socket drops with the frame still
//! queued, the message is posted over REST and the created record is returned
//! directly, so the caller can append it to its timeline.

use std::future::Future;

use api::{ApiClient, ApiError, DirectMessage, Message};

use crate::connection::RealtimeHandle;
use crate::error::RealtimeError;
use crate::protocol::ClientFrame;

/// REST endpoints used when the socket is unavailable.
pub trait MessageFallback {
    fn post_circle_message(
        &self,
        circle_id: &str,
        content: &str,
    ) -> impl Future<Output = Result<Message, ApiError>>;

    fn post_direct_message(
        &self,
        recipient_id: &str,
        content: &str,
    ) -> impl Future<Output = Result<DirectMessage, ApiError>>;
}

impl MessageFallback for ApiClient {
    async fn post_circle_message(&self, circle_id: &str, content: &str) -> Result<Message, ApiError> {
        self.circles().post_message(circle_id, content).await
    }

    async fn post_direct_message(
        &self,
        recipient_id: &str,
        content: &str,
    ) -> Result<DirectMessage, ApiError> {
        self.direct_messages().send_text(recipient_id, content).await
    }
}

/// How a message left the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery<T> {
    /// Written to the socket; the record arrives later as an event.
    Realtime,
    /// Created over REST.
    Rest(T),
}

#[derive(Clone)]
pub struct Messenger<F> {
    handle: RealtimeHandle,
    fallback: F,
}

fn non_empty(content: &str) -> Result<&str, RealtimeError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation("message cannot be empty".to_string()).into());
    }
    Ok(trimmed)
}

impl<F: MessageFallback> Messenger<F> {
    pub fn new(handle: RealtimeHandle, fallback: F) -> Self {
        Self { handle, fallback }
    }

    pub fn handle(&self) -> &RealtimeHandle {
        &self.handle
    }

    /// Try the socket first; `false` means REST should be used.
    async fn try_realtime(&self, frame: ClientFrame) -> bool {
        if !self.handle.is_connected() {
            return false;
        }
        match self.handle.deliver(frame).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("realtime send failed, using REST: {}", e);
                false
            }
        }
    }

    pub async fn send_circle_message(
        &self,
        circle_id: &str,
        content: &str,
    ) -> Result<Delivery<Message>, RealtimeError> {
        let content = non_empty(content)?;
        let frame = ClientFrame::SendMessage {
            circle_id: circle_id.to_string(),
            content: content.to_string(),
        };
        if self.try_realtime(frame).await {
            return Ok(Delivery::Realtime);
        }
        let message = self.fallback.post_circle_message(circle_id, content).await?;
        Ok(Delivery::Rest(message))
    }

    pub async fn send_direct_message(
        &self,
        recipient_id: &str,
        content: &str,
    ) -> Result<Delivery<DirectMessage>, RealtimeError> {
        let content = non_empty(content)?;
        let frame = ClientFrame::SendDirectMessage {
            recipient_id: recipient_id.to_string(),
            content: content.to_string(),
        };
        if self.try_realtime(frame).await {
            return Ok(Delivery::Realtime);
        }
        let message = self
            .fallback
            .post_direct_message(recipient_id, content)
            .await?;
        Ok(Delivery::Rest(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Connection, ReconnectPolicy};
    use crate::dispatcher::Dispatcher;
    use crate::transport::ChannelTransport;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct RecordingFallback {
        posted: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl MessageFallback for RecordingFallback {
        async fn post_circle_message(&self, circle_id: &str, content: &str) -> Result<Message, ApiError> {
            self.posted
                .borrow_mut()
                .push((circle_id.to_string(), content.to_string()));
            Ok(Message {
                id: "rest-1".into(),
                circle_id: circle_id.into(),
                sender_id: "me".into(),
                sender_name: None,
                content: content.into(),
                created_at: String::new(),
            })
        }

        async fn post_direct_message(
            &self,
            recipient_id: &str,
            content: &str,
        ) -> Result<DirectMessage, ApiError> {
            self.posted
                .borrow_mut()
                .push((recipient_id.to_string(), content.to_string()));
            Ok(DirectMessage {
                id: "rest-dm".into(),
                sender_id: "me".into(),
                recipient_id: recipient_id.into(),
                kind: Default::default(),
                content: Some(content.into()),
                audio_url: None,
                duration_secs: None,
                read: false,
                created_at: String::new(),
            })
        }
    }

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            auth_timeout: Duration::from_millis(100),
        }
    }

    #[tokio::test]
    async fn test_uses_rest_when_offline() {
        let fallback = RecordingFallback::default();
        let messenger = Messenger::new(RealtimeHandle::detached(), fallback.clone());

        match messenger.send_circle_message("c1", "  hello ").await.unwrap() {
            Delivery::Rest(message) => assert_eq!(message.content, "hello"),
            Delivery::Realtime => panic!("socket is not connected"),
        }
        match messenger.send_direct_message("u2", "psst").await.unwrap() {
            Delivery::Rest(message) => assert_eq!(message.recipient_id, "u2"),
            Delivery::Realtime => panic!("socket is not connected"),
        }
        assert_eq!(fallback.posted.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_uses_socket_when_connected() {
        let transport = ChannelTransport::new();
        let server = transport.accept();
        server
            .unbounded_send(r#"{"type":"authenticated","data":{"userId":"me"}}"#.to_string())
            .unwrap();
        let mut connection = Connection::new(transport, "ws://test/ws", "tok", policy());
        connection.connect().await.unwrap();

        let fallback = RecordingFallback::default();
        let messenger = Messenger::new(connection.handle(), fallback.clone());
        let dispatcher = Dispatcher::new();
        let sender = async {
            let delivery = messenger.send_circle_message("c1", "hi").await;
            messenger.handle().disconnect();
            delivery
        };
        let (delivery, run) = futures::join!(sender, connection.run(&dispatcher));

        assert_eq!(delivery.unwrap(), Delivery::Realtime);
        assert!(run.is_ok());
        assert!(fallback.posted.borrow().is_empty());
        drop(server);
    }

    #[tokio::test]
    async fn test_falls_back_when_socket_drops_before_write() {
        let transport = ChannelTransport::new();
        let server = transport.accept();
        server
            .unbounded_send(r#"{"type":"authenticated","data":{"userId":"me"}}"#.to_string())
            .unwrap();
        let mut connection = Connection::new(transport.clone(), "ws://test/ws", "tok", policy());
        connection.connect().await.unwrap();
        drop(server);

        let fallback = RecordingFallback::default();
        let messenger = Messenger::new(connection.handle(), fallback.clone());
        let dispatcher = Dispatcher::new();
        let (delivery, run) = futures::join!(
            messenger.send_direct_message("u2", "still there?"),
            connection.run(&dispatcher)
        );

        match delivery.unwrap() {
            Delivery::Rest(message) => assert_eq!(message.content.as_deref(), Some("still there?")),
            Delivery::Realtime => panic!("frame was never written"),
        }
        assert!(run.is_err());
        assert_eq!(
            *fallback.posted.borrow(),
            vec![("u2".to_string(), "still there?".to_string())]
        );
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_blank_content() {
        let connection = Connection::new(ChannelTransport::new(), "ws://test/ws", "tok", policy());
        let fallback = RecordingFallback::default();
        let messenger = Messenger::new(connection.handle(), fallback.clone());

        let err = messenger.send_circle_message("c1", "   ").await.unwrap_err();
        assert!(matches!(err, RealtimeError::Api(ApiError::Validation(_))));
        assert!(fallback.posted.borrow().is_empty());
    }
}
