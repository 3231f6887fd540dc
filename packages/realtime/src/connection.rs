//! # Connection lifecycle
//!
//! A [`Connection`] owns one [`Transport`] and walks it through
//! connect → authenticate → pump events, reconnecting when the socket drops.
//!
//! ```text
//! Disconnected ─► Connecting{n} ─► Authenticating ─► Connected
//!        ▲              │ fail (n < max)                 │ drop
//!        │              ▼                                ▼
//!        │        wait delay·n, n+1 ◄──────────── Connecting{1}
//!        │              │ fail (n = max)
//!        │              ▼
//!        └─ auth-error  Fallback   (callers switch to REST)
//! ```
//!
//! The handshake is a single request/response: the client sends
//! `authenticate` with its token and waits, bounded by the auth timeout, for
//! `authenticated` or `auth-error`. Frames received before that reply are
//! not dispatched. An `auth-error` is final; every other failure counts
//! against the attempt budget, which resets after each successful handshake.
//!
//! Outbound frames go through a cloneable [`RealtimeHandle`]. They are queued
//! on an unbounded channel and written while the connection pumps events.
//! Frames still queued when the socket drops are discarded, never replayed
//! into a later session; [`RealtimeHandle::deliver`] reports that as
//! [`RealtimeError::NotDelivered`] so the caller can retry over REST.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use api::config::RealtimeSettings;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::channel::oneshot;
use futures::future::{select, Either};
use futures::StreamExt;

use crate::dispatcher::Dispatcher;
use crate::error::{RealtimeError, TransportError};
use crate::protocol::{ClientFrame, ServerEvent};
use crate::time;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting {
        attempt: u32,
    },
    Authenticating,
    Connected,
    /// Reconnect budget spent; use REST until the next explicit connect.
    Fallback,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Offline",
            ConnectionStatus::Connecting { .. } => "Connecting",
            ConnectionStatus::Authenticating => "Signing in",
            ConnectionStatus::Connected => "Live",
            ConnectionStatus::Fallback => "Limited",
        }
    }
}

type StatusListener = Rc<dyn Fn(ConnectionStatus)>;

/// Shared view of a connection's status, with change listeners.
#[derive(Clone, Default)]
pub struct StatusHandle {
    current: Rc<Cell<ConnectionStatus>>,
    listeners: Rc<RefCell<Vec<StatusListener>>>,
}

impl StatusHandle {
    pub fn get(&self) -> ConnectionStatus {
        self.current.get()
    }

    /// Call `listener` on every change from now on.
    pub fn subscribe(&self, listener: impl Fn(ConnectionStatus) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    fn set(&self, status: ConnectionStatus) {
        if self.current.replace(status) == status {
            return;
        }
        tracing::debug!("connection status: {:?}", status);
        let listeners: Vec<StatusListener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(status);
        }
    }
}

impl fmt::Debug for StatusHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StatusHandle").field(&self.get()).finish()
    }
}

/// Capped linear reconnect.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub auth_timeout: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            auth_timeout: Duration::from_secs(5),
        }
    }
}

impl ReconnectPolicy {
    pub fn from_settings(settings: &RealtimeSettings) -> Self {
        Self {
            max_attempts: settings.max_reconnect_attempts.max(1),
            base_delay: Duration::from_millis(settings.reconnect_delay_ms),
            auth_timeout: Duration::from_millis(settings.auth_timeout_ms),
        }
    }

    /// Wait before attempt `attempt` (1-based); the first attempt is immediate.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay * attempt.saturating_sub(1)
    }
}

enum Command {
    Send {
        frame: ClientFrame,
        written: Option<oneshot::Sender<()>>,
    },
    Disconnect,
}

/// Sends frames through a running [`Connection`].
#[derive(Clone)]
pub struct RealtimeHandle {
    commands: UnboundedSender<Command>,
    status: StatusHandle,
}

impl RealtimeHandle {
    /// A handle with no connection behind it. Always reports `Disconnected`.
    pub fn detached() -> Self {
        let (commands, _) = unbounded();
        Self {
            commands,
            status: StatusHandle::default(),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.get()
    }

    pub fn is_connected(&self) -> bool {
        self.status.get().is_connected()
    }

    /// Queue a frame. Fails unless the connection is authenticated.
    pub fn send(&self, frame: ClientFrame) -> Result<(), RealtimeError> {
        self.enqueue(frame, None)
    }

    /// Queue a frame and wait until it has been written to the socket.
    ///
    /// Resolves to [`RealtimeError::NotDelivered`] if the socket drops first.
    pub async fn deliver(&self, frame: ClientFrame) -> Result<(), RealtimeError> {
        let (tx, written) = oneshot::channel();
        self.enqueue(frame, Some(tx))?;
        written.await.map_err(|_| RealtimeError::NotDelivered)
    }

    fn enqueue(
        &self,
        frame: ClientFrame,
        written: Option<oneshot::Sender<()>>,
    ) -> Result<(), RealtimeError> {
        if !self.is_connected() {
            return Err(RealtimeError::NotConnected);
        }
        self.commands
            .unbounded_send(Command::Send { frame, written })
            .map_err(|_| RealtimeError::Closed)
    }

    /// Ask the connection to close and stop pumping.
    pub fn disconnect(&self) {
        let _ = self.commands.unbounded_send(Command::Disconnect);
    }
}

impl fmt::Debug for RealtimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeHandle")
            .field("status", &self.status())
            .finish()
    }
}

pub struct Connection<T: Transport> {
    transport: T,
    url: String,
    token: String,
    policy: ReconnectPolicy,
    status: StatusHandle,
    commands_tx: UnboundedSender<Command>,
    commands: UnboundedReceiver<Command>,
    user_id: Option<String>,
}

enum Step {
    Inbound(Option<Result<String, TransportError>>),
    Command(Option<Command>),
}

impl<T: Transport> Connection<T> {
    pub fn new(
        transport: T,
        url: impl Into<String>,
        token: impl Into<String>,
        policy: ReconnectPolicy,
    ) -> Self {
        let (commands_tx, commands) = unbounded();
        Self {
            transport,
            url: url.into(),
            token: token.into(),
            policy,
            status: StatusHandle::default(),
            commands_tx,
            commands,
            user_id: None,
        }
    }

    pub fn handle(&self) -> RealtimeHandle {
        RealtimeHandle {
            commands: self.commands_tx.clone(),
            status: self.status.clone(),
        }
    }

    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    /// User id the server confirmed in the last handshake.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Connect and authenticate, retrying with linear backoff.
    pub async fn connect(&mut self) -> Result<(), RealtimeError> {
        let max = self.policy.max_attempts.max(1);
        for attempt in 1..=max {
            let delay = self.policy.delay_before(attempt);
            if !delay.is_zero() {
                time::sleep(delay).await;
            }
            match self.attempt(attempt).await {
                Ok(user_id) => {
                    tracing::info!("realtime connected as {}", user_id);
                    self.user_id = Some(user_id);
                    self.status.set(ConnectionStatus::Connected);
                    return Ok(());
                }
                Err(RealtimeError::AuthRejected(reason)) => {
                    tracing::error!("realtime authentication rejected: {}", reason);
                    self.transport.close().await;
                    self.status.set(ConnectionStatus::Disconnected);
                    return Err(RealtimeError::AuthRejected(reason));
                }
                Err(e) => {
                    tracing::warn!("realtime attempt {}/{} failed: {}", attempt, max, e);
                    self.transport.close().await;
                }
            }
        }
        tracing::warn!("realtime unavailable, falling back to REST");
        self.status.set(ConnectionStatus::Fallback);
        Err(RealtimeError::ReconnectExhausted { attempts: max })
    }

    async fn attempt(&mut self, attempt: u32) -> Result<String, RealtimeError> {
        self.status.set(ConnectionStatus::Connecting { attempt });
        self.transport.open(&self.url).await?;

        self.status.set(ConnectionStatus::Authenticating);
        let hello = ClientFrame::Authenticate {
            token: self.token.clone(),
        }
        .encode()?;
        self.transport.send(hello).await?;

        match time::timeout(self.policy.auth_timeout, Self::await_auth(&mut self.transport)).await
        {
            Some(result) => result,
            None => Err(RealtimeError::AuthTimeout),
        }
    }

    async fn await_auth(transport: &mut T) -> Result<String, RealtimeError> {
        loop {
            let text = match transport.recv().await {
                Some(Ok(text)) => text,
                Some(Err(e)) => return Err(e.into()),
                None => return Err(RealtimeError::Closed),
            };
            match ServerEvent::decode(&text) {
                Ok(ServerEvent::Authenticated { user_id }) => return Ok(user_id),
                Ok(ServerEvent::AuthError { message }) => {
                    return Err(RealtimeError::AuthRejected(message))
                }
                Ok(other) => {
                    tracing::debug!("dropping '{}' received before authentication", other.name())
                }
                Err(e) => tracing::warn!("ignoring malformed frame: {}", e),
            }
        }
    }

    /// Next event from an authenticated socket, writing queued frames meanwhile.
    ///
    /// `Ok(None)` means the client asked to disconnect.
    pub async fn next_event(&mut self) -> Result<Option<ServerEvent>, RealtimeError> {
        if !self.status.get().is_connected() {
            return Err(RealtimeError::NotConnected);
        }
        loop {
            let step = {
                let inbound = std::pin::pin!(self.transport.recv());
                let command = self.commands.next();
                match select(inbound, command).await {
                    Either::Left((message, _)) => Step::Inbound(message),
                    Either::Right((command, _)) => Step::Command(command),
                }
            };
            match step {
                Step::Inbound(Some(Ok(text))) => match ServerEvent::decode(&text) {
                    Ok(event) => {
                        tracing::debug!("<- {}", event.name());
                        return Ok(Some(event));
                    }
                    Err(e) => tracing::warn!("ignoring malformed frame: {}", e),
                },
                Step::Inbound(Some(Err(e))) => {
                    self.status.set(ConnectionStatus::Disconnected);
                    return Err(e.into());
                }
                Step::Inbound(None) => {
                    self.status.set(ConnectionStatus::Disconnected);
                    return Err(RealtimeError::Closed);
                }
                Step::Command(Some(Command::Send { frame, written })) => {
                    tracing::debug!("-> {}", frame.name());
                    let text = frame.encode()?;
                    if let Err(e) = self.transport.send(text).await {
                        self.status.set(ConnectionStatus::Disconnected);
                        return Err(e.into());
                    }
                    if let Some(written) = written {
                        let _ = written.send(());
                    }
                }
                Step::Command(Some(Command::Disconnect)) | Step::Command(None) => {
                    self.disconnect().await;
                    return Ok(None);
                }
            }
        }
    }

    /// Pump events into `dispatcher` until the client disconnects.
    ///
    /// Drops are followed by a reconnect; returns an error only when
    /// reconnecting is pointless (rejected token) or the budget is spent.
    pub async fn run(&mut self, dispatcher: &Dispatcher) -> Result<(), RealtimeError> {
        loop {
            if !self.status.get().is_connected() {
                self.connect().await?;
            }
            match self.next_event().await {
                Ok(Some(event)) => {
                    dispatcher.dispatch(&event);
                }
                Ok(None) => return Ok(()),
                Err(e) => {
                    tracing::warn!("realtime connection lost: {}", e);
                    self.transport.close().await;
                    if self.discard_queued() {
                        self.disconnect().await;
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Drop frames queued for the lost socket, failing their waiters.
    /// Returns whether a disconnect was requested meanwhile.
    fn discard_queued(&mut self) -> bool {
        let mut disconnect = false;
        while let Ok(Some(command)) = self.commands.try_next() {
            match command {
                Command::Send { frame, .. } => {
                    tracing::debug!("discarding unsent '{}'", frame.name())
                }
                Command::Disconnect => disconnect = true,
            }
        }
        disconnect
    }

    pub async fn disconnect(&mut self) {
        self.transport.close().await;
        self.status.set(ConnectionStatus::Disconnected);
        tracing::info!("realtime disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;
    use serde_json::Value;

    const AUTH_OK: &str = r#"{"type":"authenticated","data":{"userId":"u1"}}"#;

    fn fast_policy(max_attempts: u32) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            auth_timeout: Duration::from_millis(100),
        }
    }

    fn message_frame(id: &str) -> String {
        format!(
            r#"{{"type":"new-message","data":{{"id":"{id}","circleId":"c1","senderId":"u2","content":"hi"}}}}"#
        )
    }

    fn sent_types(transport: &ChannelTransport) -> Vec<String> {
        transport
            .sent()
            .iter()
            .map(|text| {
                let value: Value = serde_json::from_str(text).unwrap();
                value["type"].as_str().unwrap().to_string()
            })
            .collect()
    }

    #[test]
    fn test_linear_delays() {
        let policy = ReconnectPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            auth_timeout: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_millis(500));
        assert_eq!(policy.delay_before(3), Duration::from_millis(1000));
    }

    #[test]
    fn test_policy_from_settings_never_zero_attempts() {
        let mut settings = api::ClientConfig::default().realtime;
        settings.max_reconnect_attempts = 0;
        let policy = ReconnectPolicy::from_settings(&settings);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.auth_timeout, Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn test_handshake_sends_token_first() {
        let transport = ChannelTransport::new();
        let server = transport.accept();
        server.unbounded_send(AUTH_OK.to_string()).unwrap();

        let mut connection = Connection::new(transport.clone(), "ws://test/ws", "tok", fast_policy(1));
        connection.connect().await.unwrap();

        assert_eq!(connection.status().get(), ConnectionStatus::Connected);
        assert_eq!(connection.user_id(), Some("u1"));
        let first: Value = serde_json::from_str(&transport.sent()[0]).unwrap();
        assert_eq!(first["type"], "authenticate");
        assert_eq!(first["token"], "tok");
    }

    #[tokio::test]
    async fn test_frames_before_auth_reply_are_dropped() {
        let transport = ChannelTransport::new();
        let server = transport.accept();
        server.unbounded_send(message_frame("early")).unwrap();
        server.unbounded_send(AUTH_OK.to_string()).unwrap();
        server.unbounded_send(message_frame("late")).unwrap();

        let mut connection = Connection::new(transport, "ws://test/ws", "tok", fast_policy(1));
        connection.connect().await.unwrap();
        match connection.next_event().await.unwrap() {
            Some(ServerEvent::NewMessage(message)) => assert_eq!(message.id, "late"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_auth_error_is_final() {
        let transport = ChannelTransport::new();
        let server = transport.accept();
        server
            .unbounded_send(r#"{"type":"auth-error","data":{"message":"bad token"}}"#.to_string())
            .unwrap();
        // a second session would succeed, but must not be tried
        transport.accept().unbounded_send(AUTH_OK.to_string()).unwrap();

        let mut connection = Connection::new(transport.clone(), "ws://test/ws", "tok", fast_policy(5));
        match connection.connect().await {
            Err(RealtimeError::AuthRejected(reason)) => assert_eq!(reason, "bad token"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(transport.open_count(), 1);
        assert_eq!(connection.status().get(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_refused_attempts_then_success() {
        let transport = ChannelTransport::new();
        transport.refuse();
        transport.refuse();
        transport.accept().unbounded_send(AUTH_OK.to_string()).unwrap();

        let mut connection = Connection::new(transport.clone(), "ws://test/ws", "tok", fast_policy(3));
        connection.connect().await.unwrap();
        assert_eq!(transport.open_count(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_moves_to_fallback() {
        let transport = ChannelTransport::new();
        let mut connection = Connection::new(transport.clone(), "ws://test/ws", "tok", fast_policy(2));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        connection.status().subscribe(move |status| log.borrow_mut().push(status));

        match connection.connect().await {
            Err(RealtimeError::ReconnectExhausted { attempts }) => assert_eq!(attempts, 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(transport.open_count(), 2);
        assert_eq!(connection.status().get(), ConnectionStatus::Fallback);
        assert_eq!(
            *seen.borrow(),
            vec![
                ConnectionStatus::Connecting { attempt: 1 },
                ConnectionStatus::Connecting { attempt: 2 },
                ConnectionStatus::Fallback,
            ]
        );
        assert!(!connection.handle().is_connected());
        assert!(matches!(
            connection.handle().send(ClientFrame::Ping),
            Err(RealtimeError::NotConnected)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_server_times_out_auth() {
        let transport = ChannelTransport::new();
        let _silent = transport.accept();

        let mut connection = Connection::new(transport.clone(), "ws://test/ws", "tok", fast_policy(1));
        assert!(matches!(
            connection.connect().await,
            Err(RealtimeError::ReconnectExhausted { attempts: 1 })
        ));
    }

    #[tokio::test]
    async fn test_run_dispatches_and_reconnects_after_drop() {
        let transport = ChannelTransport::new();
        let first = transport.accept();
        first.unbounded_send(AUTH_OK.to_string()).unwrap();
        first.unbounded_send(message_frame("m1")).unwrap();
        drop(first);
        let second = transport.accept();
        second.unbounded_send(AUTH_OK.to_string()).unwrap();
        second.unbounded_send(message_frame("m2")).unwrap();
        drop(second);

        let dispatcher = Dispatcher::new();
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();
        dispatcher.on("new-message", move |event| {
            if let ServerEvent::NewMessage(message) = event {
                sink.borrow_mut().push(message.id.clone());
            }
        });

        let mut connection = Connection::new(transport.clone(), "ws://test/ws", "tok", fast_policy(2));
        let result = connection.run(&dispatcher).await;

        // both sessions consumed, then two refused opens spend the budget
        assert!(matches!(result, Err(RealtimeError::ReconnectExhausted { .. })));
        assert_eq!(*received.borrow(), vec!["m1".to_string(), "m2".to_string()]);
        assert_eq!(transport.open_count(), 4);
        assert_eq!(connection.status().get(), ConnectionStatus::Fallback);
    }

    #[tokio::test]
    async fn test_handle_frames_are_written_and_disconnect_stops_run() {
        let transport = ChannelTransport::new();
        let server = transport.accept();
        server.unbounded_send(AUTH_OK.to_string()).unwrap();

        let mut connection = Connection::new(transport.clone(), "ws://test/ws", "tok", fast_policy(1));
        connection.connect().await.unwrap();

        let handle = connection.handle();
        handle
            .send(ClientFrame::JoinCircle {
                circle_id: "c1".into(),
            })
            .unwrap();
        handle.disconnect();

        connection.run(&Dispatcher::new()).await.unwrap();
        assert_eq!(sent_types(&transport), vec!["authenticate", "join-circle"]);
        assert_eq!(connection.status().get(), ConnectionStatus::Disconnected);
        drop(server);
    }

    #[tokio::test]
    async fn test_deliver_resolves_once_written() {
        let transport = ChannelTransport::new();
        let server = transport.accept();
        server.unbounded_send(AUTH_OK.to_string()).unwrap();

        let mut connection = Connection::new(transport.clone(), "ws://test/ws", "tok", fast_policy(1));
        connection.connect().await.unwrap();
        let handle = connection.handle();
        let dispatcher = Dispatcher::new();

        let sender = async {
            let delivered = handle.deliver(ClientFrame::Ping).await;
            handle.disconnect();
            delivered
        };
        let (delivered, run) = futures::join!(sender, connection.run(&dispatcher));

        assert!(delivered.is_ok());
        assert!(run.is_ok());
        assert_eq!(sent_types(&transport), vec!["authenticate", "ping"]);
        drop(server);
    }

    #[tokio::test]
    async fn test_frames_queued_on_a_dropped_socket_are_not_delivered() {
        let transport = ChannelTransport::new();
        let server = transport.accept();
        server.unbounded_send(AUTH_OK.to_string()).unwrap();

        let mut connection = Connection::new(transport.clone(), "ws://test/ws", "tok", fast_policy(1));
        connection.connect().await.unwrap();
        drop(server);

        let handle = connection.handle();
        let dispatcher = Dispatcher::new();
        let frame = ClientFrame::SendMessage {
            circle_id: "c1".into(),
            content: "hi".into(),
        };
        let (delivered, run) = futures::join!(handle.deliver(frame), connection.run(&dispatcher));

        assert!(matches!(delivered, Err(RealtimeError::NotDelivered)));
        assert!(matches!(run, Err(RealtimeError::ReconnectExhausted { .. })));
        assert_eq!(sent_types(&transport), vec!["authenticate"]);
    }
}
