//! # Realtime crate — socket events, delivery and calls
//!
//! Everything that happens over the `/ws` socket, plus the client-side state
//! built on top of it.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`protocol`] | JSON envelope, outbound [`ClientFrame`]s and inbound [`ServerEvent`]s |
//! | [`dispatcher`] | Event name → handler list routing, with `*` wildcard |
//! | [`transport`] | Socket implementations behind the [`Transport`] trait |
//! | [`connection`] | Connect, authenticate, pump, capped reconnect |
//! | [`timeline`] | De-duplicated record lists for views |
//! | [`messenger`] | Send text over the socket, or REST when offline |
//! | [`call`] | Call state machine, audio engine seam, call controller |
//!
//! The client runs on a single thread (the browser event loop, or a
//! current-thread runtime natively), so shared state here is `Rc`/`RefCell`
//! and nothing is `Send`.

pub mod call;
pub mod connection;
pub mod dispatcher;
mod error;
pub mod messenger;
pub mod protocol;
pub mod time;
pub mod timeline;
pub mod transport;

pub use connection::{Connection, ConnectionStatus, ReconnectPolicy, RealtimeHandle, StatusHandle};
pub use dispatcher::{Dispatcher, HandlerId, WILDCARD};
pub use error::{RealtimeError, TransportError};
pub use messenger::{Delivery, MessageFallback, Messenger};
pub use protocol::{ClientFrame, Envelope, ServerEvent};
pub use timeline::{Identified, Timeline};
pub use transport::{ChannelTransport, PlatformTransport, Transport};
