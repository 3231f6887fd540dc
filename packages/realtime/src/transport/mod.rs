//! # Socket transports
//!
//! [`Transport`] is the seam between the connection logic and an actual
//! WebSocket. Frames cross it as text; encoding is the protocol's job.
//!
//! | Type | Platform |
//! |------|----------|
//! | [`NativeTransport`] | desktop / tests against a live server, on `tokio-tungstenite` |
//! | [`BrowserTransport`] | WASM, on `web_sys::WebSocket` |
//! | [`ChannelTransport`] | in-memory, scripted from the other end of a channel |
//!
//! [`PlatformTransport`] names whichever real socket the target supports.

use std::future::Future;

use crate::error::TransportError;

mod channel;
pub use channel::ChannelTransport;

#[cfg(not(target_arch = "wasm32"))]
mod native;
#[cfg(not(target_arch = "wasm32"))]
pub use native::NativeTransport;

#[cfg(target_arch = "wasm32")]
mod browser;
#[cfg(target_arch = "wasm32")]
pub use browser::BrowserTransport;

#[cfg(target_arch = "wasm32")]
pub type PlatformTransport = BrowserTransport;
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformTransport = NativeTransport;

/// A text-frame socket that can be reopened after it drops.
pub trait Transport {
    /// Open a socket to `url`, replacing any previous one.
    fn open(&mut self, url: &str) -> impl Future<Output = Result<(), TransportError>>;

    fn send(&mut self, text: String) -> impl Future<Output = Result<(), TransportError>>;

    /// Next text frame. `None` once the peer has closed the socket.
    fn recv(&mut self) -> impl Future<Output = Option<Result<String, TransportError>>>;

    fn close(&mut self) -> impl Future<Output = ()>;
}
