//! One-to-one audio calls.
//!
//! [`reducer`] holds the pure state machine, [`audio`] the seam to the audio
//! SDK, and [`controller`] ties them to the backend and the socket.

pub mod audio;
pub mod controller;
pub mod reducer;

pub use audio::{AudioEngine, AudioError, AudioOp, SilentEngine};
#[cfg(target_arch = "wasm32")]
pub use audio::BrowserAudioEngine;
pub use controller::{CallBackend, CallController, CallError, Signaling};
pub use reducer::{reduce, CallAction, CallState, EndReason};
