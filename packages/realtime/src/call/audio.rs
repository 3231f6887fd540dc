//! The seam to the real-time audio SDK.
//!
//! Joining a channel publishes the local microphone track and plays every
//! remote track that appears; leaving stops both. In the browser the SDK is a
//! JS library, reached through a small bridge object the page installs as
//! `window.circlesAudio`:
//!
//! ```js
//! window.circlesAudio = {
//!   join(appId, channel, token, uid) { /* returns a Promise */ },
//!   leave() { /* returns a Promise */ },
//!   setMuted(muted) { /* returns a Promise */ },
//! };
//! ```

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use api::CallCredentials;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AudioError {
    #[error("audio engine unavailable: {0}")]
    Unavailable(String),
    #[error("could not join channel: {0}")]
    Join(String),
    #[error("audio engine error: {0}")]
    Engine(String),
}

pub trait AudioEngine {
    fn join(&self, credentials: &CallCredentials) -> impl Future<Output = Result<(), AudioError>>;

    /// Leave the current channel. Safe to call when not joined.
    fn leave(&self) -> impl Future<Output = Result<(), AudioError>>;

    fn set_muted(&self, muted: bool) -> impl Future<Output = Result<(), AudioError>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioOp {
    Join { channel: String, uid: u32 },
    Leave,
    Mute(bool),
}

/// An engine that plays nothing and remembers what it was asked to do.
#[derive(Clone, Default)]
pub struct SilentEngine {
    ops: Rc<RefCell<Vec<AudioOp>>>,
    fail_join: Rc<RefCell<Option<String>>>,
}

impl SilentEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next joins fail with `reason`.
    pub fn fail_joins(&self, reason: impl Into<String>) {
        *self.fail_join.borrow_mut() = Some(reason.into());
    }

    pub fn ops(&self) -> Vec<AudioOp> {
        self.ops.borrow().clone()
    }
}

impl AudioEngine for SilentEngine {
    async fn join(&self, credentials: &CallCredentials) -> Result<(), AudioError> {
        if let Some(reason) = self.fail_join.borrow().clone() {
            return Err(AudioError::Join(reason));
        }
        self.ops.borrow_mut().push(AudioOp::Join {
            channel: credentials.channel.clone(),
            uid: credentials.uid,
        });
        Ok(())
    }

    async fn leave(&self) -> Result<(), AudioError> {
        self.ops.borrow_mut().push(AudioOp::Leave);
        Ok(())
    }

    async fn set_muted(&self, muted: bool) -> Result<(), AudioError> {
        self.ops.borrow_mut().push(AudioOp::Mute(muted));
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserAudioEngine;

#[cfg(target_arch = "wasm32")]
mod browser {
    use js_sys::{Function, Promise, Reflect};
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;

    use super::{AudioEngine, AudioError};
    use api::CallCredentials;

    const BRIDGE: &str = "circlesAudio";

    /// Drives the page's `window.circlesAudio` bridge.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct BrowserAudioEngine;

    fn describe(value: JsValue) -> String {
        value
            .as_string()
            .or_else(|| {
                Reflect::get(&value, &JsValue::from_str("message"))
                    .ok()
                    .and_then(|m| m.as_string())
            })
            .unwrap_or_else(|| format!("{value:?}"))
    }

    async fn call(method: &str, args: &[JsValue]) -> Result<(), AudioError> {
        let window = web_sys::window()
            .ok_or_else(|| AudioError::Unavailable("no window".to_string()))?;
        let bridge = Reflect::get(&window, &JsValue::from_str(BRIDGE))
            .ok()
            .filter(|b| !b.is_undefined() && !b.is_null())
            .ok_or_else(|| AudioError::Unavailable(format!("window.{BRIDGE} is not installed")))?;
        let function: Function = Reflect::get(&bridge, &JsValue::from_str(method))
            .map_err(|e| AudioError::Unavailable(describe(e)))?
            .dyn_into()
            .map_err(|_| AudioError::Unavailable(format!("{BRIDGE}.{method} is not a function")))?;

        let array = js_sys::Array::new();
        for arg in args {
            array.push(arg);
        }
        let returned = function
            .apply(&bridge, &array)
            .map_err(|e| AudioError::Engine(describe(e)))?;
        if let Ok(promise) = returned.dyn_into::<Promise>() {
            JsFuture::from(promise)
                .await
                .map_err(|e| AudioError::Engine(describe(e)))?;
        }
        Ok(())
    }

    impl AudioEngine for BrowserAudioEngine {
        async fn join(&self, credentials: &CallCredentials) -> Result<(), AudioError> {
            tracing::info!("joining audio channel {}", credentials.channel);
            call(
                "join",
                &[
                    JsValue::from_str(&credentials.app_id),
                    JsValue::from_str(&credentials.channel),
                    JsValue::from_str(&credentials.token),
                    JsValue::from(credentials.uid),
                ],
            )
            .await
            .map_err(|e| match e {
                AudioError::Engine(reason) => AudioError::Join(reason),
                other => other,
            })
        }

        async fn leave(&self) -> Result<(), AudioError> {
            call("leave", &[]).await
        }

        async fn set_muted(&self, muted: bool) -> Result<(), AudioError> {
            call("setMuted", &[JsValue::from_bool(muted)]).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> CallCredentials {
        CallCredentials {
            app_id: "app".into(),
            channel: "room".into(),
            token: "t".into(),
            uid: 7,
        }
    }

    #[tokio::test]
    async fn test_silent_engine_records_ops() {
        let engine = SilentEngine::new();
        engine.join(&credentials()).await.unwrap();
        engine.set_muted(true).await.unwrap();
        engine.leave().await.unwrap();
        assert_eq!(
            engine.ops(),
            vec![
                AudioOp::Join {
                    channel: "room".into(),
                    uid: 7
                },
                AudioOp::Mute(true),
                AudioOp::Leave,
            ]
        );
    }

    #[tokio::test]
    async fn test_silent_engine_failing_join() {
        let engine = SilentEngine::new();
        engine.fail_joins("denied");
        assert_eq!(
            engine.join(&credentials()).await,
            Err(AudioError::Join("denied".into()))
        );
        assert!(engine.ops().is_empty());
    }
}
