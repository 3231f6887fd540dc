//! Voice note capture.
//!
//! The browser side is `window.circlesRecorder`, installed by the page next
//! to the audio bridge. `start()` asks for the microphone and begins
//! recording; `stop()` resolves to `{ data: Uint8Array, mime, durationSecs }`.

use api::VoiceNote;

#[cfg(target_arch = "wasm32")]
mod bridge {
    use js_sys::{Function, Reflect, Uint8Array};
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;

    const RECORDER: &str = "circlesRecorder";

    fn describe(value: JsValue) -> String {
        value
            .as_string()
            .or_else(|| {
                Reflect::get(&value, &JsValue::from_str("message"))
                    .ok()
                    .and_then(|m| m.as_string())
            })
            .unwrap_or_else(|| "recorder error".to_string())
    }

    pub async fn invoke(method: &str) -> Result<JsValue, String> {
        let window = web_sys::window().ok_or("no window")?;
        let recorder = Reflect::get(&window, &JsValue::from_str(RECORDER))
            .ok()
            .filter(|r| !r.is_undefined() && !r.is_null())
            .ok_or_else(|| format!("window.{RECORDER} is not installed"))?;
        let function: Function = Reflect::get(&recorder, &JsValue::from_str(method))
            .map_err(describe)?
            .dyn_into()
            .map_err(|_| format!("{RECORDER}.{method} is not a function"))?;
        let promise = function
            .call0(&recorder)
            .map_err(describe)?
            .dyn_into::<js_sys::Promise>()
            .map_err(|_| format!("{RECORDER}.{method} did not return a promise"))?;
        JsFuture::from(promise).await.map_err(describe)
    }

    pub fn field(value: &JsValue, name: &str) -> Option<JsValue> {
        Reflect::get(value, &JsValue::from_str(name))
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null())
    }

    pub fn bytes(value: &JsValue) -> Vec<u8> {
        Uint8Array::new(value).to_vec()
    }
}

#[cfg(target_arch = "wasm32")]
pub async fn start_recording() -> Result<(), String> {
    bridge::invoke("start").await.map(|_| ())
}

#[cfg(target_arch = "wasm32")]
pub async fn stop_recording() -> Result<VoiceNote, String> {
    let recording = bridge::invoke("stop").await?;
    let data = bridge::field(&recording, "data").ok_or("recording has no data")?;
    let mime = bridge::field(&recording, "mime")
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| "audio/webm".to_string());
    let duration_secs = bridge::field(&recording, "durationSecs")
        .and_then(|d| d.as_f64())
        .unwrap_or_default() as f32;
    Ok(VoiceNote {
        bytes: bridge::bytes(&data),
        mime,
        duration_secs,
    })
}

#[cfg(not(target_arch = "wasm32"))]
pub async fn start_recording() -> Result<(), String> {
    Err("voice notes can only be recorded in the browser".to_string())
}

#[cfg(not(target_arch = "wasm32"))]
pub async fn stop_recording() -> Result<VoiceNote, String> {
    Err("no recording in progress".to_string())
}

/// `m:ss` for a clip length.
pub fn format_duration(secs: f32) -> String {
    let total = secs.max(0.0).round() as u32;
    format!("{}:{:02}", total / 60, total % 60)
}
