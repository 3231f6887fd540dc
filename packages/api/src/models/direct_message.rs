//! Direct (1-to-1) messages, either text or a recorded voice note.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DirectMessageKind {
    #[default]
    Text,
    Voice,
}

/// A private message between two users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    #[serde(default)]
    pub kind: DirectMessageKind,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub duration_secs: Option<f32>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub created_at: String,
}

impl DirectMessage {
    /// The other participant, seen from `me`.
    pub fn peer_of(&self, me: &str) -> &str {
        if self.sender_id == me {
            &self.recipient_id
        } else {
            &self.sender_id
        }
    }

    /// Whether this message belongs to the conversation between `a` and `b`.
    pub fn involves(&self, a: &str, b: &str) -> bool {
        (self.sender_id == a && self.recipient_id == b)
            || (self.sender_id == b && self.recipient_id == a)
    }

    pub fn is_voice(&self) -> bool {
        self.kind == DirectMessageKind::Voice
    }
}

/// Audio payload for a voice note upload.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceNote {
    pub bytes: Vec<u8>,
    /// MIME type reported by the recorder, e.g. `audio/webm`.
    pub mime: String,
    pub duration_secs: f32,
}

impl VoiceNote {
    /// File name sent with the multipart upload, derived from the MIME subtype.
    pub fn file_name(&self) -> String {
        let ext = self
            .mime
            .split('/')
            .nth(1)
            .and_then(|sub| sub.split(';').next())
            .filter(|sub| !sub.is_empty())
            .unwrap_or("bin");
        format!("voice-note.{ext}")
    }
}
