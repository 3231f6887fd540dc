//! Call signaling records.
//!
//! A [`CallSession`] is created by the caller through `POST /calls` and relayed
//! to the callee over the socket. Once both sides agree, each fetches
//! [`CallCredentials`] and joins the audio channel they name.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    #[default]
    Ringing,
    Accepted,
    Rejected,
    Ended,
    Missed,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Ringing => "ringing",
            CallStatus::Accepted => "accepted",
            CallStatus::Rejected => "rejected",
            CallStatus::Ended => "ended",
            CallStatus::Missed => "missed",
        }
    }
}

/// A signaling record coordinating a 1-to-1 audio call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallSession {
    pub id: String,
    pub caller_id: String,
    pub callee_id: String,
    pub channel_name: String,
    #[serde(default)]
    pub status: CallStatus,
    #[serde(default)]
    pub started_at: Option<String>,
}

impl CallSession {
    /// The other party, seen from `me`.
    pub fn peer_of(&self, me: &str) -> &str {
        if self.caller_id == me {
            &self.callee_id
        } else {
            &self.caller_id
        }
    }
}

/// Everything the audio SDK needs to join a channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallCredentials {
    pub app_id: String,
    pub channel: String,
    pub token: String,
    pub uid: u32,
}
