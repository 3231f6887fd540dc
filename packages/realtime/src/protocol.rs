//! # WebSocket message protocol
//!
//! Every frame, in either direction, is a JSON envelope:
//!
//! ```json
//! { "type": "new-message", "data": { ... } }
//! { "type": "authenticate", "token": "..." }
//! ```
//!
//! [`ClientFrame`] covers what this client sends and [`ServerEvent`] what it
//! understands. Server frames with an unknown `type`, or a known type whose
//! payload does not decode, are kept as [`ServerEvent::Other`] so they can
//! still be routed by name.

use api::{CallSession, DirectMessage, FriendRequest, Message};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Event names as they appear in the `type` field.
pub mod names {
    pub const AUTHENTICATE: &str = "authenticate";
    pub const JOIN_CIRCLE: &str = "join-circle";
    pub const LEAVE_CIRCLE: &str = "leave-circle";
    pub const SEND_MESSAGE: &str = "send-message";
    pub const SEND_DIRECT_MESSAGE: &str = "send-direct-message";
    pub const CALL_INITIATE: &str = "call-initiate";
    pub const CALL_ACCEPT: &str = "call-accept";
    pub const CALL_REJECT: &str = "call-reject";
    pub const CALL_END: &str = "call-end";
    pub const PING: &str = "ping";

    pub const AUTHENTICATED: &str = "authenticated";
    pub const AUTH_ERROR: &str = "auth-error";
    pub const NEW_MESSAGE: &str = "new-message";
    pub const NEW_DIRECT_MESSAGE: &str = "new-direct-message";
    pub const FRIEND_REQUEST_RECEIVED: &str = "friend-request-received";
    pub const FRIEND_REQUEST_ACCEPTED: &str = "friend-request-accepted";
    pub const FRIEND_REQUEST_REJECTED: &str = "friend-request-rejected";
    pub const INCOMING_CALL: &str = "incoming-call";
    pub const CALL_ACCEPTED: &str = "call-accepted";
    pub const CALL_REJECTED: &str = "call-rejected";
    pub const CALL_ENDED: &str = "call-ended";
    pub const ERROR: &str = "error";
    pub const PONG: &str = "pong";
}

/// The JSON wrapper shared by all frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Top-level fields other than the ones above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    pub fn new(kind: &str, data: Option<Value>) -> Self {
        Self {
            kind: kind.to_string(),
            data,
            token: None,
            extra: Map::new(),
        }
    }

    /// The payload: `data` when present, otherwise the extra top-level fields.
    fn payload(&self) -> Value {
        match &self.data {
            Some(data) => data.clone(),
            None => Value::Object(self.extra.clone()),
        }
    }
}

/// Frames this client sends.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    Authenticate { token: String },
    JoinCircle { circle_id: String },
    LeaveCircle { circle_id: String },
    SendMessage { circle_id: String, content: String },
    SendDirectMessage { recipient_id: String, content: String },
    CallInitiate { call_id: String, recipient_id: String },
    CallAccept { call_id: String },
    CallReject { call_id: String, reason: Option<String> },
    CallEnd { call_id: String },
    Ping,
}

impl ClientFrame {
    pub fn name(&self) -> &'static str {
        match self {
            ClientFrame::Authenticate { .. } => names::AUTHENTICATE,
            ClientFrame::JoinCircle { .. } => names::JOIN_CIRCLE,
            ClientFrame::LeaveCircle { .. } => names::LEAVE_CIRCLE,
            ClientFrame::SendMessage { .. } => names::SEND_MESSAGE,
            ClientFrame::SendDirectMessage { .. } => names::SEND_DIRECT_MESSAGE,
            ClientFrame::CallInitiate { .. } => names::CALL_INITIATE,
            ClientFrame::CallAccept { .. } => names::CALL_ACCEPT,
            ClientFrame::CallReject { .. } => names::CALL_REJECT,
            ClientFrame::CallEnd { .. } => names::CALL_END,
            ClientFrame::Ping => names::PING,
        }
    }

    pub fn to_envelope(&self) -> Envelope {
        let data = match self {
            ClientFrame::Authenticate { token } => {
                let mut envelope = Envelope::new(self.name(), None);
                envelope.token = Some(token.clone());
                return envelope;
            }
            ClientFrame::JoinCircle { circle_id } | ClientFrame::LeaveCircle { circle_id } => {
                Some(json!({ "circleId": circle_id }))
            }
            ClientFrame::SendMessage { circle_id, content } => {
                Some(json!({ "circleId": circle_id, "content": content }))
            }
            ClientFrame::SendDirectMessage {
                recipient_id,
                content,
            } => Some(json!({ "recipientId": recipient_id, "content": content })),
            ClientFrame::CallInitiate {
                call_id,
                recipient_id,
            } => Some(json!({ "callId": call_id, "recipientId": recipient_id })),
            ClientFrame::CallAccept { call_id } | ClientFrame::CallEnd { call_id } => {
                Some(json!({ "callId": call_id }))
            }
            ClientFrame::CallReject { call_id, reason } => match reason {
                Some(reason) => Some(json!({ "callId": call_id, "reason": reason })),
                None => Some(json!({ "callId": call_id })),
            },
            ClientFrame::Ping => None,
        };
        Envelope::new(self.name(), data)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_envelope())
    }
}

/// Events the server pushes.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Authenticated { user_id: String },
    AuthError { message: String },
    NewMessage(Message),
    NewDirectMessage(DirectMessage),
    FriendRequestReceived(FriendRequest),
    FriendRequestAccepted(FriendRequest),
    FriendRequestRejected(FriendRequest),
    IncomingCall(CallSession),
    CallAccepted { call_id: String },
    CallRejected { call_id: String, reason: Option<String> },
    CallEnded { call_id: String },
    Error { message: String },
    Pong,
    Other { kind: String, data: Option<Value> },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthOk {
    #[serde(alias = "id")]
    user_id: String,
}

#[derive(Deserialize)]
struct Notice {
    #[serde(alias = "error")]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallRef {
    call_id: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Decode `payload` as `T`, or as `T` nested under `key`.
fn record<T: DeserializeOwned>(payload: &Value, key: &str) -> Option<T> {
    serde_json::from_value(payload.clone()).ok().or_else(|| {
        payload
            .get(key)
            .and_then(|inner| serde_json::from_value(inner.clone()).ok())
    })
}

impl ServerEvent {
    /// The name handlers are registered under.
    pub fn name(&self) -> &str {
        match self {
            ServerEvent::Authenticated { .. } => names::AUTHENTICATED,
            ServerEvent::AuthError { .. } => names::AUTH_ERROR,
            ServerEvent::NewMessage(_) => names::NEW_MESSAGE,
            ServerEvent::NewDirectMessage(_) => names::NEW_DIRECT_MESSAGE,
            ServerEvent::FriendRequestReceived(_) => names::FRIEND_REQUEST_RECEIVED,
            ServerEvent::FriendRequestAccepted(_) => names::FRIEND_REQUEST_ACCEPTED,
            ServerEvent::FriendRequestRejected(_) => names::FRIEND_REQUEST_REJECTED,
            ServerEvent::IncomingCall(_) => names::INCOMING_CALL,
            ServerEvent::CallAccepted { .. } => names::CALL_ACCEPTED,
            ServerEvent::CallRejected { .. } => names::CALL_REJECTED,
            ServerEvent::CallEnded { .. } => names::CALL_ENDED,
            ServerEvent::Error { .. } => names::ERROR,
            ServerEvent::Pong => names::PONG,
            ServerEvent::Other { kind, .. } => kind.as_str(),
        }
    }

    /// Parse a raw text frame. Fails only if the text is not an envelope.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Ok(Self::from_envelope(envelope))
    }

    pub fn from_envelope(envelope: Envelope) -> Self {
        let payload = envelope.payload();
        let typed = match envelope.kind.as_str() {
            names::AUTHENTICATED => record::<AuthOk>(&payload, "user")
                .map(|ok| ServerEvent::Authenticated { user_id: ok.user_id }),
            // a rejection must stay a rejection even without a readable reason
            names::AUTH_ERROR => Some(ServerEvent::AuthError {
                message: record::<Notice>(&payload, "error")
                    .map(|n| n.message)
                    .unwrap_or_else(|| "authentication failed".to_string()),
            }),
            names::NEW_MESSAGE => record(&payload, "message").map(ServerEvent::NewMessage),
            names::NEW_DIRECT_MESSAGE => {
                record(&payload, "message").map(ServerEvent::NewDirectMessage)
            }
            names::FRIEND_REQUEST_RECEIVED => {
                record(&payload, "request").map(ServerEvent::FriendRequestReceived)
            }
            names::FRIEND_REQUEST_ACCEPTED => {
                record(&payload, "request").map(ServerEvent::FriendRequestAccepted)
            }
            names::FRIEND_REQUEST_REJECTED => {
                record(&payload, "request").map(ServerEvent::FriendRequestRejected)
            }
            names::INCOMING_CALL => record(&payload, "call").map(ServerEvent::IncomingCall),
            names::CALL_ACCEPTED => record::<CallRef>(&payload, "call")
                .map(|c| ServerEvent::CallAccepted { call_id: c.call_id }),
            names::CALL_REJECTED => {
                record::<CallRef>(&payload, "call").map(|c| ServerEvent::CallRejected {
                    call_id: c.call_id,
                    reason: c.reason,
                })
            }
            names::CALL_ENDED => record::<CallRef>(&payload, "call")
                .map(|c| ServerEvent::CallEnded { call_id: c.call_id }),
            names::ERROR => record::<Notice>(&payload, "error")
                .map(|n| ServerEvent::Error { message: n.message }),
            names::PONG => Some(ServerEvent::Pong),
            _ => None,
        };
        typed.unwrap_or_else(|| {
            if is_known(&envelope.kind) {
                tracing::warn!("undecodable '{}' payload, routing as raw event", envelope.kind);
            }
            ServerEvent::Other {
                kind: envelope.kind,
                data: envelope.data,
            }
        })
    }
}

fn is_known(kind: &str) -> bool {
    matches!(
        kind,
        names::AUTHENTICATED
            | names::AUTH_ERROR
            | names::NEW_MESSAGE
            | names::NEW_DIRECT_MESSAGE
            | names::FRIEND_REQUEST_RECEIVED
            | names::FRIEND_REQUEST_ACCEPTED
            | names::FRIEND_REQUEST_REJECTED
            | names::INCOMING_CALL
            | names::CALL_ACCEPTED
            | names::CALL_REJECTED
            | names::CALL_ENDED
            | names::ERROR
            | names::PONG
    )
}
