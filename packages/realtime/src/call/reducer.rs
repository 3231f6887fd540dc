//! Pure call-state transitions.
//!
//! | From | Action | To |
//! |------|--------|----|
//! | idle | `Dial` | outgoing |
//! | idle | `Incoming` | incoming |
//! | incoming | `Accept` | connecting |
//! | incoming | `Decline` | ended (declined) |
//! | outgoing | `RemoteAccepted` | connecting |
//! | outgoing | `RemoteRejected` | ended (rejected) |
//! | outgoing, incoming | `RingTimeout` | ended (missed) |
//! | connecting | `AudioJoined` | active |
//! | active | `ToggleMute` | active, mute flipped |
//! | ringing, connecting, active | `Hangup` | ended (hung up) |
//! | ringing, connecting, active | `RemoteEnded` | ended (remote hung up) |
//! | any live call | `Failed` | ended (failed) |
//! | ended | `Dismiss` | idle |
//!
//! "Idle" includes `Ended`, so a new call may start before the last one is
//! dismissed. Anything else, including actions that name another call id,
//! leaves the state as it is.

use api::CallSession;

#[derive(Debug, Clone, PartialEq)]
pub enum EndReason {
    HungUp,
    RemoteHungUp,
    Declined,
    Rejected,
    Missed,
    Failed(String),
}

impl EndReason {
    pub fn describe(&self) -> String {
        match self {
            EndReason::HungUp => "Call ended".to_string(),
            EndReason::RemoteHungUp => "The other side hung up".to_string(),
            EndReason::Declined => "Call declined".to_string(),
            EndReason::Rejected => "Call was rejected".to_string(),
            EndReason::Missed => "No answer".to_string(),
            EndReason::Failed(reason) => format!("Call failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CallState {
    #[default]
    Idle,
    Outgoing {
        session: CallSession,
    },
    Incoming {
        session: CallSession,
    },
    Connecting {
        session: CallSession,
    },
    Active {
        session: CallSession,
        muted: bool,
    },
    Ended {
        call_id: String,
        reason: EndReason,
    },
}

impl CallState {
    pub fn session(&self) -> Option<&CallSession> {
        match self {
            CallState::Outgoing { session }
            | CallState::Incoming { session }
            | CallState::Connecting { session }
            | CallState::Active { session, .. } => Some(session),
            CallState::Idle | CallState::Ended { .. } => None,
        }
    }

    pub fn call_id(&self) -> Option<&str> {
        match self {
            CallState::Ended { call_id, .. } => Some(call_id),
            _ => self.session().map(|s| s.id.as_str()),
        }
    }

    /// No call in progress.
    pub fn is_idle(&self) -> bool {
        matches!(self, CallState::Idle | CallState::Ended { .. })
    }

    pub fn is_muted(&self) -> bool {
        matches!(self, CallState::Active { muted: true, .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            CallState::Idle => "idle",
            CallState::Outgoing { .. } => "calling",
            CallState::Incoming { .. } => "ringing",
            CallState::Connecting { .. } => "connecting",
            CallState::Active { .. } => "in call",
            CallState::Ended { .. } => "ended",
        }
    }

    fn ended(&self, reason: EndReason) -> CallState {
        match self.call_id() {
            Some(call_id) => CallState::Ended {
                call_id: call_id.to_string(),
                reason,
            },
            None => self.clone(),
        }
    }

    fn is_call(&self, call_id: &str) -> bool {
        self.session().is_some_and(|s| s.id == call_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallAction {
    Dial(CallSession),
    Incoming(CallSession),
    Accept,
    Decline,
    RemoteAccepted { call_id: String },
    RemoteRejected { call_id: String },
    AudioJoined,
    ToggleMute,
    Hangup,
    RemoteEnded { call_id: String },
    RingTimeout { call_id: String },
    Failed(String),
    Dismiss,
}

pub fn reduce(state: &CallState, action: CallAction) -> CallState {
    use CallAction as A;
    use CallState as S;

    let next = match (state, action) {
        (s, A::Dial(session)) if s.is_idle() => Some(S::Outgoing { session }),
        (s, A::Incoming(session)) if s.is_idle() => Some(S::Incoming { session }),

        (S::Incoming { session }, A::Accept) => Some(S::Connecting {
            session: session.clone(),
        }),
        (s @ S::Incoming { .. }, A::Decline) => Some(s.ended(EndReason::Declined)),

        (S::Outgoing { session }, A::RemoteAccepted { call_id }) if session.id == call_id => {
            Some(S::Connecting {
                session: session.clone(),
            })
        }
        (s @ S::Outgoing { .. }, A::RemoteRejected { call_id }) if s.is_call(&call_id) => {
            Some(s.ended(EndReason::Rejected))
        }
        (s @ (S::Outgoing { .. } | S::Incoming { .. }), A::RingTimeout { call_id })
            if s.is_call(&call_id) =>
        {
            Some(s.ended(EndReason::Missed))
        }

        (S::Connecting { session }, A::AudioJoined) => Some(S::Active {
            session: session.clone(),
            muted: false,
        }),
        (S::Active { session, muted }, A::ToggleMute) => Some(S::Active {
            session: session.clone(),
            muted: !muted,
        }),

        (s, A::Hangup) if !s.is_idle() => Some(s.ended(EndReason::HungUp)),
        (s, A::RemoteEnded { call_id }) if s.is_call(&call_id) => {
            Some(s.ended(EndReason::RemoteHungUp))
        }
        (s, A::Failed(reason)) if !s.is_idle() => Some(s.ended(EndReason::Failed(reason))),

        (S::Ended { .. }, A::Dismiss) => Some(S::Idle),

        (_, action) => {
            tracing::debug!("ignoring {:?} while {}", action, state.label());
            None
        }
    };
    next.unwrap_or_else(|| state.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use api::CallStatus;

    fn session(id: &str) -> CallSession {
        CallSession {
            id: id.into(),
            caller_id: "alice".into(),
            callee_id: "bob".into(),
            channel_name: format!("{id}-chan"),
            status: CallStatus::Ringing,
            started_at: None,
        }
    }

    fn run(actions: Vec<CallAction>) -> CallState {
        actions
            .into_iter()
            .fold(CallState::Idle, |state, action| reduce(&state, action))
    }

    #[test]
    fn test_outgoing_call_happy_path() {
        let state = run(vec![
            CallAction::Dial(session("k1")),
            CallAction::RemoteAccepted {
                call_id: "k1".into(),
            },
            CallAction::AudioJoined,
            CallAction::ToggleMute,
        ]);
        assert_eq!(
            state,
            CallState::Active {
                session: session("k1"),
                muted: true
            }
        );

        let state = reduce(&state, CallAction::Hangup);
        assert_eq!(
            state,
            CallState::Ended {
                call_id: "k1".into(),
                reason: EndReason::HungUp
            }
        );
        assert_eq!(reduce(&state, CallAction::Dismiss), CallState::Idle);
    }

    #[test]
    fn test_incoming_declined_and_missed() {
        let declined = run(vec![
            CallAction::Incoming(session("k2")),
            CallAction::Decline,
        ]);
        assert!(matches!(
            declined,
            CallState::Ended {
                reason: EndReason::Declined,
                ..
            }
        ));

        let missed = run(vec![
            CallAction::Incoming(session("k3")),
            CallAction::RingTimeout {
                call_id: "k3".into(),
            },
        ]);
        assert!(matches!(
            missed,
            CallState::Ended {
                reason: EndReason::Missed,
                ..
            }
        ));
    }

    #[test]
    fn test_other_call_ids_are_ignored() {
        let ringing = run(vec![CallAction::Dial(session("k4"))]);
        for action in [
            CallAction::RemoteAccepted {
                call_id: "other".into(),
            },
            CallAction::RemoteRejected {
                call_id: "other".into(),
            },
            CallAction::RemoteEnded {
                call_id: "other".into(),
            },
            CallAction::RingTimeout {
                call_id: "other".into(),
            },
        ] {
            assert_eq!(reduce(&ringing, action), ringing);
        }
    }

    #[test]
    fn test_invalid_actions_keep_state() {
        assert_eq!(reduce(&CallState::Idle, CallAction::Accept), CallState::Idle);
        assert_eq!(reduce(&CallState::Idle, CallAction::Hangup), CallState::Idle);
        assert_eq!(reduce(&CallState::Idle, CallAction::Dismiss), CallState::Idle);

        let outgoing = run(vec![CallAction::Dial(session("k5"))]);
        assert_eq!(reduce(&outgoing, CallAction::Accept), outgoing);
        assert_eq!(reduce(&outgoing, CallAction::AudioJoined), outgoing);
        assert_eq!(reduce(&outgoing, CallAction::Incoming(session("k6"))), outgoing);
    }

    #[test]
    fn test_new_call_allowed_from_ended() {
        let ended = run(vec![
            CallAction::Dial(session("k7")),
            CallAction::RemoteRejected {
                call_id: "k7".into(),
            },
        ]);
        assert!(ended.is_idle());
        assert_eq!(
            reduce(&ended, CallAction::Incoming(session("k8"))),
            CallState::Incoming {
                session: session("k8")
            }
        );
    }

    #[test]
    fn test_failure_while_connecting() {
        let state = run(vec![
            CallAction::Incoming(session("k9")),
            CallAction::Accept,
            CallAction::Failed("no microphone".into()),
        ]);
        assert_eq!(
            state,
            CallState::Ended {
                call_id: "k9".into(),
                reason: EndReason::Failed("no microphone".into())
            }
        );
    }
}
