//! Drives one user's calls: REST signaling records, socket frames, the audio
//! engine and the [`reduce`] state machine.
//!
//! Outgoing: `dial` creates the session over REST, sends `call-initiate` and
//! waits. When `call-accepted` arrives both sides fetch credentials and join
//! audio. Incoming: an `incoming-call` event moves to ringing; `accept`
//! answers with `call-accept` and joins. Either side may `hang_up`, which
//! sends `call-end`, marks the session ended and leaves the channel.

use std::future::Future;

use api::{ApiClient, ApiError, CallCredentials, CallSession, CallStatus};

use super::audio::AudioEngine;
use super::reducer::{reduce, CallAction, CallState};
use crate::connection::RealtimeHandle;
use crate::error::RealtimeError;
use crate::protocol::{ClientFrame, ServerEvent};

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("already in a call")]
    Busy,
    #[error("no active call")]
    NoActiveCall,
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error(transparent)]
    Audio(#[from] super::audio::AudioError),
    #[error(transparent)]
    Signal(#[from] RealtimeError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Call records on the backend.
pub trait CallBackend {
    fn start(&self, callee_id: &str) -> impl Future<Output = Result<CallSession, ApiError>>;

    fn credentials(&self, call_id: &str) -> impl Future<Output = Result<CallCredentials, ApiError>>;

    fn update_status(
        &self,
        call_id: &str,
        status: CallStatus,
    ) -> impl Future<Output = Result<CallSession, ApiError>>;
}

impl CallBackend for ApiClient {
    async fn start(&self, callee_id: &str) -> Result<CallSession, ApiError> {
        self.calls().start(callee_id).await
    }

    async fn credentials(&self, call_id: &str) -> Result<CallCredentials, ApiError> {
        self.calls().credentials(call_id).await
    }

    async fn update_status(&self, call_id: &str, status: CallStatus) -> Result<CallSession, ApiError> {
        self.calls().update_status(call_id, status).await
    }
}

/// Where call frames are sent.
pub trait Signaling {
    fn signal(&self, frame: ClientFrame) -> Result<(), RealtimeError>;
}

impl Signaling for RealtimeHandle {
    fn signal(&self, frame: ClientFrame) -> Result<(), RealtimeError> {
        self.send(frame)
    }
}

pub struct CallController<B, S, A> {
    me: String,
    backend: B,
    signal: S,
    audio: A,
    state: CallState,
}

impl<B: CallBackend, S: Signaling, A: AudioEngine> CallController<B, S, A> {
    pub fn new(me: impl Into<String>, backend: B, signal: S, audio: A) -> Self {
        Self {
            me: me.into(),
            backend,
            signal,
            audio,
            state: CallState::Idle,
        }
    }

    pub fn state(&self) -> &CallState {
        &self.state
    }

    pub fn me(&self) -> &str {
        &self.me
    }

    fn apply(&mut self, action: CallAction) -> &CallState {
        self.state = reduce(&self.state, action);
        &self.state
    }

    /// Send a frame without failing the caller; the server also tracks status over REST.
    fn signal_best_effort(&self, frame: ClientFrame) {
        let name = frame.name();
        if let Err(e) = self.signal.signal(frame) {
            tracing::warn!("could not send {}: {}", name, e);
        }
    }

    async fn mark(&self, call_id: &str, status: CallStatus) {
        if let Err(e) = self.backend.update_status(call_id, status).await {
            tracing::warn!("could not mark call {} {}: {}", call_id, status.as_str(), e);
        }
    }

    /// Start an outgoing call to `callee_id`.
    pub async fn dial(&mut self, callee_id: &str) -> Result<&CallState, CallError> {
        if !self.state.is_idle() {
            return Err(CallError::Busy);
        }
        let session = self.backend.start(callee_id).await?;
        tracing::info!("calling {} ({})", callee_id, session.id);
        let frame = ClientFrame::CallInitiate {
            call_id: session.id.clone(),
            recipient_id: callee_id.to_string(),
        };
        if let Err(e) = self.signal.signal(frame) {
            self.mark(&session.id, CallStatus::Ended).await;
            return Err(e.into());
        }
        Ok(self.apply(CallAction::Dial(session)))
    }

    /// Answer the ringing incoming call.
    pub async fn accept(&mut self) -> Result<&CallState, CallError> {
        let call_id = match &self.state {
            CallState::Incoming { session } => session.id.clone(),
            other => {
                return Err(CallError::InvalidTransition {
                    action: "accept",
                    state: other.label(),
                })
            }
        };
        self.signal.signal(ClientFrame::CallAccept {
            call_id: call_id.clone(),
        })?;
        self.mark(&call_id, CallStatus::Accepted).await;
        self.apply(CallAction::Accept);
        self.join_audio().await;
        Ok(&self.state)
    }

    pub async fn decline(&mut self) -> Result<&CallState, CallError> {
        let call_id = match &self.state {
            CallState::Incoming { session } => session.id.clone(),
            other => {
                return Err(CallError::InvalidTransition {
                    action: "decline",
                    state: other.label(),
                })
            }
        };
        self.signal_best_effort(ClientFrame::CallReject {
            call_id: call_id.clone(),
            reason: None,
        });
        self.mark(&call_id, CallStatus::Rejected).await;
        Ok(self.apply(CallAction::Decline))
    }

    /// End whatever call is in progress, ringing or live.
    pub async fn hang_up(&mut self) -> Result<&CallState, CallError> {
        let Some(call_id) = self.state.session().map(|s| s.id.clone()) else {
            return Err(CallError::NoActiveCall);
        };
        let was_live = matches!(
            self.state,
            CallState::Connecting { .. } | CallState::Active { .. }
        );
        self.signal_best_effort(ClientFrame::CallEnd {
            call_id: call_id.clone(),
        });
        self.mark(&call_id, CallStatus::Ended).await;
        if was_live {
            if let Err(e) = self.audio.leave().await {
                tracing::warn!("leaving audio failed: {}", e);
            }
        }
        Ok(self.apply(CallAction::Hangup))
    }

    pub async fn toggle_mute(&mut self) -> Result<&CallState, CallError> {
        let muted = match &self.state {
            CallState::Active { muted, .. } => *muted,
            _ => return Err(CallError::NoActiveCall),
        };
        self.audio.set_muted(!muted).await?;
        Ok(self.apply(CallAction::ToggleMute))
    }

    /// The ring timer for `call_id` expired. No-op if that call was answered.
    pub async fn ring_timeout(&mut self, call_id: &str) -> &CallState {
        let ringing = matches!(
            &self.state,
            CallState::Outgoing { session } | CallState::Incoming { session } if session.id == call_id
        );
        if ringing {
            tracing::info!("call {} was not answered", call_id);
            if matches!(self.state, CallState::Outgoing { .. }) {
                self.signal_best_effort(ClientFrame::CallEnd {
                    call_id: call_id.to_string(),
                });
            }
            self.mark(call_id, CallStatus::Missed).await;
        }
        self.apply(CallAction::RingTimeout {
            call_id: call_id.to_string(),
        })
    }

    pub fn dismiss(&mut self) -> &CallState {
        self.apply(CallAction::Dismiss)
    }

    /// End any call in progress and return to idle, e.g. before signing out.
    pub async fn shutdown(&mut self) -> &CallState {
        if self.state.session().is_some() {
            if let Err(e) = self.hang_up().await {
                tracing::warn!("could not end call on shutdown: {}", e);
            }
        }
        self.state = CallState::Idle;
        &self.state
    }

    /// React to a socket event. Non-call events are ignored.
    pub async fn handle_event(&mut self, event: &ServerEvent) -> &CallState {
        match event {
            ServerEvent::IncomingCall(session) => {
                if self.state.call_id() == Some(session.id.as_str()) {
                    tracing::debug!("call {} is already known, ignoring redelivery", session.id);
                    return &self.state;
                }
                if !self.state.is_idle() {
                    tracing::info!("rejecting call {} while busy", session.id);
                    self.signal_best_effort(ClientFrame::CallReject {
                        call_id: session.id.clone(),
                        reason: Some("busy".to_string()),
                    });
                    return &self.state;
                }
                tracing::info!("incoming call from {}", session.caller_id);
                self.apply(CallAction::Incoming(session.clone()));
            }
            ServerEvent::CallAccepted { call_id } => {
                let before = self.state.clone();
                self.apply(CallAction::RemoteAccepted {
                    call_id: call_id.clone(),
                });
                if before != self.state {
                    self.join_audio().await;
                }
            }
            ServerEvent::CallRejected { call_id, reason } => {
                if let Some(reason) = reason {
                    tracing::info!("call {} rejected: {}", call_id, reason);
                }
                self.apply(CallAction::RemoteRejected {
                    call_id: call_id.clone(),
                });
            }
            ServerEvent::CallEnded { call_id } => {
                let was_live = matches!(
                    &self.state,
                    CallState::Connecting { session } | CallState::Active { session, .. }
                        if &session.id == call_id
                );
                self.apply(CallAction::RemoteEnded {
                    call_id: call_id.clone(),
                });
                if was_live {
                    if let Err(e) = self.audio.leave().await {
                        tracing::warn!("leaving audio failed: {}", e);
                    }
                }
            }
            _ => {}
        }
        &self.state
    }

    /// Fetch credentials and join the channel for the connecting call.
    async fn join_audio(&mut self) {
        let CallState::Connecting { session } = &self.state else {
            return;
        };
        let call_id = session.id.clone();
        let joined = match self.backend.credentials(&call_id).await {
            Ok(credentials) => self.audio.join(&credentials).await.map_err(CallError::from),
            Err(e) => Err(CallError::from(e)),
        };
        match joined {
            Ok(()) => {
                tracing::info!("audio connected for call {}", call_id);
                self.apply(CallAction::AudioJoined);
            }
            Err(e) => {
                tracing::error!("audio join failed for call {}: {}", call_id, e);
                self.signal_best_effort(ClientFrame::CallEnd {
                    call_id: call_id.clone(),
                });
                if let Err(e) = self.audio.leave().await {
                    tracing::debug!("leave after failed join: {}", e);
                }
                self.mark(&call_id, CallStatus::Ended).await;
                self.apply(CallAction::Failed(e.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::audio::{AudioOp, SilentEngine};
    use crate::call::reducer::EndReason;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct FakeBackend {
        statuses: Rc<RefCell<Vec<(String, CallStatus)>>>,
        no_credentials: bool,
    }

    fn session(id: &str, caller: &str, callee: &str) -> CallSession {
        CallSession {
            id: id.into(),
            caller_id: caller.into(),
            callee_id: callee.into(),
            channel_name: format!("{id}-chan"),
            status: CallStatus::Ringing,
            started_at: None,
        }
    }

    impl CallBackend for FakeBackend {
        async fn start(&self, callee_id: &str) -> Result<CallSession, ApiError> {
            Ok(session("k1", "me", callee_id))
        }

        async fn credentials(&self, call_id: &str) -> Result<CallCredentials, ApiError> {
            if self.no_credentials {
                return Err(ApiError::Status {
                    status: 403,
                    message: "not a participant".into(),
                });
            }
            Ok(CallCredentials {
                app_id: "app".into(),
                channel: format!("{call_id}-chan"),
                token: "tok".into(),
                uid: 1,
            })
        }

        async fn update_status(
            &self,
            call_id: &str,
            status: CallStatus,
        ) -> Result<CallSession, ApiError> {
            self.statuses
                .borrow_mut()
                .push((call_id.to_string(), status));
            let mut record = session(call_id, "me", "them");
            record.status = status;
            Ok(record)
        }
    }

    #[derive(Clone, Default)]
    struct FakeSignal {
        frames: Rc<RefCell<Vec<ClientFrame>>>,
    }

    impl Signaling for FakeSignal {
        fn signal(&self, frame: ClientFrame) -> Result<(), RealtimeError> {
            self.frames.borrow_mut().push(frame);
            Ok(())
        }
    }

    struct Offline;

    impl Signaling for Offline {
        fn signal(&self, _frame: ClientFrame) -> Result<(), RealtimeError> {
            Err(RealtimeError::NotConnected)
        }
    }

    fn controller(
        backend: FakeBackend,
    ) -> (
        CallController<FakeBackend, FakeSignal, SilentEngine>,
        FakeSignal,
        SilentEngine,
    ) {
        let signal = FakeSignal::default();
        let audio = SilentEngine::new();
        (
            CallController::new("me", backend, signal.clone(), audio.clone()),
            signal,
            audio,
        )
    }

    #[tokio::test]
    async fn test_outgoing_call_joins_audio_after_accept() {
        let (mut calls, signal, audio) = controller(FakeBackend::default());

        calls.dial("them").await.unwrap();
        assert!(matches!(calls.state(), CallState::Outgoing { .. }));
        assert_eq!(
            signal.frames.borrow()[0],
            ClientFrame::CallInitiate {
                call_id: "k1".into(),
                recipient_id: "them".into()
            }
        );

        calls
            .handle_event(&ServerEvent::CallAccepted {
                call_id: "k1".into(),
            })
            .await;
        assert!(matches!(calls.state(), CallState::Active { muted: false, .. }));
        assert_eq!(
            audio.ops(),
            vec![AudioOp::Join {
                channel: "k1-chan".into(),
                uid: 1
            }]
        );

        calls.toggle_mute().await.unwrap();
        assert!(calls.state().is_muted());

        calls.hang_up().await.unwrap();
        assert_eq!(
            calls.state(),
            &CallState::Ended {
                call_id: "k1".into(),
                reason: EndReason::HungUp
            }
        );
        assert_eq!(audio.ops().last(), Some(&AudioOp::Leave));
        assert!(matches!(
            signal.frames.borrow().last(),
            Some(ClientFrame::CallEnd { .. })
        ));
    }

    #[tokio::test]
    async fn test_dial_while_busy_fails() {
        let (mut calls, _signal, _audio) = controller(FakeBackend::default());
        calls.dial("them").await.unwrap();
        assert!(matches!(calls.dial("other").await, Err(CallError::Busy)));
    }

    #[tokio::test]
    async fn test_dial_offline_marks_session_ended() {
        let backend = FakeBackend::default();
        let mut calls = CallController::new("me", backend.clone(), Offline, SilentEngine::new());
        assert!(matches!(
            calls.dial("them").await,
            Err(CallError::Signal(RealtimeError::NotConnected))
        ));
        assert!(calls.state().is_idle());
        assert_eq!(
            *backend.statuses.borrow(),
            vec![("k1".to_string(), CallStatus::Ended)]
        );
    }

    #[tokio::test]
    async fn test_incoming_accept_and_remote_end() {
        let (mut calls, signal, audio) = controller(FakeBackend::default());
        calls
            .handle_event(&ServerEvent::IncomingCall(session("k2", "them", "me")))
            .await;
        assert!(matches!(calls.state(), CallState::Incoming { .. }));

        calls.accept().await.unwrap();
        assert!(matches!(calls.state(), CallState::Active { .. }));
        assert_eq!(
            signal.frames.borrow()[0],
            ClientFrame::CallAccept {
                call_id: "k2".into()
            }
        );

        calls
            .handle_event(&ServerEvent::CallEnded {
                call_id: "k2".into(),
            })
            .await;
        assert!(matches!(
            calls.state(),
            CallState::Ended {
                reason: EndReason::RemoteHungUp,
                ..
            }
        ));
        assert_eq!(audio.ops().last(), Some(&AudioOp::Leave));
    }

    #[tokio::test]
    async fn test_busy_rejects_second_incoming_call() {
        let (mut calls, signal, _audio) = controller(FakeBackend::default());
        calls.dial("them").await.unwrap();
        let before = calls.state().clone();

        calls
            .handle_event(&ServerEvent::IncomingCall(session("k9", "carol", "me")))
            .await;
        assert_eq!(calls.state(), &before);
        assert_eq!(
            signal.frames.borrow().last(),
            Some(&ClientFrame::CallReject {
                call_id: "k9".into(),
                reason: Some("busy".into())
            })
        );
    }

    #[tokio::test]
    async fn test_shutdown_leaves_live_call() {
        let backend = FakeBackend::default();
        let (mut calls, signal, audio) = controller(backend.clone());
        calls.dial("them").await.unwrap();
        calls
            .handle_event(&ServerEvent::CallAccepted {
                call_id: "k1".into(),
            })
            .await;
        assert!(matches!(calls.state(), CallState::Active { .. }));

        assert_eq!(calls.shutdown().await, &CallState::Idle);
        assert_eq!(audio.ops().last(), Some(&AudioOp::Leave));
        assert_eq!(
            signal.frames.borrow().last(),
            Some(&ClientFrame::CallEnd {
                call_id: "k1".into()
            })
        );
        assert_eq!(
            backend.statuses.borrow().last(),
            Some(&("k1".to_string(), CallStatus::Ended))
        );

        // nothing to end the second time
        let frames = signal.frames.borrow().len();
        calls.shutdown().await;
        assert_eq!(signal.frames.borrow().len(), frames);
    }

    #[tokio::test]
    async fn test_repeated_incoming_call_is_not_rejected() {
        let (mut calls, signal, _audio) = controller(FakeBackend::default());
        let ring = ServerEvent::IncomingCall(session("k2", "them", "me"));
        calls.handle_event(&ring).await;
        calls.handle_event(&ring).await;

        assert!(matches!(calls.state(), CallState::Incoming { session } if session.id == "k2"));
        assert!(signal.frames.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_audio_failure_ends_call() {
        let (mut calls, signal, audio) = controller(FakeBackend::default());
        audio.fail_joins("microphone blocked");
        calls
            .handle_event(&ServerEvent::IncomingCall(session("k3", "them", "me")))
            .await;
        calls.accept().await.unwrap();

        match calls.state() {
            CallState::Ended {
                reason: EndReason::Failed(reason),
                ..
            } => assert!(reason.contains("microphone blocked")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            signal.frames.borrow().last(),
            Some(ClientFrame::CallEnd { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_credentials_ends_call() {
        let backend = FakeBackend {
            no_credentials: true,
            ..Default::default()
        };
        let (mut calls, _signal, audio) = controller(backend);
        calls
            .handle_event(&ServerEvent::IncomingCall(session("k4", "them", "me")))
            .await;
        calls.accept().await.unwrap();
        assert!(matches!(
            calls.state(),
            CallState::Ended {
                reason: EndReason::Failed(_),
                ..
            }
        ));
        assert!(!audio.ops().iter().any(|op| matches!(op, AudioOp::Join { .. })));
    }

    #[tokio::test]
    async fn test_decline_and_ring_timeout() {
        let (mut calls, signal, _audio) = controller(FakeBackend::default());
        calls
            .handle_event(&ServerEvent::IncomingCall(session("k5", "them", "me")))
            .await;
        calls.decline().await.unwrap();
        assert!(matches!(
            signal.frames.borrow().last(),
            Some(ClientFrame::CallReject { reason: None, .. })
        ));
        calls.dismiss();
        assert_eq!(calls.state(), &CallState::Idle);

        calls.dial("them").await.unwrap();
        calls.ring_timeout("k1").await;
        assert!(matches!(
            calls.state(),
            CallState::Ended {
                reason: EndReason::Missed,
                ..
            }
        ));
        assert!(matches!(calls.accept().await, Err(CallError::InvalidTransition { .. })));
        assert!(matches!(calls.hang_up().await, Err(CallError::NoActiveCall)));
    }

    #[tokio::test]
    async fn test_stale_ring_timeout_is_ignored() {
        let (mut calls, _signal, _audio) = controller(FakeBackend::default());
        calls.dial("them").await.unwrap();
        calls
            .handle_event(&ServerEvent::CallAccepted {
                call_id: "k1".into(),
            })
            .await;
        calls.ring_timeout("k1").await;
        assert!(matches!(calls.state(), CallState::Active { .. }));
    }
}
