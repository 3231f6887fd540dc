//! Call context and the floating call panel.

use std::rc::Rc;
use std::time::Duration;

use api::ApiClient;
use dioxus::prelude::*;
use futures::lock::Mutex;
use realtime::call::{CallController, CallError, CallState};
use realtime::protocol::names;
use realtime::ServerEvent;

use crate::live::{use_live, use_server_event, Live};
use crate::notices::{notify, use_notices, NoticeLevel, NoticeLog};
use crate::session::{use_api, use_client_config, use_session};
use crate::Icon;
use crate::icons::{FaMicrophone, FaMicrophoneSlash, FaPhone, FaPhoneSlash};

#[cfg(target_arch = "wasm32")]
type Engine = realtime::call::BrowserAudioEngine;
#[cfg(not(target_arch = "wasm32"))]
type Engine = realtime::call::SilentEngine;

type Controller = CallController<ApiClient, Live, Engine>;

const CALL_CSS: Asset = asset!("/assets/styling/call.css");

/// Handle to the signed-in user's calls. Every method returns immediately;
/// the work runs on the UI executor and lands in [`Calls::state`].
#[derive(Clone, Copy)]
pub struct Calls {
    pub state: Signal<CallState>,
    controller: Signal<Option<Rc<Mutex<Controller>>>>,
    notices: Signal<NoticeLog>,
    ring_timeout: Duration,
}

pub fn use_calls() -> Calls {
    use_context::<Calls>()
}

impl Calls {
    fn controller(&self) -> Option<Rc<Mutex<Controller>>> {
        self.controller.peek().clone()
    }

    /// Publish the result of a controller operation.
    fn finish(self, result: Result<CallState, CallError>) {
        let mut this = self;
        match result {
            Ok(state) => {
                if let CallState::Outgoing { session } | CallState::Incoming { session } = &state {
                    this.arm_ring_timer(session.id.clone());
                }
                this.state.set(state);
            }
            Err(e) => notify(&mut this.notices, NoticeLevel::Error, &e.to_string()),
        }
    }

    fn arm_ring_timer(self, call_id: String) {
        spawn(async move {
            realtime::time::sleep(self.ring_timeout).await;
            let Some(controller) = self.controller() else {
                return;
            };
            let state = controller.lock().await.ring_timeout(&call_id).await.clone();
            let mut this = self;
            this.state.set(state);
        });
    }

    pub fn dial(self, callee_id: String) {
        spawn(async move {
            let Some(controller) = self.controller() else {
                return;
            };
            let mut controller = controller.lock().await;
            let result = controller.dial(&callee_id).await.cloned();
            self.finish(result);
        });
    }

    pub fn accept(self) {
        spawn(async move {
            let Some(controller) = self.controller() else {
                return;
            };
            let mut controller = controller.lock().await;
            let result = controller.accept().await.cloned();
            self.finish(result);
        });
    }

    pub fn decline(self) {
        spawn(async move {
            let Some(controller) = self.controller() else {
                return;
            };
            let mut controller = controller.lock().await;
            let result = controller.decline().await.cloned();
            self.finish(result);
        });
    }

    pub fn hang_up(self) {
        spawn(async move {
            let Some(controller) = self.controller() else {
                return;
            };
            let mut controller = controller.lock().await;
            let result = controller.hang_up().await.cloned();
            self.finish(result);
        });
    }

    pub fn toggle_mute(self) {
        spawn(async move {
            let Some(controller) = self.controller() else {
                return;
            };
            let mut controller = controller.lock().await;
            let result = controller.toggle_mute().await.cloned();
            self.finish(result);
        });
    }

    pub fn dismiss(self) {
        spawn(async move {
            let Some(controller) = self.controller() else {
                return;
            };
            let state = controller.lock().await.dismiss().clone();
            self.finish(Ok(state));
        });
    }

    /// End any call in progress. Awaited before signing out so the peer is
    /// told and the microphone is released while the socket is still up.
    pub async fn release(self) {
        if let Some(controller) = self.controller() {
            controller.lock().await.shutdown().await;
        }
        let mut this = self;
        this.state.set(CallState::Idle);
    }

    fn handle_event(self, event: ServerEvent) {
        spawn(async move {
            let Some(controller) = self.controller() else {
                return;
            };
            let state = controller.lock().await.handle_event(&event).await.clone();
            self.finish(Ok(state));
        });
    }
}

/// Provides [`Calls`]; must sit inside the realtime provider.
#[component]
pub fn CallProvider(children: Element) -> Element {
    let session = use_session();
    let api = use_api();
    let live = use_live();
    let config = use_client_config();
    let notices = use_notices();

    let mut state = use_signal(CallState::default);
    let mut controller = use_signal(|| None::<Rc<Mutex<Controller>>>);
    let calls = use_context_provider(|| Calls {
        state,
        controller,
        notices,
        ring_timeout: Duration::from_secs(config.call.ring_timeout_secs),
    });

    use_effect(move || {
        let me = session.read().user_id().map(str::to_string);
        if let Some(previous) = controller.peek().clone() {
            spawn(async move {
                let mut previous = previous.lock().await;
                if !previous.state().is_idle() {
                    previous.shutdown().await;
                }
            });
        }
        state.set(CallState::Idle);
        controller.set(me.map(|me| {
            Rc::new(Mutex::new(CallController::new(
                me,
                api.clone(),
                live.clone(),
                Engine::default(),
            )))
        }));
    });

    for name in [
        names::INCOMING_CALL,
        names::CALL_ACCEPTED,
        names::CALL_REJECTED,
        names::CALL_ENDED,
    ] {
        use_server_event(name, move |event| calls.handle_event(event.clone()));
    }

    rsx! {
        {children}
    }
}

/// Shows the current call, if any, with its controls.
#[component]
pub fn CallPanel() -> Element {
    let calls = use_calls();
    let session = use_session();
    let api = use_api();
    let state = (calls.state)();

    let peer = use_resource(move || {
        let api = api.clone();
        let me = session.read().user_id().unwrap_or_default().to_string();
        let peer_id = calls
            .state
            .read()
            .session()
            .map(|s| s.peer_of(&me).to_string());
        async move {
            match peer_id {
                Some(id) => api.users().get(&id).await.ok(),
                None => None,
            }
        }
    });
    let peer_name = peer
        .cloned()
        .flatten()
        .map(|user| user.display_name().to_string())
        .unwrap_or_else(|| "Someone".to_string());

    let body = match &state {
        CallState::Idle => return rsx! {},
        CallState::Outgoing { .. } => rsx! {
            p { class: "call-status", "Calling {peer_name}..." }
            div { class: "call-actions",
                button { class: "call-btn hang-up", onclick: move |_| calls.hang_up(),
                    Icon { icon: FaPhoneSlash, width: 16, height: 16 }
                    " Cancel"
                }
            }
        },
        CallState::Incoming { .. } => rsx! {
            p { class: "call-status", "{peer_name} is calling" }
            div { class: "call-actions",
                button { class: "call-btn accept", onclick: move |_| calls.accept(),
                    Icon { icon: FaPhone, width: 16, height: 16 }
                    " Accept"
                }
                button { class: "call-btn hang-up", onclick: move |_| calls.decline(),
                    Icon { icon: FaPhoneSlash, width: 16, height: 16 }
                    " Decline"
                }
            }
        },
        CallState::Connecting { .. } => rsx! {
            p { class: "call-status", "Connecting audio with {peer_name}..." }
            div { class: "call-actions",
                button { class: "call-btn hang-up", onclick: move |_| calls.hang_up(), "Hang up" }
            }
        },
        CallState::Active { muted, .. } => {
            let muted = *muted;
            rsx! {
                p { class: "call-status", "In call with {peer_name}" }
                div { class: "call-actions",
                    button {
                        class: if muted { "call-btn muted" } else { "call-btn" },
                        title: if muted { "Unmute" } else { "Mute" },
                        onclick: move |_| calls.toggle_mute(),
                        if muted {
                            Icon { icon: FaMicrophoneSlash, width: 16, height: 16 }
                        } else {
                            Icon { icon: FaMicrophone, width: 16, height: 16 }
                        }
                    }
                    button { class: "call-btn hang-up", onclick: move |_| calls.hang_up(),
                        Icon { icon: FaPhoneSlash, width: 16, height: 16 }
                        " Hang up"
                    }
                }
            }
        }
        CallState::Ended { reason, .. } => {
            let text = reason.describe();
            rsx! {
                p { class: "call-status", "{text}" }
                div { class: "call-actions",
                    button { class: "call-btn", onclick: move |_| calls.dismiss(), "Dismiss" }
                }
            }
        }
    };

    let label = state.label();
    rsx! {
        document::Stylesheet { href: CALL_CSS }
        div { class: "call-panel call-panel--{label}", {body} }
    }
}
