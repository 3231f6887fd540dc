//! # Live updates context
//!
//! [`RealtimeProvider`] owns the socket for the signed-in user. Whenever the
//! session changes it cancels the previous pump and, if someone is signed in,
//! starts a new [`Connection`] on the platform transport. Components reach it
//! through [`use_live`]:
//!
//! | Member | Use |
//! |--------|-----|
//! | `dispatcher` | register handlers, or use [`use_server_event`] |
//! | `status` | signal mirroring the connection state |
//! | [`Live::send`] | write a frame when connected |
//! | [`Live::messenger`] | send text with REST fallback |

use std::cell::RefCell;

use api::ApiClient;
use dioxus::prelude::*;
use realtime::call::Signaling;
use realtime::{
    ClientFrame, Connection, ConnectionStatus, Dispatcher, Messenger, PlatformTransport,
    RealtimeError, RealtimeHandle, ReconnectPolicy, ServerEvent,
};

use crate::notices::{notify, use_notices, ConnectionWatch, NoticeLevel};
use crate::session::{use_api, use_client_config, use_session};

#[derive(Clone)]
pub struct Live {
    pub dispatcher: Dispatcher,
    pub status: Signal<ConnectionStatus>,
    handle: Signal<RealtimeHandle>,
}

impl Live {
    /// Handle to the current connection; detached when signed out.
    pub fn handle(&self) -> RealtimeHandle {
        self.handle.peek().clone()
    }

    pub fn send(&self, frame: ClientFrame) -> Result<(), RealtimeError> {
        self.handle.peek().send(frame)
    }

    pub fn messenger(&self, api: ApiClient) -> Messenger<ApiClient> {
        Messenger::new(self.handle(), api)
    }
}

impl Signaling for Live {
    fn signal(&self, frame: ClientFrame) -> Result<(), RealtimeError> {
        self.send(frame)
    }
}

pub fn use_live() -> Live {
    use_context::<Live>()
}

/// Run `handler` for every `event` while the calling component is mounted.
pub fn use_server_event(event: &'static str, handler: impl Fn(&ServerEvent) + 'static) {
    let live = use_live();
    let dispatcher = live.dispatcher.clone();
    let id = use_hook(move || dispatcher.on(event, handler));
    use_drop(move || {
        live.dispatcher.off(id);
    });
}

#[component]
pub fn RealtimeProvider(children: Element) -> Element {
    let session = use_session();
    let api = use_api();
    let config = use_client_config();
    let notices = use_notices();

    let dispatcher = use_hook(Dispatcher::new);
    let mut status = use_signal(ConnectionStatus::default);
    let mut handle = use_signal(RealtimeHandle::detached);
    use_context_provider(|| Live {
        dispatcher: dispatcher.clone(),
        status,
        handle,
    });
    let mut pump: Signal<Option<Task>> = use_signal(|| None);

    use_effect(move || {
        let user_id = session.read().user_id().map(str::to_string);

        if let Some(task) = pump.write().take() {
            handle.peek().disconnect();
            task.cancel();
        }
        handle.set(RealtimeHandle::detached());
        status.set(ConnectionStatus::Disconnected);

        let (Some(user_id), Some(token)) = (user_id, api.token()) else {
            return;
        };
        let url = match config.websocket_url() {
            Ok(url) => url,
            Err(e) => {
                let mut notices = notices;
                notify(&mut notices, NoticeLevel::Error, &format!("Live updates disabled: {e}"));
                return;
            }
        };

        tracing::info!("starting live updates for {}", user_id);
        let policy = ReconnectPolicy::from_settings(&config.realtime);
        let mut connection = Connection::new(PlatformTransport::new(), url, token, policy);
        let watch = RefCell::new(ConnectionWatch::default());
        connection.status().subscribe(move |next| {
            let (mut status, mut notices) = (status, notices);
            status.set(next);
            if let Some((level, message)) = watch.borrow_mut().observe(next) {
                notify(&mut notices, level, message);
            }
        });
        handle.set(connection.handle());

        let dispatcher = dispatcher.clone();
        let task = spawn(async move {
            let mut notices = notices;
            match connection.run(&dispatcher).await {
                Ok(()) => tracing::info!("live updates stopped"),
                // already reported through the status watch
                Err(RealtimeError::ReconnectExhausted { attempts }) => {
                    tracing::warn!("live updates gave up after {} attempts", attempts)
                }
                Err(RealtimeError::AuthRejected(reason)) => notify(
                    &mut notices,
                    NoticeLevel::Error,
                    &format!("Live updates refused your session ({reason}). Sign in again to restore them."),
                ),
                Err(e) => notify(&mut notices, NoticeLevel::Error, &format!("Live updates: {e}")),
            }
        });
        pump.set(Some(task));
    });

    rsx! {
        {children}
    }
}
