//! Signed-in user context and hooks.

use api::{ApiClient, AuthResponse, ClientConfig, User};
use dioxus::prelude::*;

use crate::calls::Calls;
use crate::storage;

/// Who is signed in.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    /// True until the stored token has been checked.
    pub loading: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

impl Session {
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

pub fn use_session() -> Signal<Session> {
    use_context::<Signal<Session>>()
}

/// The shared REST client. Clones share the bearer token.
pub fn use_api() -> ApiClient {
    use_context::<ApiClient>()
}

pub fn use_client_config() -> ClientConfig {
    use_context::<ClientConfig>()
}

/// Record a successful login or registration.
pub fn sign_in(session: &mut Signal<Session>, response: AuthResponse) {
    storage::save_token(&response.token);
    session.set(Session {
        user: Some(response.user),
        loading: false,
    });
}

/// Forget the user locally. The server is told on a best-effort basis.
pub async fn sign_out(api: &ApiClient, session: &mut Signal<Session>) {
    if let Err(e) = api.auth().logout().await {
        tracing::warn!("logout failed: {}", e);
    }
    storage::clear_token();
    session.set(Session {
        user: None,
        loading: false,
    });
}

/// Provides the REST client, the configuration and the [`Session`] signal.
///
/// On mount a token left in storage is checked against `/auth/me`; a token
/// the server no longer accepts is discarded.
#[component]
pub fn SessionProvider(config: ClientConfig, children: Element) -> Element {
    let api = use_context_provider(|| ApiClient::from_config(&config));
    use_context_provider(|| config.clone());
    let mut session = use_context_provider(|| Signal::new(Session::default()));

    let _ = use_resource(move || {
        let api = api.clone();
        async move {
            let Some(token) = storage::load_token() else {
                session.set(Session {
                    user: None,
                    loading: false,
                });
                return;
            };
            api.set_token(Some(token));
            match api.auth().me().await {
                Ok(user) => {
                    tracing::info!("restored session for {}", user.username);
                    session.set(Session {
                        user: Some(user),
                        loading: false,
                    });
                }
                Err(e) => {
                    if e.is_auth_failure() {
                        storage::clear_token();
                        api.set_token(None);
                    }
                    tracing::warn!("could not restore session: {}", e);
                    session.set(Session {
                        user: None,
                        loading: false,
                    });
                }
            }
        }
    });

    rsx! {
        {children}
    }
}

/// Button to sign the current user out.
#[component]
pub fn LogoutButton(
    #[props(default = "Sign out".to_string())] label: String,
    #[props(default = "".to_string())] class: String,
    #[props(default)] on_logout: EventHandler<()>,
) -> Element {
    let api = use_api();
    let mut session = use_session();
    let calls = try_use_context::<Calls>();

    let onclick = move |_| {
        let api = api.clone();
        async move {
            if let Some(calls) = calls {
                calls.release().await;
            }
            sign_out(&api, &mut session).await;
            on_logout.call(());
        }
    };

    rsx! {
        button {
            class: "{class}",
            onclick: onclick,
            "{label}"
        }
    }
}
