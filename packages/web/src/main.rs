use api::ClientConfig;
use dioxus::prelude::*;

use ui::{
    use_session, AppProviders, CallPanel, ConnectionIndicator, LogoutButton, NoticeBell,
    NoticeTray,
};
use views::{CircleChat, Circles, DirectMessages, Friends, Login, Register};

mod views;

#[derive(Debug, Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum Route {
    #[layout(AppShell)]
        #[route("/")]
        Root {},
        #[route("/circles")]
        Circles {},
        #[route("/circles/:circle_id")]
        CircleChat { circle_id: String },
        #[route("/messages/:peer_id")]
        DirectMessages { peer_id: String },
        #[route("/friends")]
        Friends {},
    #[end_layout]
    #[route("/login")]
    Login {},
    #[route("/register")]
    Register {},
}

const MAIN_CSS: Asset = asset!("/assets/main.css");
const BRIDGE_JS: Asset = asset!("/assets/circles-bridge.js");
const AUDIO_SDK_URL: &str = "https://download.agora.io/sdk/release/AgoraRTC_N-4.20.0.js";

fn main() {
    init_logging();
    dioxus::launch(App);
}

fn init_logging() {
    #[cfg(target_arch = "wasm32")]
    {
        let _ = dioxus::logger::init(dioxus::logger::tracing::Level::INFO);
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,realtime=debug"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}

/// Browser builds carry their configuration; native builds read
/// `circles.toml` and `CIRCLES_*` variables at startup.
fn load_config() -> ClientConfig {
    #[cfg(target_arch = "wasm32")]
    let loaded = ClientConfig::from_toml(include_str!("../circles.toml"));
    #[cfg(not(target_arch = "wasm32"))]
    let loaded = ClientConfig::load();

    loaded.unwrap_or_else(|e| {
        tracing::warn!("using default configuration: {}", e);
        ClientConfig::default()
    })
}

#[component]
fn App() -> Element {
    let config = use_hook(load_config);

    rsx! {
        // Global app resources
        document::Link { rel: "stylesheet", href: MAIN_CSS }
        document::Script { src: AUDIO_SDK_URL.to_string() }
        document::Script { src: BRIDGE_JS }

        AppProviders { config,
            Router::<Route> {}
        }
    }
}

/// Signed-in frame: top bar, page outlet, call panel and notices.
#[component]
fn AppShell() -> Element {
    let session = use_session();
    let nav = use_navigator();
    let state = session();

    if state.loading {
        return rsx! {
            div { class: "splash", "Loading..." }
        };
    }
    let Some(user) = state.user else {
        nav.replace(Route::Login {});
        return rsx! {};
    };

    rsx! {
        header {
            class: "topbar",
            span { class: "topbar-brand", "Circles" }
            nav {
                Link { to: Route::Circles {}, active_class: "active", "Circles" }
                Link { to: Route::Friends {}, active_class: "active", "Friends" }
            }
            div {
                class: "topbar-right",
                ConnectionIndicator {}
                span { class: "topbar-user", "{user.display_name()}" }
                NoticeBell {}
                LogoutButton {
                    class: "logout-btn",
                    on_logout: move |_| {
                        nav.replace(Route::Login {});
                    },
                }
            }
        }
        main {
            Outlet::<Route> {}
        }
        CallPanel {}
        NoticeTray {}
    }
}

/// Redirect `/` to `/circles`
#[component]
fn Root() -> Element {
    let nav = use_navigator();
    nav.replace(Route::Circles {});
    rsx! {}
}
