//! # UI crate — shared Dioxus components for Circles
//!
//! Context providers, hooks and views used by the platform binaries. The
//! binaries own routing and pass navigation in as event handlers.
//!
//! ## Providers (outermost first)
//!
//! | Provider | Context | Hook |
//! |----------|---------|------|
//! | [`NoticeProvider`] | `Signal<NoticeLog>` | [`use_notices`] |
//! | [`SessionProvider`] | `ApiClient`, `ClientConfig`, `Signal<Session>` | [`use_api`], [`use_session`] |
//! | [`RealtimeProvider`] | [`Live`] | [`use_live`], [`use_server_event`] |
//! | [`CallProvider`] | [`Calls`] | [`use_calls`] |

use dioxus::prelude::*;

// Re-export icon library
pub use dioxus_free_icons::Icon;
pub mod icons {
    pub use dioxus_free_icons::icons::fa_solid_icons::*;
}

mod storage;

mod session;
pub use session::{
    sign_in, sign_out, use_api, use_client_config, use_session, LogoutButton, Session,
    SessionProvider,
};

pub mod notices;
pub use notices::{
    notify, use_notices, ConnectionWatch, NoticeBell, NoticeLevel, NoticeLog, NoticeProvider,
    NoticeTray,
};

mod live;
pub use live::{use_live, use_server_event, Live, RealtimeProvider};

mod calls;
pub use calls::{use_calls, CallPanel, CallProvider, Calls};

mod connection_indicator;
pub use connection_indicator::ConnectionIndicator;

mod recorder;

pub mod views;

/// All providers in the order they depend on each other.
#[component]
pub fn AppProviders(config: api::ClientConfig, children: Element) -> Element {
    rsx! {
        NoticeProvider {
            SessionProvider { config,
                RealtimeProvider {
                    CallProvider {
                        {children}
                    }
                }
            }
        }
    }
}
