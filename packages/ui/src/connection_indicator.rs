//! Live-updates status indicator for the top bar.

use dioxus::prelude::*;
use realtime::ConnectionStatus;

use crate::icons::{FaCloud, FaCloudArrowUp, FaRotate, FaUserSlash};
use crate::live::use_live;
use crate::Icon;

const CONNECTION_CSS: Asset = asset!("/assets/styling/connection.css");

/// A small icon that shows the socket state.
///
/// - **Connected**: green cloud ("Live")
/// - **Connecting / signing in**: spinning arrows
/// - **Fallback**: orange cloud-up, messages go over REST
/// - **Disconnected**: gray slashed user
#[component]
pub fn ConnectionIndicator() -> Element {
    let live = use_live();
    let status = (live.status)();

    let icon = match status {
        ConnectionStatus::Connected => rsx! {
            span {
                class: "connection-indicator connection-indicator--live",
                title: "Live",
                Icon { icon: FaCloud, width: 14, height: 14 }
            }
        },
        ConnectionStatus::Connecting { attempt } => rsx! {
            span {
                class: "connection-indicator connection-indicator--connecting",
                title: "Connecting (attempt {attempt})",
                Icon { icon: FaRotate, width: 14, height: 14 }
            }
        },
        ConnectionStatus::Authenticating => rsx! {
            span {
                class: "connection-indicator connection-indicator--connecting",
                title: "Signing in",
                Icon { icon: FaRotate, width: 14, height: 14 }
            }
        },
        ConnectionStatus::Fallback => rsx! {
            span {
                class: "connection-indicator connection-indicator--fallback",
                title: "Live updates unavailable",
                Icon { icon: FaCloudArrowUp, width: 14, height: 14 }
            }
        },
        ConnectionStatus::Disconnected => rsx! {
            span {
                class: "connection-indicator connection-indicator--offline",
                title: "Offline",
                Icon { icon: FaUserSlash, width: 14, height: 14 }
            }
        },
    };

    rsx! {
        document::Stylesheet { href: CONNECTION_CSS }
        {icon}
    }
}
