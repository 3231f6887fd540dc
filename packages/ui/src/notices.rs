//! User-facing notices: failed sends, connection changes, call problems.
//!
//! Notices are kept in a `Signal<NoticeLog>` provided by [`NoticeProvider`].
//! A notice identical to the newest one bumps its repeat counter instead of
//! adding a row, so a flapping connection shows up once. Errors open the
//! tray on their own; everything else waits behind the unseen badge.

use dioxus::prelude::*;
use realtime::ConnectionStatus;

use crate::icons::{FaBell, FaXmark};
use crate::Icon;

const NOTICES_CSS: Asset = asset!("/assets/styling/notices.css");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    fn class(self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    /// How many more times the same notice arrived in a row.
    pub repeats: u32,
    /// Local wall-clock time of the latest occurrence; empty off the web.
    pub at: String,
    pub seen: bool,
}

#[derive(Clone, Debug, Default)]
pub struct NoticeLog {
    entries: Vec<Notice>,
    next_id: u64,
    pub open: bool,
}

impl NoticeLog {
    const CAPACITY: usize = 100;

    pub fn push(&mut self, level: NoticeLevel, message: &str) {
        if level == NoticeLevel::Error {
            self.open = true;
        }
        if let Some(last) = self.entries.last_mut() {
            if last.level == level && last.message == message {
                last.repeats += 1;
                last.at = local_time();
                last.seen = self.open;
                return;
            }
        }
        if self.entries.len() == Self::CAPACITY {
            self.entries.remove(0);
        }
        self.next_id += 1;
        self.entries.push(Notice {
            id: self.next_id,
            level,
            message: message.to_string(),
            repeats: 0,
            at: local_time(),
            seen: self.open,
        });
    }

    /// Oldest first.
    pub fn entries(&self) -> &[Notice] {
        &self.entries
    }

    pub fn unseen(&self) -> usize {
        self.entries.iter().filter(|n| !n.seen).count()
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|n| n.level == NoticeLevel::Error)
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
        if open {
            for notice in &mut self.entries {
                notice.seen = true;
            }
        }
    }

    pub fn dismiss(&mut self, id: u64) {
        self.entries.retain(|n| n.id != id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Turns connection status changes into notices worth showing.
///
/// A drop is reported once, when reconnecting starts, and recovery once,
/// when the socket is live again. A deliberate sign-out never reconnects and
/// stays quiet.
#[derive(Debug, Default)]
pub struct ConnectionWatch {
    was_live: bool,
    lost: bool,
}

impl ConnectionWatch {
    pub fn observe(&mut self, status: ConnectionStatus) -> Option<(NoticeLevel, &'static str)> {
        match status {
            ConnectionStatus::Connected => {
                self.was_live = true;
                std::mem::take(&mut self.lost)
                    .then_some((NoticeLevel::Success, "Live updates are back"))
            }
            ConnectionStatus::Connecting { .. } if self.was_live && !self.lost => {
                self.lost = true;
                Some((NoticeLevel::Warning, "Connection lost, reconnecting"))
            }
            ConnectionStatus::Fallback => {
                self.was_live = false;
                self.lost = false;
                Some((
                    NoticeLevel::Warning,
                    "Live updates unavailable, messages are sent without them",
                ))
            }
            _ => None,
        }
    }
}

pub fn use_notices() -> Signal<NoticeLog> {
    use_context::<Signal<NoticeLog>>()
}

/// Log `message` and add it to the tray.
pub fn notify(log: &mut Signal<NoticeLog>, level: NoticeLevel, message: &str) {
    match level {
        NoticeLevel::Error => tracing::error!("{}", message),
        NoticeLevel::Warning => tracing::warn!("{}", message),
        _ => tracing::info!("{}", message),
    }
    log.write().push(level, message);
}

#[cfg(target_arch = "wasm32")]
fn local_time() -> String {
    String::from(js_sys::Date::new_0().to_locale_time_string("default"))
}

#[cfg(not(target_arch = "wasm32"))]
fn local_time() -> String {
    String::new()
}

#[component]
pub fn NoticeProvider(children: Element) -> Element {
    use_context_provider(|| Signal::new(NoticeLog::default()));
    rsx! {
        {children}
    }
}

/// Dismissible list of notices, newest on top.
#[component]
pub fn NoticeTray() -> Element {
    let mut log = use_notices();

    if !log.read().open {
        return rsx! {};
    }
    let notices: Vec<Notice> = log.read().entries().iter().rev().cloned().collect();

    rsx! {
        document::Stylesheet { href: NOTICES_CSS }

        aside {
            class: "notice-tray",
            header {
                class: "notice-tray-header",
                strong { "Notices" }
                if !notices.is_empty() {
                    button { class: "link-btn", onclick: move |_| log.write().clear(), "Clear all" }
                }
                button {
                    class: "icon-btn",
                    title: "Close",
                    onclick: move |_| log.write().set_open(false),
                    Icon { icon: FaXmark, width: 12, height: 12 }
                }
            }
            if notices.is_empty() {
                p { class: "muted", "Nothing to report." }
            }
            ul {
                for notice in notices {
                    li {
                        key: "{notice.id}",
                        class: format!("notice notice--{}", notice.level.class()),
                        span { class: "notice-message", "{notice.message}" }
                        if notice.repeats > 0 {
                            span { class: "notice-repeats", {format!("×{}", notice.repeats + 1)} }
                        }
                        if !notice.at.is_empty() {
                            time { class: "notice-time", "{notice.at}" }
                        }
                        button {
                            class: "icon-btn",
                            title: "Dismiss",
                            onclick: move |_| log.write().dismiss(notice.id),
                            Icon { icon: FaXmark, width: 10, height: 10 }
                        }
                    }
                }
            }
        }
    }
}

/// Bell with the unseen count; opens and closes the tray.
#[component]
pub fn NoticeBell() -> Element {
    let mut log = use_notices();
    let unseen = log.read().unseen();
    let alert = log.read().has_errors();

    rsx! {
        document::Stylesheet { href: NOTICES_CSS }

        button {
            class: if alert { "notice-bell alert" } else { "notice-bell" },
            title: "Notices",
            onclick: move |_| {
                let open = log.read().open;
                log.write().set_open(!open);
            },
            Icon { icon: FaBell, width: 14, height: 14 }
            if unseen > 0 {
                span { class: "notice-badge", "{unseen}" }
            }
        }
    }
}
