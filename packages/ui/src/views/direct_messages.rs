//! One-to-one conversation: text, voice notes and a call button.

use api::{DirectMessage, User};
use dioxus::prelude::*;
use futures::future::join_all;
use realtime::protocol::names;
use realtime::{Delivery, ServerEvent, Timeline};

use super::VIEWS_CSS;
use crate::calls::use_calls;
use crate::icons::{FaMicrophone, FaPhone, FaStop};
use crate::live::{use_live, use_server_event};
use crate::notices::{notify, use_notices, NoticeLevel};
use crate::recorder::{format_duration, start_recording, stop_recording};
use crate::session::{use_api, use_session};
use crate::Icon;
use url::Url;

/// Resolve a media path from the server against the API origin.
///
/// Absolute and `blob:` URLs pass through, `//host/...` takes the API's
/// scheme, and any other path is rooted at the API origin.
fn media_url(api_base: &str, path: &str) -> Result<String, url::ParseError> {
    if path.starts_with("http://") || path.starts_with("https://") || path.starts_with("blob:") {
        return Ok(path.to_string());
    }
    let base = Url::parse(api_base)?;
    let resolved = if path.starts_with("//") {
        base.join(path)?
    } else {
        base.join(&format!("/{}", path.trim_start_matches('/')))?
    };
    Ok(resolved.into())
}

/// Ids of messages from `peer_id` this user has not read yet.
fn unread_from(peer_id: &str, history: &[DirectMessage]) -> Vec<String> {
    history
        .iter()
        .filter(|m| !m.read && m.sender_id == peer_id)
        .map(|m| m.id.clone())
        .collect()
}

#[component]
pub fn DirectMessagesView(peer_id: String) -> Element {
    let api = use_api();
    let live = use_live();
    let session = use_session();
    let calls = use_calls();
    let mut notices = use_notices();

    let peer_id = use_memo(use_reactive!(|peer_id| peer_id));
    let mut peer = use_signal(|| Option::<User>::None);
    let mut messages = use_signal(Timeline::<DirectMessage>::new);
    let mut draft = use_signal(String::new);
    let mut recording = use_signal(|| false);

    let loader_api = api.clone();
    let _loader = use_resource(move || {
        let api = loader_api.clone();
        let peer_id = peer_id();
        async move {
            messages.write().replace_all(Vec::new());
            match api.users().get(&peer_id).await {
                Ok(user) => peer.set(Some(user)),
                Err(e) => tracing::warn!("could not load user {}: {}", peer_id, e),
            }
            let history = match api.direct_messages().conversation(&peer_id).await {
                Ok(history) => history,
                Err(e) => {
                    notify(&mut notices, NoticeLevel::Error, &format!("Loading conversation: {e}"));
                    return;
                }
            };
            let unread = unread_from(&peer_id, &history);
            messages.write().merge_history(history);

            let marks = unread.iter().map(|id| {
                let api = api.clone();
                async move { (id, api.direct_messages().mark_read(id).await) }
            });
            for (id, result) in join_all(marks).await {
                match result {
                    Ok(()) => {
                        messages.write().update(id, |m| m.read = true);
                    }
                    Err(e) => tracing::debug!("mark_read {}: {}", id, e),
                }
            }
        }
    });

    use_server_event(names::NEW_DIRECT_MESSAGE, move |event| {
        if let ServerEvent::NewDirectMessage(message) = event {
            let session = session.peek();
            let Some(me) = session.user_id() else {
                return;
            };
            if message.involves(me, &peer_id.peek()) {
                let mut messages = messages;
                messages.write().push(message.clone());
            }
        }
    });

    let send_api = api.clone();
    let send = move |evt: FormEvent| {
        evt.prevent_default();
        let messenger = live.messenger(send_api.clone());
        async move {
            let content = draft();
            if content.trim().is_empty() {
                return;
            }
            match messenger.send_direct_message(&peer_id(), &content).await {
                Ok(Delivery::Rest(message)) => {
                    messages.write().push(message);
                    draft.set(String::new());
                }
                Ok(Delivery::Realtime) => draft.set(String::new()),
                Err(e) => notify(&mut notices, NoticeLevel::Error, &format!("Send failed: {e}")),
            }
        }
    };

    let voice_api = api.clone();
    let toggle_recording = move |_| {
        let api = voice_api.clone();
        async move {
            if !recording() {
                match start_recording().await {
                    Ok(()) => recording.set(true),
                    Err(e) => notify(&mut notices, NoticeLevel::Warning, &format!("Microphone: {e}")),
                }
                return;
            }
            recording.set(false);
            let note = match stop_recording().await {
                Ok(note) => note,
                Err(e) => {
                    notify(&mut notices, NoticeLevel::Error, &format!("Recording failed: {e}"));
                    return;
                }
            };
            match api.direct_messages().send_voice(&peer_id(), note).await {
                Ok(message) => {
                    messages.write().push(message);
                }
                Err(e) => notify(&mut notices, NoticeLevel::Error, &format!("Voice note: {e}")),
            }
        }
    };

    let me = session().user_id().unwrap_or_default().to_string();
    let title = peer()
        .map(|u| u.display_name().to_string())
        .unwrap_or_else(|| peer_id());
    let base_url = api.base_url().to_string();
    let call_idle = calls.state.read().is_idle();
    let list = messages.read().as_slice().to_vec();

    rsx! {
        document::Stylesheet { href: VIEWS_CSS }

        div {
            class: "page chat",
            div {
                class: "chat-header",
                h2 { "{title}" }
                button {
                    class: "icon-btn",
                    title: "Call",
                    disabled: !call_idle,
                    onclick: move |_| calls.dial(peer_id()),
                    Icon { icon: FaPhone, width: 16, height: 16 }
                }
            }

            div {
                class: "chat-messages",
                if list.is_empty() {
                    p { class: "muted", "No messages yet." }
                }
                for message in list {
                    div {
                        key: "{message.id}",
                        class: if message.sender_id == me { "bubble mine" } else { "bubble" },
                        if message.is_voice() {
                            if let Some(path) = &message.audio_url {
                                audio {
                                    controls: true,
                                    preload: "metadata",
                                    src: media_url(&base_url, path).unwrap_or_else(|_| path.clone()),
                                }
                            }
                            span {
                                class: "bubble-meta",
                                {format_duration(message.duration_secs.unwrap_or_default())}
                            }
                        } else {
                            div {
                                class: "bubble-text",
                                {message.content.clone().unwrap_or_default()}
                            }
                        }
                    }
                }
            }

            form {
                class: "chat-composer",
                onsubmit: send,
                input {
                    placeholder: "Write a message",
                    value: "{draft}",
                    disabled: recording(),
                    oninput: move |e| draft.set(e.value()),
                }
                button {
                    class: if recording() { "icon-btn recording" } else { "icon-btn" },
                    r#type: "button",
                    title: if recording() { "Stop and send" } else { "Record voice note" },
                    onclick: toggle_recording,
                    if recording() {
                        Icon { icon: FaStop, width: 16, height: 16 }
                    } else {
                        Icon { icon: FaMicrophone, width: 16, height: 16 }
                    }
                }
                button { class: "primary-btn", r#type: "submit", disabled: recording(), "Send" }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_url() {
        assert_eq!(
            media_url("http://localhost:5000/api", "/uploads/v1.webm").unwrap(),
            "http://localhost:5000/uploads/v1.webm"
        );
        assert_eq!(
            media_url("http://localhost:5000/api/", "uploads/v1.webm").unwrap(),
            "http://localhost:5000/uploads/v1.webm"
        );
        assert_eq!(
            media_url("http://localhost:5000/api", "https://cdn.example.com/v.webm").unwrap(),
            "https://cdn.example.com/v.webm"
        );
        assert_eq!(
            media_url("http://localhost:5000", "blob:http://localhost/1234").unwrap(),
            "blob:http://localhost/1234"
        );
    }

    #[test]
    fn test_media_url_ignores_base_query() {
        assert_eq!(
            media_url("http://h:5000?x=1", "/uploads/v.webm").unwrap(),
            "http://h:5000/uploads/v.webm"
        );
    }

    #[test]
    fn test_media_url_protocol_relative_path_keeps_its_host() {
        assert_eq!(
            media_url("https://api.example.com/api", "//cdn.example.com/v.webm").unwrap(),
            "https://cdn.example.com/v.webm"
        );
    }

    #[test]
    fn test_unread_from_only_counts_peer_messages() {
        let dm = |id: &str, sender: &str, read: bool| DirectMessage {
            id: id.into(),
            sender_id: sender.into(),
            recipient_id: if sender == "me" { "them".into() } else { "me".into() },
            kind: Default::default(),
            content: Some("hi".into()),
            audio_url: None,
            duration_secs: None,
            read,
            created_at: String::new(),
        };
        let history = vec![
            dm("d1", "them", true),
            dm("d2", "them", false),
            dm("d3", "me", false),
            dm("d4", "them", false),
        ];
        assert_eq!(unread_from("them", &history), vec!["d2", "d4"]);
    }

    #[test]
    fn test_media_url_rejects_bad_base() {
        assert!(media_url("not a url", "/uploads/v.webm").is_err());
    }
}
