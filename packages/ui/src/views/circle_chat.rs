//! A circle's message history with live updates.
//!
//! History is loaded over REST, then `new-message` events for this circle are
//! appended. The view joins the circle's socket room whenever the connection
//! (re)authenticates and leaves it on unmount.

use std::cell::RefCell;
use std::rc::Rc;

use api::{Circle, Message};
use dioxus::prelude::*;
use realtime::protocol::names;
use realtime::{ClientFrame, Delivery, ServerEvent, Timeline};

use super::VIEWS_CSS;
use crate::live::{use_live, use_server_event};
use crate::notices::{notify, use_notices, NoticeLevel};
use crate::session::{use_api, use_session};

/// Append a `new-message` record if it belongs to the circle on screen.
/// Returns whether the timeline changed.
fn append_for_circle(timeline: &mut Timeline<Message>, visible: &str, message: &Message) -> bool {
    message.circle_id == visible && timeline.push(message.clone())
}

#[component]
pub fn CircleChatView(circle_id: String, on_back: EventHandler<()>) -> Element {
    let api = use_api();
    let live = use_live();
    let session = use_session();
    let mut notices = use_notices();

    let mut circle = use_signal(|| Option::<Circle>::None);
    let mut messages = use_signal(Timeline::<Message>::new);
    let mut draft = use_signal(String::new);
    let mut sending = use_signal(|| false);
    let current = use_memo(use_reactive!(|circle_id| circle_id));
    let joined = use_hook(|| Rc::new(RefCell::new(Option::<String>::None)));

    let loader_api = api.clone();
    let _loader = use_resource(move || {
        let api = loader_api.clone();
        let id = current();
        async move {
            messages.write().replace_all(Vec::new());
            match api.circles().get(&id).await {
                Ok(found) => circle.set(Some(found)),
                Err(e) => notify(&mut notices, NoticeLevel::Error, &format!("Loading circle: {e}")),
            }
            match api.circles().messages(&id).await {
                Ok(history) => messages.write().merge_history(history),
                Err(e) => notify(&mut notices, NoticeLevel::Error, &format!("Loading messages: {e}")),
            }
        }
    });

    // join the room on every (re)connect
    let join_live = live.clone();
    let join_room = joined.clone();
    use_effect(move || {
        let connected = (join_live.status)().is_connected();
        let id = current();
        let previous = join_room.borrow_mut().take();
        if let Some(previous) = previous.filter(|p| *p != id) {
            let _ = join_live.send(ClientFrame::LeaveCircle { circle_id: previous });
        }
        if !connected {
            return;
        }
        match join_live.send(ClientFrame::JoinCircle { circle_id: id.clone() }) {
            Ok(()) => *join_room.borrow_mut() = Some(id),
            Err(e) => tracing::warn!("join-circle failed: {}", e),
        }
    });

    let leave_live = live.clone();
    use_drop(move || {
        if let Some(circle_id) = joined.borrow_mut().take() {
            let _ = leave_live.send(ClientFrame::LeaveCircle { circle_id });
        }
    });

    use_server_event(names::NEW_MESSAGE, move |event| {
        if let ServerEvent::NewMessage(message) = event {
            let mut messages = messages;
            let visible = current.peek().clone();
            append_for_circle(&mut messages.write(), &visible, message);
        }
    });

    let send = move |evt: FormEvent| {
        evt.prevent_default();
        let messenger = live.messenger(api.clone());
        async move {
            let content = draft();
            if content.trim().is_empty() {
                return;
            }
            sending.set(true);
            let id = current();
            match messenger.send_circle_message(&id, &content).await {
                Ok(Delivery::Rest(message)) => {
                    messages.write().push(message);
                    draft.set(String::new());
                }
                Ok(Delivery::Realtime) => draft.set(String::new()),
                Err(e) => notify(&mut notices, NoticeLevel::Error, &format!("Send failed: {e}")),
            }
            sending.set(false);
        }
    };

    let me = session().user_id().unwrap_or_default().to_string();
    let title = circle()
        .map(|c| c.name)
        .unwrap_or_else(|| "Circle".to_string());
    let list = messages.read().as_slice().to_vec();

    rsx! {
        document::Stylesheet { href: VIEWS_CSS }

        div {
            class: "page chat",
            div {
                class: "chat-header",
                button { class: "link-btn", onclick: move |_| on_back.call(()), "← Circles" }
                h2 { "{title}" }
            }

            div {
                class: "chat-messages",
                if list.is_empty() {
                    p { class: "muted", "No messages yet. Say hello!" }
                }
                for message in list {
                    div {
                        key: "{message.id}",
                        class: if message.sender_id == me { "bubble mine" } else { "bubble" },
                        if message.sender_id != me {
                            div {
                                class: "bubble-author",
                                {message.sender_name.clone().unwrap_or_else(|| message.sender_id.clone())}
                            }
                        }
                        div { class: "bubble-text", "{message.content}" }
                    }
                }
            }

            form {
                class: "chat-composer",
                onsubmit: send,
                input {
                    placeholder: "Write a message",
                    value: "{draft}",
                    oninput: move |e| draft.set(e.value()),
                }
                button { class: "primary-btn", r#type: "submit", disabled: sending(), "Send" }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, circle_id: &str) -> Message {
        Message {
            id: id.into(),
            circle_id: circle_id.into(),
            sender_id: "u2".into(),
            sender_name: None,
            content: "hi".into(),
            created_at: String::new(),
        }
    }

    #[test]
    fn test_new_message_for_visible_circle_is_appended_once() {
        let mut timeline = Timeline::new();
        let event = message("m1", "c1");

        assert!(append_for_circle(&mut timeline, "c1", &event));
        assert!(!append_for_circle(&mut timeline, "c1", &event));
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn test_new_message_for_other_circle_is_ignored() {
        let mut timeline = Timeline::new();
        assert!(!append_for_circle(&mut timeline, "c1", &message("m1", "c2")));
        assert!(timeline.is_empty());
    }
}
