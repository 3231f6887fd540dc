//! Friends, pending requests and user search.

use api::{FriendRequest, Friendship, User};
use dioxus::prelude::*;
use realtime::protocol::names;
use realtime::{ServerEvent, Timeline};

use super::VIEWS_CSS;
use crate::live::use_server_event;
use crate::notices::{notify, use_notices, NoticeLevel};
use crate::session::{use_api, use_session};

#[component]
pub fn FriendsView(on_message: EventHandler<String>) -> Element {
    let api = use_api();
    let session = use_session();
    let mut notices = use_notices();

    let mut friends = use_signal(Timeline::<Friendship>::new);
    let mut incoming = use_signal(Timeline::<FriendRequest>::new);
    let mut outgoing = use_signal(Timeline::<FriendRequest>::new);
    let mut query = use_signal(String::new);
    let mut results = use_signal(Vec::<User>::new);

    let loader_api = api.clone();
    let mut loader = use_resource(move || {
        let api = loader_api.clone();
        async move {
            match api.friend_requests().friends().await {
                Ok(list) => friends.write().replace_all(list),
                Err(e) => notify(&mut notices, NoticeLevel::Error, &format!("Loading friends: {e}")),
            }
            match api.friend_requests().incoming().await {
                Ok(list) => incoming
                    .write()
                    .replace_all(list.into_iter().filter(FriendRequest::is_pending)),
                Err(e) => notify(&mut notices, NoticeLevel::Error, &format!("Loading requests: {e}")),
            }
            match api.friend_requests().outgoing().await {
                Ok(list) => outgoing
                    .write()
                    .replace_all(list.into_iter().filter(FriendRequest::is_pending)),
                Err(e) => tracing::warn!("loading sent requests: {}", e),
            }
        }
    });

    use_server_event(names::FRIEND_REQUEST_RECEIVED, move |event| {
        if let ServerEvent::FriendRequestReceived(request) = event {
            let (mut notices, mut incoming) = (notices, incoming);
            notify(
                &mut notices,
                NoticeLevel::Info,
                &format!("Friend request from {}", request.sender.display_name()),
            );
            incoming.write().push(request.clone());
        }
    });

    // the friend list is rebuilt from the server so both sides agree on ids
    use_server_event(names::FRIEND_REQUEST_ACCEPTED, move |event| {
        if let ServerEvent::FriendRequestAccepted(request) = event {
            let (mut outgoing, mut loader) = (outgoing, loader);
            outgoing.write().remove(&request.id);
            loader.restart();
        }
    });

    use_server_event(names::FRIEND_REQUEST_REJECTED, move |event| {
        if let ServerEvent::FriendRequestRejected(request) = event {
            let mut outgoing = outgoing;
            outgoing.write().remove(&request.id);
        }
    });

    let search_api = api.clone();
    let search = move |evt: FormEvent| {
        evt.prevent_default();
        let api = search_api.clone();
        async move {
            let q = query().trim().to_string();
            if q.is_empty() {
                results.set(Vec::new());
                return;
            }
            match api.users().search(&q).await {
                Ok(users) => results.set(users),
                Err(e) => notify(&mut notices, NoticeLevel::Error, &format!("Search: {e}")),
            }
        }
    };

    let request_api = api.clone();
    let send_request = use_callback(move |user_id: String| {
        let api = request_api.clone();
        spawn(async move {
            match api.friend_requests().send(&user_id).await {
                Ok(request) => {
                    notify(
                        &mut notices,
                        NoticeLevel::Success,
                        &format!("Request sent to {}", request.recipient.display_name()),
                    );
                    outgoing.write().push(request);
                }
                Err(e) => notify(&mut notices, NoticeLevel::Error, &format!("Friend request: {e}")),
            }
        });
    });

    let answer_api = api.clone();
    let answer = use_callback(move |(request_id, accept): (String, bool)| {
        let api = answer_api.clone();
        spawn(async move {
            let result = if accept {
                api.friend_requests().accept(&request_id).await
            } else {
                api.friend_requests().reject(&request_id).await
            };
            match result {
                Ok(_) => {
                    incoming.write().remove(&request_id);
                    if accept {
                        loader.restart();
                    }
                }
                Err(e) => notify(&mut notices, NoticeLevel::Error, &format!("Friend request: {e}")),
            }
        });
    });

    let remove = use_callback(move |friend_id: String| {
        let api = api.clone();
        spawn(async move {
            match api.friend_requests().remove_friend(&friend_id).await {
                Ok(()) => {
                    let stale: Vec<String> = friends
                        .read()
                        .iter()
                        .filter(|f| f.friend.id == friend_id)
                        .map(|f| f.id.clone())
                        .collect();
                    for id in stale {
                        friends.write().remove(&id);
                    }
                }
                Err(e) => notify(&mut notices, NoticeLevel::Error, &format!("Remove friend: {e}")),
            }
        });
    });

    let me = session().user_id().unwrap_or_default().to_string();
    let friend_list = friends.read().as_slice().to_vec();
    let incoming_list = incoming.read().as_slice().to_vec();
    let outgoing_list = outgoing.read().as_slice().to_vec();
    let known: Vec<String> = friend_list
        .iter()
        .map(|f| f.friend.id.clone())
        .chain(outgoing_list.iter().map(|r| r.recipient.id.clone()))
        .collect();
    let search_results: Vec<User> = results()
        .into_iter()
        .filter(|u| u.id != me && !known.contains(&u.id))
        .collect();

    rsx! {
        document::Stylesheet { href: VIEWS_CSS }

        div {
            class: "page",
            h2 { "Friends" }

            if !incoming_list.is_empty() {
                h3 { "Requests" }
                ul {
                    class: "card-list",
                    for request in incoming_list {
                        li {
                            key: "{request.id}",
                            class: "card row",
                            span { class: "card-title", "{request.sender.display_name()}" }
                            div {
                                class: "row-actions",
                                button {
                                    class: "primary-btn",
                                    onclick: {
                                        let id = request.id.clone();
                                        move |_| answer.call((id.clone(), true))
                                    },
                                    "Accept"
                                }
                                button {
                                    onclick: {
                                        let id = request.id.clone();
                                        move |_| answer.call((id.clone(), false))
                                    },
                                    "Decline"
                                }
                            }
                        }
                    }
                }
            }

            if friend_list.is_empty() {
                p { class: "muted", "No friends yet. Search for people below." }
            }
            ul {
                class: "card-list",
                for friendship in friend_list {
                    li {
                        key: "{friendship.id}",
                        class: "card row",
                        span {
                            class: if friendship.friend.online { "presence online" } else { "presence" },
                        }
                        span { class: "card-title", "{friendship.friend.display_name()}" }
                        div {
                            class: "row-actions",
                            button {
                                onclick: {
                                    let id = friendship.friend.id.clone();
                                    move |_| on_message.call(id.clone())
                                },
                                "Message"
                            }
                            button {
                                class: "danger-btn",
                                onclick: {
                                    let id = friendship.friend.id.clone();
                                    move |_| remove.call(id.clone())
                                },
                                "Remove"
                            }
                        }
                    }
                }
            }

            if !outgoing_list.is_empty() {
                h3 { "Sent" }
                ul {
                    class: "card-list",
                    for request in outgoing_list {
                        li {
                            key: "{request.id}",
                            class: "card row muted",
                            "{request.recipient.display_name()} · pending"
                        }
                    }
                }
            }

            h3 { "Find people" }
            form {
                class: "inline-form",
                onsubmit: search,
                input {
                    placeholder: "Username or email",
                    value: "{query}",
                    oninput: move |e| query.set(e.value()),
                }
                button { r#type: "submit", "Search" }
            }
            ul {
                class: "card-list",
                for user in search_results {
                    li {
                        key: "{user.id}",
                        class: "card row",
                        span { class: "card-title", "{user.display_name()}" }
                        span { class: "card-meta", "@{user.username}" }
                        button {
                            class: "primary-btn",
                            onclick: {
                                let id = user.id.clone();
                                move |_| send_request.call(id.clone())
                            },
                            "Add friend"
                        }
                    }
                }
            }
        }
    }
}
