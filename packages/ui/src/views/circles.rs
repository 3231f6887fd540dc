use api::Circle;
use dioxus::prelude::*;
use realtime::Timeline;

use super::VIEWS_CSS;
use crate::notices::{notify, use_notices, NoticeLevel};
use crate::session::{use_api, use_session};

/// The user's circles, plus forms to create or join one.
#[component]
pub fn CirclesView(on_open: EventHandler<String>) -> Element {
    let api = use_api();
    let session = use_session();
    let mut notices = use_notices();
    let mut circles = use_signal(Timeline::<Circle>::new);
    let mut loading = use_signal(|| true);

    let mut new_name = use_signal(String::new);
    let mut new_description = use_signal(String::new);
    let mut join_id = use_signal(String::new);

    let loader_api = api.clone();
    let _loader = use_resource(move || {
        let api = loader_api.clone();
        async move {
            match api.circles().list().await {
                Ok(list) => circles.write().replace_all(list),
                Err(e) => notify(&mut notices, NoticeLevel::Error, &format!("Loading circles: {e}")),
            }
            loading.set(false);
        }
    });

    let create_api = api.clone();
    let create = move |evt: FormEvent| {
        evt.prevent_default();
        let api = create_api.clone();
        async move {
            let description = new_description();
            let description = Some(description.trim()).filter(|d| !d.is_empty());
            match api.circles().create(&new_name(), description).await {
                Ok(circle) => {
                    notify(&mut notices, NoticeLevel::Success, &format!("Created {}", circle.name));
                    circles.write().push(circle);
                    new_name.set(String::new());
                    new_description.set(String::new());
                }
                Err(e) => notify(&mut notices, NoticeLevel::Error, &format!("Create circle: {e}")),
            }
        }
    };

    let join = move |evt: FormEvent| {
        evt.prevent_default();
        let api = api.clone();
        async move {
            let id = join_id().trim().to_string();
            if id.is_empty() {
                return;
            }
            match api.circles().join(&id).await {
                Ok(circle) => {
                    notify(&mut notices, NoticeLevel::Success, &format!("Joined {}", circle.name));
                    circles.write().upsert(circle);
                    join_id.set(String::new());
                }
                Err(e) => notify(&mut notices, NoticeLevel::Error, &format!("Join circle: {e}")),
            }
        }
    };

    let me = session().user_id().unwrap_or_default().to_string();
    let list = circles.read().as_slice().to_vec();

    rsx! {
        document::Stylesheet { href: VIEWS_CSS }

        div {
            class: "page",
            h2 { "Circles" }

            if loading() {
                p { class: "muted", "Loading..." }
            } else if list.is_empty() {
                p { class: "muted", "You are not in any circle yet." }
            }

            ul {
                class: "card-list",
                for circle in list {
                    li {
                        key: "{circle.id}",
                        class: "card",
                        onclick: {
                            let id = circle.id.clone();
                            move |_| on_open.call(id.clone())
                        },
                        div { class: "card-title",
                            "{circle.name}"
                            if circle.owner_id == me {
                                span { class: "badge", "owner" }
                            }
                        }
                        if let Some(description) = &circle.description {
                            div { class: "card-subtitle", "{description}" }
                        }
                        div { class: "card-meta", "{circle.member_ids.len()} members" }
                    }
                }
            }

            div {
                class: "form-row",
                form {
                    class: "inline-form",
                    onsubmit: create,
                    input {
                        placeholder: "New circle name",
                        value: "{new_name}",
                        oninput: move |e| new_name.set(e.value()),
                    }
                    input {
                        placeholder: "Description (optional)",
                        value: "{new_description}",
                        oninput: move |e| new_description.set(e.value()),
                    }
                    button { class: "primary-btn", r#type: "submit", "Create" }
                }
                form {
                    class: "inline-form",
                    onsubmit: join,
                    input {
                        placeholder: "Circle id",
                        value: "{join_id}",
                        oninput: move |e| join_id.set(e.value()),
                    }
                    button { r#type: "submit", "Join" }
                }
            }
        }
    }
}
