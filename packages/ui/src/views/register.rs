use dioxus::prelude::*;

use super::VIEWS_CSS;
use crate::session::{sign_in, use_api, use_session};

#[component]
pub fn RegisterView(on_success: EventHandler<()>, on_login: EventHandler<()>) -> Element {
    let api = use_api();
    let mut session = use_session();
    let mut username = use_signal(String::new);
    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut confirm = use_signal(String::new);
    let mut error = use_signal(|| Option::<String>::None);
    let mut busy = use_signal(|| false);

    let onsubmit = move |evt: FormEvent| {
        evt.prevent_default();
        let api = api.clone();
        async move {
            if password() != confirm() {
                error.set(Some("Passwords do not match".to_string()));
                return;
            }
            busy.set(true);
            error.set(None);
            match api.auth().register(&username(), &email(), &password()).await {
                Ok(response) => {
                    sign_in(&mut session, response);
                    on_success.call(());
                }
                Err(e) => error.set(Some(e.to_string())),
            }
            busy.set(false);
        }
    };

    rsx! {
        document::Stylesheet { href: VIEWS_CSS }

        div {
            class: "auth-card",
            h1 { "Join Circles" }

            form {
                class: "auth-form",
                onsubmit: onsubmit,
                label { "Username" }
                input {
                    value: "{username}",
                    autocomplete: "username",
                    oninput: move |e| username.set(e.value()),
                }
                label { "Email" }
                input {
                    r#type: "email",
                    value: "{email}",
                    autocomplete: "email",
                    oninput: move |e| email.set(e.value()),
                }
                label { "Password" }
                input {
                    r#type: "password",
                    value: "{password}",
                    autocomplete: "new-password",
                    oninput: move |e| password.set(e.value()),
                }
                label { "Confirm password" }
                input {
                    r#type: "password",
                    value: "{confirm}",
                    autocomplete: "new-password",
                    oninput: move |e| confirm.set(e.value()),
                }
                if let Some(message) = error() {
                    p { class: "form-error", "{message}" }
                }
                button {
                    class: "primary-btn",
                    r#type: "submit",
                    disabled: busy(),
                    if busy() { "Creating account..." } else { "Create account" }
                }
            }

            p {
                class: "auth-switch",
                "Already registered? "
                a {
                    href: "#",
                    onclick: move |evt| {
                        evt.prevent_default();
                        on_login.call(());
                    },
                    "Sign in"
                }
            }
        }
    }
}
