use dioxus::prelude::*;

use super::VIEWS_CSS;
use crate::session::{sign_in, use_api, use_session};

/// Email and password sign-in form.
#[component]
pub fn LoginView(on_success: EventHandler<()>, on_register: EventHandler<()>) -> Element {
    let api = use_api();
    let mut session = use_session();
    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut error = use_signal(|| Option::<String>::None);
    let mut busy = use_signal(|| false);

    let onsubmit = move |evt: FormEvent| {
        evt.prevent_default();
        let api = api.clone();
        async move {
            busy.set(true);
            error.set(None);
            match api.auth().login(&email(), &password()).await {
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
            h1 { "Circles" }
            p { class: "auth-subtitle", "Sign in to your account" }

            form {
                class: "auth-form",
                onsubmit: onsubmit,
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
                    autocomplete: "current-password",
                    oninput: move |e| password.set(e.value()),
                }
                if let Some(message) = error() {
                    p { class: "form-error", "{message}" }
                }
                button {
                    class: "primary-btn",
                    r#type: "submit",
                    disabled: busy(),
                    if busy() { "Signing in..." } else { "Sign in" }
                }
            }

            p {
                class: "auth-switch",
                "No account yet? "
                a {
                    href: "#",
                    onclick: move |evt| {
                        evt.prevent_default();
                        on_register.call(());
                    },
                    "Create one"
                }
            }
        }
    }
}
