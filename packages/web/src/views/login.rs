//! Sign-in and registration pages.

use dioxus::prelude::*;
use ui::use_session;
use ui::views::{LoginView, RegisterView};

use crate::Route;

#[component]
pub fn Login() -> Element {
    let session = use_session();
    let nav = use_navigator();

    // Already signed in
    if session().user.is_some() {
        nav.replace(Route::Circles {});
    }

    rsx! {
        LoginView {
            on_success: move |_| {
                nav.replace(Route::Circles {});
            },
            on_register: move |_| {
                nav.push(Route::Register {});
            },
        }
    }
}

#[component]
pub fn Register() -> Element {
    let session = use_session();
    let nav = use_navigator();

    if session().user.is_some() {
        nav.replace(Route::Circles {});
    }

    rsx! {
        RegisterView {
            on_success: move |_| {
                nav.replace(Route::Circles {});
            },
            on_login: move |_| {
                nav.push(Route::Login {});
            },
        }
    }
}
