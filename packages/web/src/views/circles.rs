use dioxus::prelude::*;
use ui::views::{CircleChatView, CirclesView};

use crate::Route;

#[component]
pub fn Circles() -> Element {
    let nav = use_navigator();

    rsx! {
        CirclesView {
            on_open: move |circle_id: String| {
                nav.push(Route::CircleChat { circle_id });
            },
        }
    }
}

#[component]
pub fn CircleChat(circle_id: String) -> Element {
    let nav = use_navigator();

    rsx! {
        CircleChatView {
            circle_id,
            on_back: move |_| {
                nav.push(Route::Circles {});
            },
        }
    }
}
