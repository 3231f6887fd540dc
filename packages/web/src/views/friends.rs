use dioxus::prelude::*;
use ui::views::FriendsView;

use crate::Route;

#[component]
pub fn Friends() -> Element {
    let nav = use_navigator();

    rsx! {
        FriendsView {
            on_message: move |peer_id: String| {
                nav.push(Route::DirectMessages { peer_id });
            },
        }
    }
}
