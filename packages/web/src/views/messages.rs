use dioxus::prelude::*;
use ui::views::DirectMessagesView;

#[component]
pub fn DirectMessages(peer_id: String) -> Element {
    rsx! {
        DirectMessagesView { peer_id }
    }
}
