use dioxus::prelude::*;

mod login;
pub use login::LoginView;

mod register;
pub use register::RegisterView;

mod circles;
pub use circles::CirclesView;

mod circle_chat;
pub use circle_chat::CircleChatView;

mod direct_messages;
pub use direct_messages::DirectMessagesView;

mod friends;
pub use friends::FriendsView;

pub(crate) const VIEWS_CSS: Asset = asset!("/src/views/views.css");
