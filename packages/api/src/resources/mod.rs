//! Resource-grouped endpoint wrappers. Each group borrows an [`ApiClient`](crate::ApiClient).

mod auth;
mod calls;
mod circles;
mod direct_messages;
mod friend_requests;
mod users;

pub use auth::Auth;
pub use calls::Calls;
pub use circles::Circles;
pub use direct_messages::DirectMessages;
pub use friend_requests::FriendRequests;
pub use users::Users;
