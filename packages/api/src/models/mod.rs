//! Data models mirrored from the backend's API responses.

mod call;
mod circle;
mod direct_message;
mod friend;
mod user;

pub use call::{CallCredentials, CallSession, CallStatus};
pub use circle::{Circle, Message};
pub use direct_message::{DirectMessage, DirectMessageKind, VoiceNote};
pub use friend::{FriendRequest, FriendRequestStatus, Friendship};
pub use user::{AuthResponse, User};
