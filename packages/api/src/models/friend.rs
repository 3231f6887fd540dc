//! Friend requests and established friendships.

use serde::{Deserialize, Serialize};

use super::User;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

/// A social connection proposal between two users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub id: String,
    pub sender: User,
    pub recipient: User,
    #[serde(default)]
    pub status: FriendRequestStatus,
    #[serde(default)]
    pub created_at: String,
}

impl FriendRequest {
    pub fn is_pending(&self) -> bool {
        self.status == FriendRequestStatus::Pending
    }
}

/// An accepted friend request, seen from the current user's side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Friendship {
    pub id: String,
    pub friend: User,
    #[serde(default)]
    pub since: String,
}
