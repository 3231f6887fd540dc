//! Friend request lifecycle and the resulting friend list.

use crate::models::{FriendRequest, Friendship};
use crate::{ApiClient, ApiError};

pub struct FriendRequests<'a> {
    client: &'a ApiClient,
}

impl<'a> FriendRequests<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Requests other users sent to the current user.
    pub async fn incoming(&self) -> Result<Vec<FriendRequest>, ApiError> {
        self.client.get("/friend-requests/incoming").await
    }

    /// Requests the current user sent.
    pub async fn outgoing(&self) -> Result<Vec<FriendRequest>, ApiError> {
        self.client.get("/friend-requests/outgoing").await
    }

    pub async fn send(&self, recipient_id: &str) -> Result<FriendRequest, ApiError> {
        if recipient_id.trim().is_empty() {
            return Err(ApiError::validation("Choose someone to add"));
        }
        self.client
            .post(
                "/friend-requests",
                &serde_json::json!({ "recipientId": recipient_id }),
            )
            .await
    }

    pub async fn accept(&self, request_id: &str) -> Result<FriendRequest, ApiError> {
        self.client
            .put(
                &format!("/friend-requests/{request_id}/accept"),
                &serde_json::json!({}),
            )
            .await
    }

    pub async fn reject(&self, request_id: &str) -> Result<FriendRequest, ApiError> {
        self.client
            .put(
                &format!("/friend-requests/{request_id}/reject"),
                &serde_json::json!({}),
            )
            .await
    }

    pub async fn friends(&self) -> Result<Vec<Friendship>, ApiError> {
        self.client.get("/friends").await
    }

    pub async fn remove_friend(&self, friend_id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/friends/{friend_id}")).await
    }
}
