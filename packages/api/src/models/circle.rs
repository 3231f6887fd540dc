//! Circle (group chat room) records and the messages posted in them.

use serde::{Deserialize, Serialize};

/// A named group chat room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Circle {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner_id: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
    #[serde(default)]
    pub created_at: String,
}

impl Circle {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.owner_id == user_id || self.member_ids.iter().any(|id| id == user_id)
    }
}

/// A message posted to a circle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub circle_id: String,
    pub sender_id: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    pub content: String,
    #[serde(default)]
    pub created_at: String,
}
