//! Direct message endpoints, including voice note uploads.

use reqwest::multipart::{Form, Part};
use reqwest::Method;

use crate::models::{DirectMessage, VoiceNote};
use crate::{ApiClient, ApiError};

pub struct DirectMessages<'a> {
    client: &'a ApiClient,
}

impl<'a> DirectMessages<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Full history with `peer_id`, oldest first.
    pub async fn conversation(&self, peer_id: &str) -> Result<Vec<DirectMessage>, ApiError> {
        self.client.get(&format!("/direct-messages/{peer_id}")).await
    }

    pub async fn send_text(&self, peer_id: &str, content: &str) -> Result<DirectMessage, ApiError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::validation("Message is empty"));
        }
        self.client
            .post(
                &format!("/direct-messages/{peer_id}"),
                &serde_json::json!({ "content": content, "kind": "text" }),
            )
            .await
    }

    /// Upload a recorded voice note as `multipart/form-data`.
    pub async fn send_voice(
        &self,
        peer_id: &str,
        note: VoiceNote,
    ) -> Result<DirectMessage, ApiError> {
        if note.bytes.is_empty() {
            return Err(ApiError::validation("Voice note is empty"));
        }
        let file_name = note.file_name();
        let part = Part::bytes(note.bytes)
            .file_name(file_name)
            .mime_str(&note.mime)?;
        let form = Form::new()
            .part("audio", part)
            .text("durationSecs", format!("{:.1}", note.duration_secs));

        let builder = self
            .client
            .request(Method::POST, &format!("/direct-messages/{peer_id}/voice"), true)?
            .multipart(form);
        self.client.execute(builder).await
    }

    pub async fn mark_read(&self, message_id: &str) -> Result<(), ApiError> {
        let builder = self
            .client
            .request(Method::PUT, &format!("/direct-messages/{message_id}/read"), true)?;
        self.client.execute_empty(builder).await
    }
}
