//! Circle endpoints: membership and the message history of a circle.

use reqwest::Method;
use serde::Serialize;

use crate::models::{Circle, Message};
use crate::{ApiClient, ApiError};

pub struct Circles<'a> {
    client: &'a ApiClient,
}

#[derive(Serialize)]
struct NewCircle<'b> {
    name: &'b str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'b str>,
}

#[derive(Serialize)]
struct NewMessage<'b> {
    content: &'b str,
}

impl<'a> Circles<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Circle>, ApiError> {
        self.client.get("/circles").await
    }

    pub async fn get(&self, id: &str) -> Result<Circle, ApiError> {
        self.client.get(&format!("/circles/{id}")).await
    }

    pub async fn create(&self, name: &str, description: Option<&str>) -> Result<Circle, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::validation("Circle name is required"));
        }
        let description = description.map(str::trim).filter(|d| !d.is_empty());
        self.client
            .post("/circles", &NewCircle { name, description })
            .await
    }

    pub async fn join(&self, id: &str) -> Result<Circle, ApiError> {
        self.client
            .post(&format!("/circles/{id}/join"), &serde_json::json!({}))
            .await
    }

    pub async fn leave(&self, id: &str) -> Result<(), ApiError> {
        let builder = self
            .client
            .request(Method::POST, &format!("/circles/{id}/leave"), true)?;
        self.client.execute_empty(builder).await
    }

    pub async fn messages(&self, id: &str) -> Result<Vec<Message>, ApiError> {
        self.client.get(&format!("/circles/{id}/messages")).await
    }

    /// Post a message through REST. Used when the socket is unavailable.
    pub async fn post_message(&self, id: &str, content: &str) -> Result<Message, ApiError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::validation("Message is empty"));
        }
        self.client
            .post(&format!("/circles/{id}/messages"), &NewMessage { content })
            .await
    }
}
