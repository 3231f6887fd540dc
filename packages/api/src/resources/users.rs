use reqwest::Method;
use serde::Serialize;

use crate::models::User;
use crate::{ApiClient, ApiError};

pub struct Users<'a> {
    client: &'a ApiClient,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdate<'b> {
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'b str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_url: Option<&'b str>,
}

impl<'a> Users<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &str) -> Result<User, ApiError> {
        self.client.get(&format!("/users/{id}")).await
    }

    /// Find users by username or display name.
    pub async fn search(&self, query: &str) -> Result<Vec<User>, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let builder = self
            .client
            .request(Method::GET, "/users/search", true)?
            .query(&[("q", query)]);
        self.client.execute(builder).await
    }

    pub async fn update_profile(
        &self,
        display_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<User, ApiError> {
        self.client
            .put(
                "/users/me",
                &ProfileUpdate {
                    display_name,
                    avatar_url,
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_server;
    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_search_passes_query_and_skips_blank() {
        let router = Router::new().route(
            "/users/search",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let q = params.get("q").cloned().unwrap_or_default();
                Json(json!([{ "id": "u9", "username": q }]))
            }),
        );
        let client = ApiClient::new(spawn_server(router).await);
        client.set_token(Some("t".to_string()));

        let found = client.users().search(" grace hopper ").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "grace hopper");

        assert!(client.users().search("   ").await.unwrap().is_empty());
    }
}
