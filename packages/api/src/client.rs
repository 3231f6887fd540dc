//! # REST client
//!
//! [`ApiClient`] is a thin wrapper around [`reqwest::Client`] that knows the
//! backend's base URL and carries the bearer token obtained at login. Clones
//! share the token, so the UI can hand copies to every component and a login
//! or logout is seen by all of them.
//!
//! Endpoints are grouped by resource; each group borrows the client:
//!
//! | Accessor | Resource |
//! |----------|----------|
//! | [`auth`](ApiClient::auth) | register, login, logout, current user |
//! | [`users`](ApiClient::users) | profiles and search |
//! | [`circles`](ApiClient::circles) | circles and their messages |
//! | [`friend_requests`](ApiClient::friend_requests) | requests and friendships |
//! | [`direct_messages`](ApiClient::direct_messages) | conversations and voice notes |
//! | [`calls`](ApiClient::calls) | call sessions and audio credentials |

use std::sync::{Arc, RwLock};

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::resources::{Auth, Calls, Circles, DirectMessages, FriendRequests, Users};
use crate::ApiError;

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.api.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current bearer token, if signed in.
    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    /// Replace the bearer token (or clear it with `None`).
    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn auth(&self) -> Auth<'_> {
        Auth::new(self)
    }

    pub fn users(&self) -> Users<'_> {
        Users::new(self)
    }

    pub fn circles(&self) -> Circles<'_> {
        Circles::new(self)
    }

    pub fn friend_requests(&self) -> FriendRequests<'_> {
        FriendRequests::new(self)
    }

    pub fn direct_messages(&self) -> DirectMessages<'_> {
        DirectMessages::new(self)
    }

    pub fn calls(&self) -> Calls<'_> {
        Calls::new(self)
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request; `authed` requests fail early without a token.
    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        authed: bool,
    ) -> Result<RequestBuilder, ApiError> {
        let builder = self.http.request(method, self.url(path));
        if !authed {
            return Ok(builder);
        }
        match self.token() {
            Some(token) => Ok(builder.bearer_auth(token)),
            None => Err(ApiError::NotAuthenticated),
        }
    }

    /// Send a request and decode a JSON body.
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let body = self.execute_raw(builder).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Send a request whose response body is ignored.
    pub(crate) async fn execute_empty(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        self.execute_raw(builder).await.map(|_| ())
    }

    async fn execute_raw(&self, builder: RequestBuilder) -> Result<String, ApiError> {
        let request = builder.build()?;
        tracing::debug!("{} {}", request.method(), request.url().path());
        let response = self.http.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            Ok(body)
        } else {
            let err = ApiError::from_status(status.as_u16(), &body);
            tracing::warn!("request failed: {}", err);
            Err(err)
        }
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let builder = self.request(Method::GET, path, true)?;
        self.execute(builder).await
    }

    pub(crate) async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let builder = self.request(Method::POST, path, true)?.json(body);
        self.execute(builder).await
    }

    pub(crate) async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let builder = self.request(Method::PUT, path, true)?.json(body);
        self.execute(builder).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, path, true)?;
        self.execute_empty(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_server;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};

    #[test]
    fn test_url_joining() {
        let client = ApiClient::new("http://localhost:5000/api/");
        assert_eq!(client.base_url(), "http://localhost:5000/api");
        assert_eq!(client.url("/circles"), "http://localhost:5000/api/circles");
        assert_eq!(client.url("circles/1"), "http://localhost:5000/api/circles/1");
    }

    #[test]
    fn test_clones_share_token() {
        let client = ApiClient::new("http://localhost");
        let other = client.clone();
        assert!(!other.is_authenticated());
        client.set_token(Some("abc".to_string()));
        assert_eq!(other.token().as_deref(), Some("abc"));
        other.set_token(None);
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn test_authed_request_without_token_fails_early() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let result: Result<serde_json::Value, _> = client.get("/auth/me").await;
        assert!(matches!(result, Err(ApiError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_bearer_header_and_error_mapping() {
        let router = Router::new()
            .route(
                "/echo-auth",
                get(|headers: HeaderMap| async move {
                    let value = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    Json(serde_json::json!({ "authorization": value }))
                }),
            )
            .route(
                "/conflict",
                get(|| async {
                    (
                        StatusCode::CONFLICT,
                        Json(serde_json::json!({ "message": "Already friends" })),
                    )
                }),
            )
            .route("/expired", get(|| async { StatusCode::UNAUTHORIZED }));
        let base = spawn_server(router).await;

        let client = ApiClient::new(base);
        client.set_token(Some("t0k3n".to_string()));

        let echoed: serde_json::Value = client.get("/echo-auth").await.unwrap();
        assert_eq!(echoed["authorization"], "Bearer t0k3n");

        match client.get::<serde_json::Value>("/conflict").await {
            Err(ApiError::Status { status, message }) => {
                assert_eq!(status, 409);
                assert_eq!(message, "Already friends");
            }
            other => panic!("unexpected {other:?}"),
        }

        let expired = client.get::<serde_json::Value>("/expired").await;
        assert!(matches!(expired, Err(ApiError::Unauthorized)));
    }
}
