use crate::models::{CallCredentials, CallSession, CallStatus};
use crate::{ApiClient, ApiError};

pub struct Calls<'a> {
    client: &'a ApiClient,
}

impl<'a> Calls<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Create a ringing call session towards `callee_id`.
    pub async fn start(&self, callee_id: &str) -> Result<CallSession, ApiError> {
        self.client
            .post("/calls", &serde_json::json!({ "calleeId": callee_id }))
            .await
    }

    /// Audio channel credentials for a call the current user takes part in.
    pub async fn credentials(&self, call_id: &str) -> Result<CallCredentials, ApiError> {
        self.client.get(&format!("/calls/{call_id}/token")).await
    }

    pub async fn update_status(
        &self,
        call_id: &str,
        status: CallStatus,
    ) -> Result<CallSession, ApiError> {
        self.client
            .put(
                &format!("/calls/{call_id}/status"),
                &serde_json::json!({ "status": status }),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_server;
    use axum::extract::Path;
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_call_lifecycle_endpoints() {
        let router = Router::new()
            .route(
                "/calls",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({
                        "id": "call-1",
                        "callerId": "u1",
                        "calleeId": body["calleeId"],
                        "channelName": "call-1-chan",
                        "status": "ringing"
                    }))
                }),
            )
            .route(
                "/calls/{id}/token",
                get(|Path(id): Path<String>| async move {
                    Json(json!({
                        "appId": "app",
                        "channel": format!("{id}-chan"),
                        "token": "rtc-token",
                        "uid": 42
                    }))
                }),
            )
            .route(
                "/calls/{id}/status",
                put(|Path(id): Path<String>, Json(body): Json<Value>| async move {
                    Json(json!({
                        "id": id,
                        "callerId": "u1",
                        "calleeId": "u2",
                        "channelName": "call-1-chan",
                        "status": body["status"]
                    }))
                }),
            );
        let client = ApiClient::new(spawn_server(router).await);
        client.set_token(Some("t".to_string()));

        let session = client.calls().start("u2").await.unwrap();
        assert_eq!(session.callee_id, "u2");
        assert_eq!(session.status, CallStatus::Ringing);
        assert_eq!(session.peer_of("u1"), "u2");

        let creds = client.calls().credentials(&session.id).await.unwrap();
        assert_eq!(creds.channel, "call-1-chan");
        assert_eq!(creds.uid, 42);

        let ended = client
            .calls()
            .update_status(&session.id, CallStatus::Ended)
            .await
            .unwrap();
        assert_eq!(ended.status, CallStatus::Ended);
    }
}
