//! Registration, login and the current-user endpoint.

use reqwest::Method;
use serde::Serialize;

use crate::models::{AuthResponse, User};
use crate::{ApiClient, ApiError};

const MIN_PASSWORD_LEN: usize = 6;

pub struct Auth<'a> {
    client: &'a ApiClient,
}

#[derive(Serialize)]
struct LoginBody<'b> {
    email: &'b str,
    password: &'b str,
}

#[derive(Serialize)]
struct RegisterBody<'b> {
    username: &'b str,
    email: &'b str,
    password: &'b str,
}

impl<'a> Auth<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Create an account and sign in with it.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        let username = username.trim();
        let email = email.trim().to_lowercase();
        validate_registration(username, &email, password)?;

        let builder = self
            .client
            .request(Method::POST, "/auth/register", false)?
            .json(&RegisterBody {
                username,
                email: &email,
                password,
            });
        let response: AuthResponse = self.client.execute(builder).await?;
        self.client.set_token(Some(response.token.clone()));
        tracing::info!("registered as {}", response.user.username);
        Ok(response)
    }

    /// Exchange credentials for a token; the token is kept on the client.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(ApiError::validation("Please enter a valid email"));
        }
        if password.is_empty() {
            return Err(ApiError::validation("Password is required"));
        }

        let builder = self
            .client
            .request(Method::POST, "/auth/login", false)?
            .json(&LoginBody {
                email: &email,
                password,
            });
        let response: AuthResponse = self.client.execute(builder).await?;
        self.client.set_token(Some(response.token.clone()));
        tracing::info!("signed in as {}", response.user.username);
        Ok(response)
    }

    /// Drop the token. The server is told on a best-effort basis.
    pub async fn logout(&self) -> Result<(), ApiError> {
        if self.client.is_authenticated() {
            let builder = self.client.request(Method::POST, "/auth/logout", true)?;
            if let Err(e) = self.client.execute_empty(builder).await {
                tracing::warn!("logout request failed: {}", e);
            }
        }
        self.client.set_token(None);
        Ok(())
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        self.client.get("/auth/me").await
    }
}

fn validate_registration(username: &str, email: &str, password: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::validation("Please enter a valid email"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
