//! # User records
//!
//! [`User`] mirrors the profile object the backend returns from `/auth/me`,
//! `/users/:id` and inside friend requests. [`AuthResponse`] is the body of a
//! successful login or registration: a bearer token plus the signed-in user.

use serde::{Deserialize, Serialize};

/// A user profile as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub online: bool,
}

impl User {
    /// Get display name, falling back to the username if it is not set.
    pub fn display_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

/// Token and profile returned by `/auth/login` and `/auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_fallback() {
        let mut user: User = serde_json::from_str(
            r#"{"id":"u1","username":"ada","email":"ada@example.com"}"#,
        )
        .unwrap();
        assert_eq!(user.display_name(), "ada");
        assert!(!user.online);

        user.display_name = Some("  ".to_string());
        assert_eq!(user.display_name(), "ada");

        user.display_name = Some("Ada Lovelace".to_string());
        assert_eq!(user.display_name(), "Ada Lovelace");
    }

    #[test]
    fn test_camel_case_fields() {
        let user: User = serde_json::from_str(
            r#"{"id":"u2","username":"bob","displayName":"Bob","avatarUrl":"/a.png","online":true}"#,
        )
        .unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Bob"));
        assert_eq!(user.avatar_url.as_deref(), Some("/a.png"));
        assert!(user.online);
    }
}
