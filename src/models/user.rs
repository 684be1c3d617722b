//! User model and related types.

use serde::{Deserialize, Serialize};

use crate::crypto::password::verify_password;

/// Account role. Gates a handful of admin-only operations and drives
/// client-side presentation; most handlers only care about identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Dj,
    User,
}

impl Role {
    /// Database text representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Dj => "DJ",
            Role::User => "USER",
        }
    }

    /// Parse the database text representation. Unknown values fall back to
    /// the ordinary user role rather than failing the whole row.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "ADMIN" => Role::Admin,
            "DJ" => Role::Dj,
            _ => Role::User,
        }
    }
}

/// A user account (domain model).
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    /// Argon2id hashed password. `None` for accounts created through social
    /// sign-in only; such accounts cannot use password login.
    pub password_hash: Option<String>,
    pub role: Role,
}

impl User {
    /// Check if user is an admin.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Verify a password against the stored Argon2 hash.
    /// Social-only accounts (no hash) never verify.
    pub fn verify_password(&self, password: &str) -> bool {
        match &self.password_hash {
            Some(hash) => verify_password(password, hash).unwrap_or(false),
            None => false,
        }
    }
}

/// Compact user summary attached to mixes, comments, and profiles.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DjSummary {
    pub id: i32,
    pub username: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub role: Role,
}

impl DjSummary {
    pub fn new(user: &User, username: impl Into<String>) -> Self {
        Self {
            id: user.id,
            username: username.into(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
            role: user.role,
        }
    }
}

/// Response body for register/login/social sign-in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    pub token: String,
    pub user: DjSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Admin, Role::Dj, Role::User] {
            assert_eq!(Role::from_str_lossy(role.as_str()), role);
        }
    }

    #[test]
    fn test_unknown_role_falls_back_to_user() {
        assert_eq!(Role::from_str_lossy("SUPERSTAR"), Role::User);
    }

    #[test]
    fn test_social_account_never_verifies_password() {
        let user = User {
            id: 1,
            email: "dj@example.com".into(),
            display_name: "DJ".into(),
            avatar_url: None,
            password_hash: None,
            role: Role::Dj,
        };
        assert!(!user.verify_password("anything"));
    }
}
