//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Closed set of privilege levels.
///
/// Role checks are flat set-membership tests; there is no hierarchy. The
/// database carries the same labels in the `user_role` enum type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    SuperAdmin,
    ItAdmin,
    ItManager,
    Auditor,
}

impl UserRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::ItAdmin => "IT_ADMIN",
            Self::ItManager => "IT_MANAGER",
            Self::Auditor => "AUDITOR",
        }
    }
}

impl FromStr for UserRole {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "SUPER_ADMIN" => Ok(Self::SuperAdmin),
            "IT_ADMIN" => Ok(Self::ItAdmin),
            "IT_MANAGER" => Ok(Self::ItManager),
            "AUDITOR" => Ok(Self::Auditor),
            _ => Err(()),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserEnvelope {
    pub user: UserResponse,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapRequest {
    pub email: String,
    pub new_password: String,
    pub setup_secret: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct BootstrapResponse {
    pub message: String,
    pub user: UserResponse,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    /// One of the `user_role` labels; validated server-side to return 400
    /// instead of a deserialization error.
    pub role: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub password_updated_at: Option<String>,
    pub created_at: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AdminUserEnvelope {
    pub data: AdminUserResponse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn role_labels_round_trip() {
        for role in [
            UserRole::SuperAdmin,
            UserRole::ItAdmin,
            UserRole::ItManager,
            UserRole::Auditor,
        ] {
            assert_eq!(role.as_str().parse::<UserRole>(), Ok(role));
        }
        assert!("OPERATOR".parse::<UserRole>().is_err());
        assert!("it_admin".parse::<UserRole>().is_err());
    }

    #[test]
    fn role_serializes_as_screaming_snake() -> Result<()> {
        let value = serde_json::to_value(UserRole::ItManager)?;
        assert_eq!(value, "IT_MANAGER");
        let decoded: UserRole = serde_json::from_value(value)?;
        assert_eq!(decoded, UserRole::ItManager);
        Ok(())
    }

    #[test]
    fn bootstrap_request_uses_camel_case() -> Result<()> {
        let request: BootstrapRequest = serde_json::from_value(serde_json::json!({
            "email": "it.admin@company.local",
            "newPassword": "ChangeMeNow123!",
            "setupSecret": "secret",
        }))?;
        assert_eq!(request.new_password, "ChangeMeNow123!");
        Ok(())
    }

    #[test]
    fn password_change_request_uses_camel_case() -> Result<()> {
        let request: PasswordChangeRequest = serde_json::from_value(serde_json::json!({
            "currentPassword": "old",
            "newPassword": "new",
        }))?;
        assert_eq!(request.current_password, "old");
        assert_eq!(request.new_password, "new");
        Ok(())
    }
}
