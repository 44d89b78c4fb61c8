use core::str::FromStr;

use serde::{Deserialize, Serialize};

use discoverly_auth::{Registration, Role, User};
use discoverly_core::DomainError;

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdateRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct ExcludeQuery {
    pub exclude: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptedQuery {
    pub tag: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntentRequest {
    /// Number or numeric string, in dollars.
    pub price: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub intent_id: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub inserted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl From<Registration> for RegistrationResponse {
    fn from(r: Registration) -> Self {
        match r {
            Registration::Created(user) => Self {
                inserted: true,
                user: Some(user),
                message: None,
            },
            Registration::AlreadyExists => Self {
                inserted: false,
                user: None,
                message: Some("user already exists"),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub email: String,
    pub role: Option<Role>,
    pub admin: bool,
    pub moderator: bool,
}

impl RoleResponse {
    pub fn new(email: String, role: Option<Role>) -> Self {
        Self {
            email,
            admin: role == Some(Role::Admin),
            moderator: role == Some(Role::Moderator),
            role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

// -------------------------
// Mapping helpers
// -------------------------

/// Parse a path identifier; failures are `400 validation_error`.
pub fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(ApiError::from)
}

pub fn parse_role(raw: &str) -> Result<Role, ApiError> {
    Role::from_str(raw).map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use discoverly_core::ProductId;

    #[test]
    fn role_response_flags_follow_role() {
        let r = RoleResponse::new("a@x.io".into(), Some(Role::Moderator));
        assert!(r.moderator && !r.admin);
        let r = RoleResponse::new("a@x.io".into(), None);
        assert!(!r.moderator && !r.admin);
    }

    #[test]
    fn bad_ids_are_validation_errors() {
        let err = parse_id::<ProductId>("nope").unwrap_err();
        assert_eq!(err.0.code(), "validation_error");
    }
}
