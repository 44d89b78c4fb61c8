//! User records.
//!
//! Users are keyed by email. Registration is idempotent: a second registration
//! for the same email changes nothing and reports [`Registration::AlreadyExists`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use discoverly_core::{DomainError, Email, Entity};

use crate::{Principal, Role};

/// A registered marketplace user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: Email,
    pub name: Option<String>,
    pub photo_url: Option<String>,
    pub role: Role,
    pub is_subscribed: bool,
    pub created_at: DateTime<Utc>,
}

/// Registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Outcome of an idempotent registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Created(User),
    AlreadyExists,
}

impl User {
    /// Build a fresh user record: `Member`, unsubscribed.
    ///
    /// Roles are never taken from the registration payload.
    pub fn register(new: NewUser, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let email = Email::parse(&new.email)?;
        let name = new
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Ok(Self {
            email,
            name,
            photo_url: new.photo_url,
            role: Role::Member,
            is_subscribed: false,
            created_at: now,
        })
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.email.clone(), self.role, self.is_subscribed)
    }
}

impl Entity for User {
    type Id = Email;

    fn id(&self) -> &Self::Id {
        &self.email
    }
}
