use serde::Serialize;

use discoverly_core::Email;

use crate::Role;

/// Identity proven by a verified credential: who the caller claims to be.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Identity {
    pub email: Email,
}

/// A fully resolved principal for authorization decisions.
///
/// Built per request from an [`Identity`] plus the user record as it exists
/// *now*; never cached across requests, so role changes take effect on the
/// next call even for previously issued credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub email: Email,
    pub role: Role,
    pub is_subscribed: bool,
}

impl Principal {
    pub fn new(email: Email, role: Role, is_subscribed: bool) -> Self {
        Self {
            email,
            role,
            is_subscribed,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn owns(&self, email: &Email) -> bool {
        &self.email == email
    }
}
