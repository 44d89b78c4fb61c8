use thiserror::Error;

use discoverly_core::Email;

use crate::{Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: requires role '{0}'")]
    MissingRole(Role),

    #[error("forbidden: resource belongs to another user")]
    NotOwner,

    #[error("forbidden: none of [{0}] satisfied")]
    NoneSatisfied(String),
}

/// A single capability check against a resolved principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Any resolved principal passes.
    Authenticated,
    /// Exact role match.
    Role(Role),
    /// The principal's email must equal the given one.
    Owner(Email),
    /// At least one nested requirement must hold.
    AnyOf(Vec<Requirement>),
}

impl core::fmt::Display for Requirement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Requirement::Authenticated => f.write_str("authenticated"),
            Requirement::Role(r) => write!(f, "role:{r}"),
            Requirement::Owner(e) => write!(f, "owner:{e}"),
            Requirement::AnyOf(reqs) => {
                let parts: Vec<String> = reqs.iter().map(|r| r.to_string()).collect();
                write!(f, "any_of({})", parts.join(", "))
            }
        }
    }
}

/// Evaluate one requirement.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Requirement) -> Result<(), AuthzError> {
    match required {
        Requirement::Authenticated => Ok(()),
        Requirement::Role(role) => {
            if principal.has_role(*role) {
                Ok(())
            } else {
                Err(AuthzError::MissingRole(*role))
            }
        }
        Requirement::Owner(email) => {
            if principal.owns(email) {
                Ok(())
            } else {
                Err(AuthzError::NotOwner)
            }
        }
        Requirement::AnyOf(options) => {
            if options.iter().any(|r| authorize(principal, r).is_ok()) {
                Ok(())
            } else {
                let names: Vec<String> = options.iter().map(|r| r.to_string()).collect();
                Err(AuthzError::NoneSatisfied(names.join(", ")))
            }
        }
    }
}

/// Explicit chain of requirements; every link must hold, checked in order.
///
/// ```ignore
/// Gate::authenticated()
///     .and(Requirement::AnyOf(vec![
///         Requirement::Owner(product.owner_email.clone()),
///         Requirement::Role(Role::Moderator),
///     ]))
///     .check(&principal)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gate {
    requirements: Vec<Requirement>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn authenticated() -> Self {
        Self::new().and(Requirement::Authenticated)
    }

    pub fn role(role: Role) -> Self {
        Self::authenticated().and(Requirement::Role(role))
    }

    /// Owner of `email`, or any of the listed staff roles.
    pub fn owner_or(email: &Email, roles: &[Role]) -> Self {
        let mut options = vec![Requirement::Owner(email.clone())];
        options.extend(roles.iter().map(|r| Requirement::Role(*r)));
        Self::authenticated().and(Requirement::AnyOf(options))
    }

    pub fn and(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn check(&self, principal: &Principal) -> Result<(), AuthzError> {
        for requirement in &self.requirements {
            authorize(principal, requirement)?;
        }
        Ok(())
    }
}
