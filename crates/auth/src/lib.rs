//! `discoverly-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it verifies
//! credentials, models users and roles, and evaluates gates. Resolving the
//! *current* role of an identity is the caller's job (it must re-read the user
//! record on every request).

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{authorize, AuthzError, Gate, Requirement};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtIssuer, Hs256JwtValidator, JwtIssuer, JwtValidator};
pub use principal::{Identity, Principal};
pub use roles::Role;
pub use user::{NewUser, Registration, User};
