//! Access control: credential → principal, plus user administration.
//!
//! A principal is rebuilt from the user record on every request. Credentials
//! only prove an email; role and subscription state are read fresh, so role
//! changes apply immediately to previously issued credentials.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use discoverly_auth::{
    Gate, Identity, JwtIssuer, JwtValidator, NewUser, Principal, Registration, Role, User,
};
use discoverly_core::Email;

use crate::error::{ServiceError, ServiceResult};
use crate::store::StoreHandle;

#[derive(Clone)]
pub struct AccessControl {
    store: StoreHandle,
    validator: Arc<dyn JwtValidator>,
    issuer: Arc<dyn JwtIssuer>,
}

impl AccessControl {
    pub fn new(store: StoreHandle, validator: Arc<dyn JwtValidator>, issuer: Arc<dyn JwtIssuer>) -> Self {
        Self {
            store,
            validator,
            issuer,
        }
    }

    /// Verify a bearer credential without touching the store.
    pub fn identify(&self, bearer: Option<&str>) -> ServiceResult<Identity> {
        let token = bearer
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::unauthorized("missing bearer token"))?;
        let claims = self.validator.validate(token, Utc::now())?;
        Ok(Identity {
            email: claims.email,
        })
    }

    /// Verify the credential and resolve the caller's current role.
    pub async fn authenticate(&self, bearer: Option<&str>) -> ServiceResult<Principal> {
        let identity = self.identify(bearer)?;
        self.resolve(&identity).await
    }

    pub async fn resolve(&self, identity: &Identity) -> ServiceResult<Principal> {
        let user = self
            .store
            .run("find_user", self.store.get().find_user(&identity.email))
            .await?;
        match user {
            Some(user) => Ok(user.principal()),
            None => {
                warn!(email = %identity.email, "credential for unregistered user");
                Err(ServiceError::unauthorized("unknown user"))
            }
        }
    }

    /// Issue a credential for a registered email.
    #[instrument(skip(self), err)]
    pub async fn issue_token(&self, email: &str) -> ServiceResult<String> {
        let email = Email::parse(email)?;
        let exists = self
            .store
            .run("find_user", self.store.get().find_user(&email))
            .await?
            .is_some();
        if !exists {
            return Err(ServiceError::unauthorized("unknown user"));
        }
        Ok(self.issuer.issue(&email, Utc::now())?)
    }

    /// Idempotent: re-registering an existing email changes nothing.
    #[instrument(skip(self, new), fields(email = %new.email), err)]
    pub async fn register(&self, new: NewUser) -> ServiceResult<Registration> {
        let user = User::register(new, Utc::now())?;
        let inserted = self
            .store
            .run(
                "insert_user_if_absent",
                self.store.get().insert_user_if_absent(user.clone()),
            )
            .await?;
        if inserted {
            info!(email = %user.email, "user registered");
            Ok(Registration::Created(user))
        } else {
            Ok(Registration::AlreadyExists)
        }
    }

    /// Public role lookup; `None` for unknown or malformed emails.
    pub async fn role_of(&self, email: &str) -> ServiceResult<Option<Role>> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };
        let user = self
            .store
            .run("find_user", self.store.get().find_user(&email))
            .await?;
        Ok(user.map(|u| u.role))
    }

    pub async fn get_user(&self, principal: &Principal, email: &str) -> ServiceResult<User> {
        let email = Email::parse(email)?;
        Gate::owner_or(&email, &[]).check(principal)?;
        self.store
            .run("find_user", self.store.get().find_user(&email))
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }

    /// All users except `exclude` (the caller when absent).
    pub async fn list_users(&self, principal: &Principal, exclude: Option<&str>) -> ServiceResult<Vec<User>> {
        Gate::role(Role::Admin).check(principal)?;
        let exclude = match exclude {
            Some(raw) => Email::parse(raw)?,
            None => principal.email.clone(),
        };
        Ok(self
            .store
            .run("list_users_except", self.store.get().list_users_except(&exclude))
            .await?)
    }

    #[instrument(skip(self, principal), fields(admin = %principal.email), err)]
    pub async fn set_role(&self, principal: &Principal, email: &str, role: Role) -> ServiceResult<User> {
        Gate::role(Role::Admin).check(principal)?;
        let email = Email::parse(email)?;
        let user = self
            .store
            .run("set_user_role", self.store.get().set_user_role(&email, role))
            .await?
            .ok_or(ServiceError::NotFound("user"))?;
        info!(email = %user.email, role = %role, "role changed");
        Ok(user)
    }

    /// Record a successful subscription payment for the caller.
    #[instrument(skip(self, principal), fields(caller = %principal.email), err)]
    pub async fn mark_subscribed(&self, principal: &Principal, email: &str) -> ServiceResult<User> {
        let email = Email::parse(email)?;
        Gate::owner_or(&email, &[]).check(principal)?;
        let user = self
            .store
            .run("set_user_subscribed", self.store.get().set_user_subscribed(&email))
            .await?
            .ok_or(ServiceError::NotFound("user"))?;
        info!(email = %user.email, "subscription activated");
        Ok(user)
    }

    /// Startup-only: ensure `email` exists and holds the `Admin` role.
    #[instrument(skip(self), err)]
    pub async fn bootstrap_admin(&self, email: &Email) -> ServiceResult<User> {
        self.register(NewUser {
            email: email.as_str().to_string(),
            name: None,
            photo_url: None,
        })
        .await?;
        let user = self
            .store
            .run("set_user_role", self.store.get().set_user_role(email, Role::Admin))
            .await?
            .ok_or(ServiceError::NotFound("user"))?;
        info!(email = %user.email, "bootstrap admin ready");
        Ok(user)
    }
}

impl core::fmt::Debug for AccessControl {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessControl").field("store", &self.store).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, member};
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn registration_is_idempotent() {
        let fx = Fixture::new();
        let first = fx.access.register(member("alice@x.io")).await.unwrap();
        assert!(matches!(first, Registration::Created(ref u) if u.role == Role::Member));
        let again = fx.access.register(member("ALICE@x.io")).await.unwrap();
        assert_eq!(again, Registration::AlreadyExists);
    }

    #[tokio::test]
    async fn missing_or_bad_credentials_are_unauthorized() {
        let fx = Fixture::new();
        let err = fx.access.authenticate(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        let err = fx.access.authenticate(Some("not-a-jwt")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn credential_for_unregistered_user_is_unauthorized() {
        let fx = Fixture::new();
        let token = fx.token_for_unregistered("ghost@x.io");
        let err = fx.access.authenticate(Some(&token)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(fx.access.issue_token("ghost@x.io").await.is_err());
    }

    #[tokio::test]
    async fn role_change_applies_to_existing_credential() {
        let fx = Fixture::new();
        let admin = fx.user_with_role("root@x.io", Role::Admin).await;
        fx.access.register(member("mod@x.io")).await.unwrap();
        let token = fx.access.issue_token("mod@x.io").await.unwrap();

        let before = fx.access.authenticate(Some(&token)).await.unwrap();
        assert_eq!(before.role, Role::Member);

        fx.access.set_role(&admin, "mod@x.io", Role::Moderator).await.unwrap();
        let after = fx.access.authenticate(Some(&token)).await.unwrap();
        assert_eq!(after.role, Role::Moderator);
    }

    #[tokio::test]
    async fn user_admin_requires_admin_role() {
        let fx = Fixture::new();
        let moderator = fx.user_with_role("mod@x.io", Role::Moderator).await;
        let err = fx.access.list_users(&moderator, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let admin = fx.user_with_role("root@x.io", Role::Admin).await;
        let users = fx.access.list_users(&admin, None).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email.as_str(), "mod@x.io");

        let err = fx.access.set_role(&admin, "nobody@x.io", Role::Admin).await.unwrap_err();
        assert_eq!(err, ServiceError::NotFound("user"));
    }

    #[tokio::test]
    async fn profiles_are_owner_only() {
        let fx = Fixture::new();
        let alice = fx.user_with_role("alice@x.io", Role::Member).await;
        fx.user_with_role("bob@x.io", Role::Member).await;

        assert!(fx.access.get_user(&alice, "alice@x.io").await.is_ok());
        let err = fx.access.get_user(&alice, "bob@x.io").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let err = fx.access.mark_subscribed(&alice, "bob@x.io").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn bootstrap_admin_is_repeatable() {
        let fx = Fixture::new();
        let email = Email::parse("root@x.io").unwrap();
        fx.access.bootstrap_admin(&email).await.unwrap();
        let user = fx.access.bootstrap_admin(&email).await.unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(fx.access.role_of("root@x.io").await.unwrap(), Some(Role::Admin));
    }

    #[tokio::test]
    async fn role_lookup_is_public_and_optional() {
        let fx = Fixture::new();
        fx.user_with_role("mod@x.io", Role::Moderator).await;
        assert_eq!(fx.access.role_of("mod@x.io").await.unwrap(), Some(Role::Moderator));
        assert_eq!(fx.access.role_of("nobody@x.io").await.unwrap(), None);
        assert_eq!(fx.access.role_of("not an email").await.unwrap(), None);
    }
}
