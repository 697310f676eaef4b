//! Role-checked login and per-request actor resolution.

use secrecy::SecretString;
use serde::Serialize;

use super::{AuthError, Identity, IdentityProvider, Role, Session};
use crate::db::{role_repo, Database};
use crate::sanitize::redact_email;

/// The signed-in user on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub uid: String,
    pub email: String,
    /// Name written into history entries and shown in greetings.
    pub display_name: String,
    pub role: Role,
}

impl Actor {
    /// Looks up the role record of an identity.
    pub fn resolve(db: &Database, identity: &Identity) -> Result<Actor, AuthError> {
        let record = role_repo::find_by_uid(db, &identity.uid)?.ok_or(AuthError::NoRoleRecord)?;
        let role: Role = record.role.parse()?;
        let display_name = record
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| role.default_display_name().to_string());

        Ok(Actor {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            display_name,
            role,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails unless the actor holds `required`. Admins pass employee checks.
    pub fn require(&self, required: Role) -> Result<(), AuthError> {
        match (required, self.role) {
            (Role::Employee, _) | (Role::Admin, Role::Admin) => Ok(()),
            (Role::Admin, Role::Employee) => Err(AuthError::UnauthorizedRole),
        }
    }
}

/// Signs in and checks that the account holds `requested_role`.
///
/// Any failure after the credentials were accepted signs the session out
/// again, so a rejected login never leaves a live token behind.
pub fn login(
    identity: &dyn IdentityProvider,
    db: &Database,
    email: &str,
    password: &SecretString,
    requested_role: Role,
) -> Result<(Session, Actor), AuthError> {
    let session = identity.sign_in(email, password)?;

    let actor = match Actor::resolve(db, &session.identity) {
        Ok(actor) if actor.role == requested_role => actor,
        Ok(actor) => {
            tracing::warn!(
                email = %redact_email(&session.identity.email),
                requested = %requested_role,
                actual = %actor.role,
                "Login rejected: role mismatch"
            );
            identity.sign_out(&session.token);
            return Err(AuthError::UnauthorizedRole);
        }
        Err(e) => {
            tracing::warn!(
                email = %redact_email(&session.identity.email),
                error = %e,
                "Login rejected"
            );
            identity.sign_out(&session.token);
            return Err(e);
        }
    };

    tracing::info!(uid = %actor.uid, role = %actor.role, "Signed in");
    Ok((session, actor))
}

/// Resolves the actor behind a session token.
///
/// The role record is read on every call, so removing it revokes access
/// immediately.
pub fn authenticate(
    identity: &dyn IdentityProvider,
    db: &Database,
    token: &str,
) -> Result<Actor, AuthError> {
    let user = identity
        .current_session_user(token)
        .ok_or(AuthError::NotSignedIn)?;
    Actor::resolve(db, &user)
}
