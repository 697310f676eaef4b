//! Employee administration: provisioning, removal and listing of staff
//! accounts.
//!
//! A staff member is an identity account plus a role record. Provisioning
//! creates both and mails a password-reset link so the new employee picks
//! their own password. Removal deletes only the role record; the account
//! stays but can no longer get past [`authenticate`](crate::identity::authenticate).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::broadcast::{ChangeEvent, ChangeFeed, Collection};
use crate::config::BootstrapAdmin;
use crate::db::role_repo::{self, RoleRow};
use crate::db::{format_timestamp, parse_timestamp, Database, DatabaseError};
use crate::error::{AdminError, ValidationError};
use crate::identity::{validate_email, Actor, AuthError, IdentityProvider, Role};
use crate::sanitize::redact_email;
use crate::secrets::resolve_secret;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub uid: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Employee {
    pub fn from_row(row: &RoleRow) -> Result<Self, DatabaseError> {
        let role = row
            .role
            .parse()
            .map_err(|e: ValidationError| DatabaseError::InvalidValue {
                column: "role",
                value: row.role.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            uid: row.uid.clone(),
            email: row.email.clone(),
            name: row.name.clone(),
            role,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

/// Input for [`EmployeeDirectory::provision_employee`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewEmployee {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: String,
}

pub struct EmployeeDirectory {
    db: Database,
    identity: Arc<dyn IdentityProvider>,
    feed: ChangeFeed,
}

impl EmployeeDirectory {
    pub fn new(db: Database, identity: Arc<dyn IdentityProvider>, feed: ChangeFeed) -> Self {
        Self { db, identity, feed }
    }

    /// Creates an account and role record, then mails a reset link.
    ///
    /// An account left behind by [`remove_employee`](Self::remove_employee)
    /// is reused, so a removed employee can be provisioned again.
    pub fn provision_employee(
        &self,
        actor: &Actor,
        request: &NewEmployee,
    ) -> Result<Employee, AdminError> {
        actor.require(Role::Admin)?;
        validate_email(&request.email)?;
        let role: Role = request.role.parse()?;
        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let account = match self.identity.find_by_email(&request.email)? {
            Some(existing) if role_repo::find_by_uid(&self.db, &existing.uid)?.is_some() => {
                return Err(AuthError::EmailInUse(existing.email).into());
            }
            Some(existing) => {
                tracing::info!(uid = %existing.uid, "Reusing account without a role record");
                existing
            }
            None => {
                let temp_password = SecretString::from(Uuid::new_v4().simple().to_string());
                self.identity.create_account(&request.email, &temp_password)?
            }
        };

        let row = RoleRow {
            uid: account.uid.clone(),
            email: account.email.clone(),
            name,
            role: role.as_str().to_string(),
            created_at: format_timestamp(Utc::now()),
        };
        role_repo::upsert(&self.db, &row)?;
        self.feed
            .publish(ChangeEvent::upserted(Collection::Roles, &row.uid));

        tracing::info!(
            uid = %row.uid,
            email = %redact_email(&row.email),
            role = %role,
            by = %actor.uid,
            "Employee provisioned"
        );

        if let Err(e) = self.identity.send_password_reset_email(&account.email) {
            tracing::warn!(
                uid = %row.uid,
                error = %e,
                "Employee provisioned but the reset email could not be sent"
            );
            return Err(e.into());
        }

        Ok(Employee::from_row(&row)?)
    }

    /// Deletes the role record of `uid`. Admins cannot remove themselves.
    pub fn remove_employee(&self, actor: &Actor, uid: &str) -> Result<(), AdminError> {
        actor.require(Role::Admin)?;
        if actor.uid == uid {
            return Err(ValidationError::SelfRemoval.into());
        }

        if !role_repo::delete(&self.db, uid)? {
            return Err(AdminError::NotFound(uid.to_string()));
        }
        self.feed.publish(ChangeEvent::deleted(Collection::Roles, uid));

        tracing::info!(uid = %uid, by = %actor.uid, "Employee removed");
        Ok(())
    }

    pub fn list_employees(&self, actor: &Actor) -> Result<Vec<Employee>, AdminError> {
        actor.require(Role::Admin)?;
        let employees = role_repo::list_all(&self.db)?
            .iter()
            .map(Employee::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(employees)
    }

    /// Makes sure at least one admin exists, creating the configured one if
    /// none does. Returns the created admin, or `None` if nothing was done.
    pub fn ensure_bootstrap_admin(
        &self,
        bootstrap: &BootstrapAdmin,
    ) -> crate::Result<Option<Employee>> {
        if role_repo::count_by_role(&self.db, Role::Admin.as_str())? > 0 {
            return Ok(None);
        }

        let password = resolve_secret(
            bootstrap.password.as_deref(),
            bootstrap.password_file.as_deref(),
            bootstrap.password_env_var.as_deref(),
        )?;

        let account = match self.identity.find_by_email(&bootstrap.email)? {
            Some(existing) => existing,
            None => self.identity.create_account(&bootstrap.email, &password)?,
        };

        let row = RoleRow {
            uid: account.uid.clone(),
            email: account.email.clone(),
            name: bootstrap.name.clone(),
            role: Role::Admin.as_str().to_string(),
            created_at: format_timestamp(Utc::now()),
        };
        role_repo::upsert(&self.db, &row)?;
        self.feed
            .publish(ChangeEvent::upserted(Collection::Roles, &row.uid));

        tracing::info!(
            uid = %row.uid,
            email = %redact_email(&row.email),
            "Bootstrap admin created"
        );
        Ok(Some(Employee::from_row(&row)?))
    }
}
