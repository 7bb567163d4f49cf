use sea_orm::{ConnectionTrait, TransactionTrait};

use crate::authz::types::{DeleteMode, PermissionArg, RoleArg};
use crate::authz::Authorizer;
use crate::errors::RolegateError;
use crate::storage::{self, Permission, Role};
use crate::subject::Subject;

impl Authorizer {
    fn ensure_shares_guard<S: Subject + ?Sized>(
        &self,
        subject: &S,
        guard_name: &str,
    ) -> Result<(), RolegateError> {
        let allowed = self.guards.guard_names_for(subject);
        if !allowed.iter().any(|g| g == guard_name) {
            return Err(RolegateError::guard_does_not_match(guard_name, &allowed));
        }
        Ok(())
    }

    /// Resolves every role in the subject's default guard and checks each
    /// shares one of the subject's guards.
    async fn stored_roles<C, S>(
        &self,
        db: &C,
        subject: &S,
        roles: Vec<RoleArg>,
    ) -> Result<Vec<Role>, RolegateError>
    where
        C: ConnectionTrait,
        S: Subject + ?Sized,
    {
        let guard = self.guards.default_guard_for(subject);
        let mut stored = Vec::with_capacity(roles.len());
        for role in roles {
            let role = match role {
                RoleArg::Name(name) => storage::find_role_by_name(db, &name, &guard).await?,
                RoleArg::Id(id) => storage::find_role_by_id(db, id, &guard).await?,
                RoleArg::Role(role) => role,
            };
            self.ensure_shares_guard(subject, &role.guard_name)?;
            stored.push(role);
        }
        Ok(stored)
    }

    async fn stored_permissions<C, S>(
        &self,
        db: &C,
        subject: &S,
        permissions: Vec<PermissionArg>,
    ) -> Result<Vec<Permission>, RolegateError>
    where
        C: ConnectionTrait,
        S: Subject + ?Sized,
    {
        let guard = self.guards.default_guard_for(subject);
        let mut stored = Vec::with_capacity(permissions.len());
        for permission in permissions {
            let permission = match permission {
                PermissionArg::Name(name) => {
                    storage::find_permission_by_name(db, &name, &guard).await?
                }
                PermissionArg::Permission(p) => p,
            };
            self.ensure_shares_guard(subject, &permission.guard_name)?;
            stored.push(permission);
        }
        Ok(stored)
    }

    /// Role-level variant: names resolve in the role's guard and must match it.
    async fn stored_role_permissions<C: ConnectionTrait>(
        &self,
        db: &C,
        role: &Role,
        permissions: Vec<PermissionArg>,
    ) -> Result<Vec<Permission>, RolegateError> {
        let mut stored = Vec::with_capacity(permissions.len());
        for permission in permissions {
            let permission = match permission {
                PermissionArg::Name(name) => {
                    storage::find_permission_by_name(db, &name, &role.guard_name).await?
                }
                PermissionArg::Permission(p) => p,
            };
            if permission.guard_name != role.guard_name {
                return Err(RolegateError::guard_does_not_match(
                    &permission.guard_name,
                    std::slice::from_ref(&role.guard_name),
                ));
            }
            stored.push(permission);
        }
        Ok(stored)
    }

    // Subject roles

    pub async fn assign_role<S, I, R>(&self, subject: &S, roles: I) -> Result<&Self, RolegateError>
    where
        S: Subject + ?Sized,
        I: IntoIterator<Item = R>,
        R: Into<RoleArg>,
    {
        let roles = roles.into_iter().map(Into::into).collect();
        let roles = self.stored_roles(&self.db, subject, roles).await?;
        let ids: Vec<i32> = roles.iter().map(|r| r.id).collect();

        storage::attach_roles(&self.db, subject.subject_type(), subject.subject_id(), &ids)
            .await?;
        self.forget_cached_permissions().await?;

        tracing::info!(
            subject_type = subject.subject_type(),
            subject_id = subject.subject_id(),
            roles = ?roles.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            "Assigned roles"
        );
        Ok(self)
    }

    pub async fn remove_role<S: Subject + ?Sized>(
        &self,
        subject: &S,
        role: impl Into<RoleArg>,
    ) -> Result<&Self, RolegateError> {
        let mut roles = self
            .stored_roles(&self.db, subject, vec![role.into()])
            .await?;
        let Some(role) = roles.pop() else {
            return Ok(self);
        };

        storage::detach_roles(
            &self.db,
            subject.subject_type(),
            subject.subject_id(),
            Some(&[role.id]),
        )
        .await?;
        self.forget_cached_permissions().await?;

        tracing::info!(
            subject_type = subject.subject_type(),
            subject_id = subject.subject_id(),
            role = %role.name,
            "Removed role"
        );
        Ok(self)
    }

    /// Replaces every role of the subject. Nothing changes if any role
    /// fails to resolve.
    pub async fn sync_roles<S, I, R>(&self, subject: &S, roles: I) -> Result<&Self, RolegateError>
    where
        S: Subject + ?Sized,
        I: IntoIterator<Item = R>,
        R: Into<RoleArg>,
    {
        let roles = roles.into_iter().map(Into::into).collect();

        let txn = self.db.begin().await?;
        let roles = self.stored_roles(&txn, subject, roles).await?;
        let ids: Vec<i32> = roles.iter().map(|r| r.id).collect();
        storage::detach_roles(&txn, subject.subject_type(), subject.subject_id(), None).await?;
        storage::attach_roles(&txn, subject.subject_type(), subject.subject_id(), &ids).await?;
        txn.commit().await?;

        self.forget_cached_permissions().await?;

        tracing::info!(
            subject_type = subject.subject_type(),
            subject_id = subject.subject_id(),
            roles = ?roles.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            "Synced roles"
        );
        Ok(self)
    }

    // Subject direct permissions

    pub async fn give_permission_to<S, I, P>(
        &self,
        subject: &S,
        permissions: I,
    ) -> Result<&Self, RolegateError>
    where
        S: Subject + ?Sized,
        I: IntoIterator<Item = P>,
        P: Into<PermissionArg>,
    {
        let permissions = permissions.into_iter().map(Into::into).collect();
        let permissions = self
            .stored_permissions(&self.db, subject, permissions)
            .await?;
        let ids: Vec<i32> = permissions.iter().map(|p| p.id).collect();

        storage::attach_permissions(&self.db, subject.subject_type(), subject.subject_id(), &ids)
            .await?;
        self.forget_cached_permissions().await?;

        tracing::info!(
            subject_type = subject.subject_type(),
            subject_id = subject.subject_id(),
            permissions = ?permissions.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            "Granted permissions"
        );
        Ok(self)
    }

    pub async fn sync_permissions<S, I, P>(
        &self,
        subject: &S,
        permissions: I,
    ) -> Result<&Self, RolegateError>
    where
        S: Subject + ?Sized,
        I: IntoIterator<Item = P>,
        P: Into<PermissionArg>,
    {
        let permissions = permissions.into_iter().map(Into::into).collect();

        let txn = self.db.begin().await?;
        let permissions = self.stored_permissions(&txn, subject, permissions).await?;
        let ids: Vec<i32> = permissions.iter().map(|p| p.id).collect();
        storage::detach_permissions(&txn, subject.subject_type(), subject.subject_id(), None)
            .await?;
        storage::attach_permissions(&txn, subject.subject_type(), subject.subject_id(), &ids)
            .await?;
        txn.commit().await?;

        self.forget_cached_permissions().await?;

        tracing::info!(
            subject_type = subject.subject_type(),
            subject_id = subject.subject_id(),
            permissions = ?permissions.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            "Synced permissions"
        );
        Ok(self)
    }

    /// Unknown names raise [`RolegateError::PermissionDoesNotExist`].
    pub async fn revoke_permission_to<S: Subject + ?Sized>(
        &self,
        subject: &S,
        permission: impl Into<PermissionArg>,
    ) -> Result<&Self, RolegateError> {
        let permission = self
            .stored_permission(subject, permission.into(), None)
            .await?;

        storage::detach_permissions(
            &self.db,
            subject.subject_type(),
            subject.subject_id(),
            Some(&[permission.id]),
        )
        .await?;
        self.forget_cached_permissions().await?;

        tracing::info!(
            subject_type = subject.subject_type(),
            subject_id = subject.subject_id(),
            permission = %permission.name,
            "Revoked permission"
        );
        Ok(self)
    }

    /// Bulk revoke by name across every guard of the subject. Names that
    /// match nothing are skipped.
    pub async fn revoke_permissions_named<S: Subject + ?Sized>(
        &self,
        subject: &S,
        names: &[String],
    ) -> Result<&Self, RolegateError> {
        let guards = self.guards.guard_names_for(subject);
        let permissions = storage::find_permissions_by_names(&self.db, names, &guards).await?;
        let ids: Vec<i32> = permissions.iter().map(|p| p.id).collect();

        let removed = storage::detach_permissions(
            &self.db,
            subject.subject_type(),
            subject.subject_id(),
            Some(&ids),
        )
        .await?;
        self.forget_cached_permissions().await?;

        tracing::info!(
            subject_type = subject.subject_type(),
            subject_id = subject.subject_id(),
            removed,
            "Revoked permissions by name"
        );
        Ok(self)
    }

    // Role permissions

    pub async fn give_permission_to_role<I, P>(
        &self,
        role: &Role,
        permissions: I,
    ) -> Result<&Self, RolegateError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PermissionArg>,
    {
        let permissions = permissions.into_iter().map(Into::into).collect();
        let permissions = self
            .stored_role_permissions(&self.db, role, permissions)
            .await?;
        let ids: Vec<i32> = permissions.iter().map(|p| p.id).collect();

        storage::attach_role_permissions(&self.db, role.id, &ids).await?;
        self.forget_cached_permissions().await?;

        tracing::info!(
            role = %role.name,
            permissions = ?permissions.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            "Granted permissions to role"
        );
        Ok(self)
    }

    pub async fn revoke_permission_from_role(
        &self,
        role: &Role,
        permission: impl Into<PermissionArg>,
    ) -> Result<&Self, RolegateError> {
        let mut permissions = self
            .stored_role_permissions(&self.db, role, vec![permission.into()])
            .await?;
        let Some(permission) = permissions.pop() else {
            return Ok(self);
        };

        storage::detach_role_permissions(&self.db, role.id, Some(&[permission.id])).await?;
        self.forget_cached_permissions().await?;

        tracing::info!(
            role = %role.name,
            permission = %permission.name,
            "Revoked permission from role"
        );
        Ok(self)
    }

    pub async fn sync_role_permissions<I, P>(
        &self,
        role: &Role,
        permissions: I,
    ) -> Result<&Self, RolegateError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PermissionArg>,
    {
        let permissions = permissions.into_iter().map(Into::into).collect();

        let txn = self.db.begin().await?;
        let permissions = self.stored_role_permissions(&txn, role, permissions).await?;
        let ids: Vec<i32> = permissions.iter().map(|p| p.id).collect();
        storage::detach_role_permissions(&txn, role.id, None).await?;
        storage::attach_role_permissions(&txn, role.id, &ids).await?;
        txn.commit().await?;

        self.forget_cached_permissions().await?;

        tracing::info!(
            role = %role.name,
            permissions = ?permissions.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            "Synced role permissions"
        );
        Ok(self)
    }

    // Identities

    /// `guard` defaults to the configured default guard.
    pub async fn create_role(&self, name: &str, guard: Option<&str>) -> Result<Role, RolegateError> {
        let guard = guard.unwrap_or_else(|| self.guards.default_guard());
        let role = storage::create_role(&self.db, name, guard).await?;
        self.forget_cached_permissions().await?;

        tracing::info!(role = %role.name, guard = %role.guard_name, "Created role");
        Ok(role)
    }

    /// `guard` defaults to the configured default guard.
    pub async fn create_permission(
        &self,
        name: &str,
        guard: Option<&str>,
    ) -> Result<Permission, RolegateError> {
        let guard = guard.unwrap_or_else(|| self.guards.default_guard());
        let permission = storage::create_permission(&self.db, name, guard).await?;
        self.forget_cached_permissions().await?;

        tracing::info!(
            permission = %permission.name,
            guard = %permission.guard_name,
            "Created permission"
        );
        Ok(permission)
    }

    pub async fn delete_role(&self, role: &Role) -> Result<(), RolegateError> {
        storage::delete_role(&self.db, role.id).await?;
        self.forget_cached_permissions().await?;

        tracing::info!(role = %role.name, guard = %role.guard_name, "Deleted role");
        Ok(())
    }

    pub async fn delete_permission(&self, permission: &Permission) -> Result<(), RolegateError> {
        storage::delete_permission(&self.db, permission).await?;
        self.forget_cached_permissions().await?;

        tracing::info!(
            permission = %permission.name,
            guard = %permission.guard_name,
            "Deleted permission"
        );
        Ok(())
    }

    // Host lifecycle callbacks

    /// Must be called by the host before deleting a subject. A hard delete
    /// drops every role and permission link of the subject.
    pub async fn on_before_delete<S: Subject + ?Sized>(
        &self,
        subject: &S,
        mode: DeleteMode,
    ) -> Result<(), RolegateError> {
        if mode == DeleteMode::Soft {
            return Ok(());
        }

        let txn = self.db.begin().await?;
        storage::detach_roles(&txn, subject.subject_type(), subject.subject_id(), None).await?;
        storage::detach_permissions(&txn, subject.subject_type(), subject.subject_id(), None)
            .await?;
        txn.commit().await?;

        self.forget_cached_permissions().await?;

        tracing::info!(
            subject_type = subject.subject_type(),
            subject_id = subject.subject_id(),
            "Detached all roles and permissions"
        );
        Ok(())
    }

    /// For writes the host made to roles or permissions outside this type.
    pub async fn on_after_mutate(&self) -> Result<(), RolegateError> {
        self.forget_cached_permissions().await
    }
}
