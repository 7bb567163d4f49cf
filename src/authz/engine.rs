use std::collections::BTreeMap;

use crate::authz::types::{PermissionArg, RoleSpec};
use crate::authz::Authorizer;
use crate::errors::RolegateError;
use crate::storage::{self, Permission, Role};
use crate::subject::{Subject, SubjectRef};

impl Authorizer {
    async fn held_roles<S: Subject + ?Sized>(&self, subject: &S) -> Result<Vec<Role>, RolegateError> {
        storage::roles_for(&self.db, subject.subject_type(), subject.subject_id()).await
    }

    /// Resolves a permission name in `guard`, or the subject's default guard.
    pub(crate) async fn stored_permission<S: Subject + ?Sized>(
        &self,
        subject: &S,
        permission: PermissionArg,
        guard: Option<&str>,
    ) -> Result<Permission, RolegateError> {
        match permission {
            PermissionArg::Permission(p) => Ok(p),
            PermissionArg::Name(name) => {
                let guard = match guard {
                    Some(g) => g.to_string(),
                    None => self.guards.default_guard_for(subject),
                };
                storage::find_permission_by_name(&self.db, &name, &guard).await
            }
        }
    }

    pub async fn has_role<S: Subject + ?Sized>(
        &self,
        subject: &S,
        roles: impl Into<RoleSpec>,
    ) -> Result<bool, RolegateError> {
        let held = self.held_roles(subject).await?;
        Ok(roles.into().is_satisfied_by(&held))
    }

    pub async fn has_any_role<S: Subject + ?Sized>(
        &self,
        subject: &S,
        roles: impl Into<RoleSpec>,
    ) -> Result<bool, RolegateError> {
        self.has_role(subject, roles).await
    }

    /// An empty list is trivially held.
    pub async fn has_all_roles<S: Subject + ?Sized>(
        &self,
        subject: &S,
        roles: impl Into<RoleSpec>,
    ) -> Result<bool, RolegateError> {
        let held = self.held_roles(subject).await?;
        Ok(roles.into().is_fully_satisfied_by(&held))
    }

    /// Unknown permission names yield `false` instead of an error.
    pub async fn has_direct_permission<S: Subject + ?Sized>(
        &self,
        subject: &S,
        permission: impl Into<PermissionArg>,
    ) -> Result<bool, RolegateError> {
        let permission = match self.stored_permission(subject, permission.into(), None).await {
            Ok(p) => p,
            Err(e) if e.is_does_not_exist() => return Ok(false),
            Err(e) => return Err(e),
        };

        let direct =
            storage::permissions_for(&self.db, subject.subject_type(), subject.subject_id())
                .await?;
        Ok(direct.iter().any(|p| p.id == permission.id))
    }

    pub async fn has_permission_via_role<S: Subject + ?Sized>(
        &self,
        subject: &S,
        permission: &Permission,
    ) -> Result<bool, RolegateError> {
        let roles = storage::roles_for_permission(&self.db, permission.id).await?;
        if roles.is_empty() {
            return Ok(false);
        }
        self.has_role(subject, roles).await
    }

    /// Direct or via any held role. Unknown names raise
    /// [`RolegateError::PermissionDoesNotExist`].
    pub async fn has_permission_to<S: Subject + ?Sized>(
        &self,
        subject: &S,
        permission: impl Into<PermissionArg>,
        guard: Option<&str>,
    ) -> Result<bool, RolegateError> {
        let permission = self
            .stored_permission(subject, permission.into(), guard)
            .await?;

        if self
            .has_direct_permission(subject, permission.clone())
            .await?
        {
            return Ok(true);
        }
        self.has_permission_via_role(subject, &permission).await
    }

    pub async fn has_any_permission<S, I, P>(
        &self,
        subject: &S,
        permissions: I,
    ) -> Result<bool, RolegateError>
    where
        S: Subject + ?Sized,
        I: IntoIterator<Item = P>,
        P: Into<PermissionArg>,
    {
        for permission in permissions {
            if self.has_permission_to(subject, permission, None).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn get_direct_permissions<S: Subject + ?Sized>(
        &self,
        subject: &S,
    ) -> Result<Vec<Permission>, RolegateError> {
        storage::permissions_for(&self.db, subject.subject_type(), subject.subject_id()).await
    }

    pub async fn get_permissions_via_roles<S: Subject + ?Sized>(
        &self,
        subject: &S,
    ) -> Result<Vec<Permission>, RolegateError> {
        let role_ids: Vec<i32> = self.held_roles(subject).await?.iter().map(|r| r.id).collect();
        storage::permissions_for_roles(&self.db, &role_ids).await
    }

    /// Direct and via-role permissions, deduplicated and ordered by id.
    pub async fn get_all_permissions<S: Subject + ?Sized>(
        &self,
        subject: &S,
    ) -> Result<Vec<Permission>, RolegateError> {
        let mut all: BTreeMap<i32, Permission> = BTreeMap::new();
        for p in self.get_direct_permissions(subject).await? {
            all.insert(p.id, p);
        }
        for p in self.get_permissions_via_roles(subject).await? {
            all.entry(p.id).or_insert(p);
        }
        Ok(all.into_values().collect())
    }

    pub async fn get_role_names<S: Subject + ?Sized>(
        &self,
        subject: &S,
    ) -> Result<Vec<String>, RolegateError> {
        let roles = self.held_roles(subject).await?;
        Ok(roles.into_iter().map(|r| r.name).collect())
    }

    /// Names resolve in the role's guard; a permission from another guard
    /// is rejected.
    pub async fn role_has_permission_to(
        &self,
        role: &Role,
        permission: impl Into<PermissionArg>,
    ) -> Result<bool, RolegateError> {
        let permission = match permission.into() {
            PermissionArg::Permission(p) => p,
            PermissionArg::Name(name) => {
                storage::find_permission_by_name(&self.db, &name, &role.guard_name).await?
            }
        };
        if permission.guard_name != role.guard_name {
            return Err(RolegateError::guard_does_not_match(
                &permission.guard_name,
                std::slice::from_ref(&role.guard_name),
            ));
        }

        let held = storage::permissions_for_roles(&self.db, &[role.id]).await?;
        Ok(held.iter().any(|p| p.id == permission.id))
    }

    /// Ids of `subject_type` subjects holding any of the given roles.
    /// Names resolve in the type's default guard.
    pub async fn subjects_with_role(
        &self,
        subject_type: &str,
        roles: impl Into<RoleSpec>,
    ) -> Result<Vec<String>, RolegateError> {
        let guard = self.guards.default_guard_for(&SubjectRef::new(subject_type, ""));

        let mut role_ids = Vec::new();
        for leaf in roles.into().leaves() {
            match leaf {
                RoleSpec::Role(role) => role_ids.push(role.id),
                RoleSpec::Name(name) => {
                    role_ids.push(storage::find_role_by_name(&self.db, &name, &guard).await?.id)
                }
                RoleSpec::Any(_) => {}
            }
        }

        storage::subjects_with_roles(&self.db, subject_type, &role_ids).await
    }

    /// Ids of `subject_type` subjects holding any of the given permissions,
    /// directly or through a role.
    pub async fn subjects_with_permission<I, P>(
        &self,
        subject_type: &str,
        permissions: I,
    ) -> Result<Vec<String>, RolegateError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PermissionArg>,
    {
        let of_type = SubjectRef::new(subject_type, "");

        let mut permission_ids = Vec::new();
        let mut role_ids = Vec::new();
        for permission in permissions {
            let permission = self.stored_permission(&of_type, permission.into(), None).await?;
            for role in storage::roles_for_permission(&self.db, permission.id).await? {
                role_ids.push(role.id);
            }
            permission_ids.push(permission.id);
        }
        role_ids.sort_unstable();
        role_ids.dedup();

        storage::subjects_with_permissions(&self.db, subject_type, &permission_ids, &role_ids)
            .await
    }
}
