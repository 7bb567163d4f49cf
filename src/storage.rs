use crate::entities::{permission, role, role_has_permission, subject_has_permission, subject_has_role};
use crate::errors::RolegateError;
use crate::settings::Database as DbCfg;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub guard_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub id: i32,
    pub name: String,
    pub guard_name: String,
}

impl From<role::Model> for Role {
    fn from(model: role::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            guard_name: model.guard_name,
        }
    }
}

impl From<permission::Model> for Permission {
    fn from(model: permission::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            guard_name: model.guard_name,
        }
    }
}

pub async fn init(cfg: &DbCfg) -> Result<DatabaseConnection, RolegateError> {
    let db = Database::connect(&cfg.url).await?;
    Ok(db)
}

// Role and permission identities

pub async fn create_role<C: ConnectionTrait>(
    db: &C,
    name: &str,
    guard_name: &str,
) -> Result<Role, RolegateError> {
    use role::{Column, Entity};

    let existing = Entity::find()
        .filter(Column::Name.eq(name))
        .filter(Column::GuardName.eq(guard_name))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(RolegateError::RoleAlreadyExists {
            name: name.to_string(),
            guard: guard_name.to_string(),
        });
    }

    let now = Utc::now().timestamp();
    // A concurrent create can pass the check above; the unique index decides
    let model = role::ActiveModel {
        name: Set(name.to_string()),
        guard_name: Set(guard_name.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => RolegateError::RoleAlreadyExists {
            name: name.to_string(),
            guard: guard_name.to_string(),
        },
        _ => RolegateError::Db(e),
    })?;

    Ok(model.into())
}

pub async fn create_permission<C: ConnectionTrait>(
    db: &C,
    name: &str,
    guard_name: &str,
) -> Result<Permission, RolegateError> {
    use permission::{Column, Entity};

    let existing = Entity::find()
        .filter(Column::Name.eq(name))
        .filter(Column::GuardName.eq(guard_name))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(RolegateError::PermissionAlreadyExists {
            name: name.to_string(),
            guard: guard_name.to_string(),
        });
    }

    let now = Utc::now().timestamp();
    // A concurrent create can pass the check above; the unique index decides
    let model = permission::ActiveModel {
        name: Set(name.to_string()),
        guard_name: Set(guard_name.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => RolegateError::PermissionAlreadyExists {
            name: name.to_string(),
            guard: guard_name.to_string(),
        },
        _ => RolegateError::Db(e),
    })?;

    Ok(model.into())
}

pub async fn find_role_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
    guard_name: &str,
) -> Result<Role, RolegateError> {
    use role::{Column, Entity};

    Entity::find()
        .filter(Column::Name.eq(name))
        .filter(Column::GuardName.eq(guard_name))
        .one(db)
        .await?
        .map(Role::from)
        .ok_or_else(|| RolegateError::RoleDoesNotExist(name.to_string()))
}

/// Id lookup that also rejects a role living under another guard.
pub async fn find_role_by_id<C: ConnectionTrait>(
    db: &C,
    id: i32,
    guard_name: &str,
) -> Result<Role, RolegateError> {
    use role::{Column, Entity};

    Entity::find_by_id(id)
        .filter(Column::GuardName.eq(guard_name))
        .one(db)
        .await?
        .map(Role::from)
        .ok_or(RolegateError::RoleIdDoesNotExist(id))
}

pub async fn find_permission_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
    guard_name: &str,
) -> Result<Permission, RolegateError> {
    use permission::{Column, Entity};

    Entity::find()
        .filter(Column::Name.eq(name))
        .filter(Column::GuardName.eq(guard_name))
        .one(db)
        .await?
        .map(Permission::from)
        .ok_or_else(|| RolegateError::PermissionDoesNotExist {
            name: name.to_string(),
            guard: guard_name.to_string(),
        })
}

/// Bulk lookup across several guards. Unknown names are skipped, not raised.
pub async fn find_permissions_by_names<C: ConnectionTrait>(
    db: &C,
    names: &[String],
    guard_names: &[String],
) -> Result<Vec<Permission>, RolegateError> {
    use permission::{Column, Entity};

    if names.is_empty() || guard_names.is_empty() {
        return Ok(Vec::new());
    }

    let models = Entity::find()
        .filter(Column::Name.is_in(names.iter().cloned()))
        .filter(Column::GuardName.is_in(guard_names.iter().cloned()))
        .order_by_asc(Column::Id)
        .all(db)
        .await?;

    Ok(models.into_iter().map(Permission::from).collect())
}

/// Delete a role together with every subject and permission link to it.
pub async fn delete_role(db: &DatabaseConnection, role_id: i32) -> Result<(), RolegateError> {
    let txn = db.begin().await?;

    subject_has_role::Entity::delete_many()
        .filter(subject_has_role::Column::RoleId.eq(role_id))
        .exec(&txn)
        .await?;
    role_has_permission::Entity::delete_many()
        .filter(role_has_permission::Column::RoleId.eq(role_id))
        .exec(&txn)
        .await?;
    let res = role::Entity::delete_by_id(role_id).exec(&txn).await?;
    if res.rows_affected == 0 {
        return Err(RolegateError::RoleIdDoesNotExist(role_id));
    }

    txn.commit().await?;
    Ok(())
}

/// Delete a permission together with every subject and role link to it.
pub async fn delete_permission(
    db: &DatabaseConnection,
    permission: &Permission,
) -> Result<(), RolegateError> {
    let txn = db.begin().await?;

    subject_has_permission::Entity::delete_many()
        .filter(subject_has_permission::Column::PermissionId.eq(permission.id))
        .exec(&txn)
        .await?;
    role_has_permission::Entity::delete_many()
        .filter(role_has_permission::Column::PermissionId.eq(permission.id))
        .exec(&txn)
        .await?;
    let res = permission::Entity::delete_by_id(permission.id)
        .exec(&txn)
        .await?;
    if res.rows_affected == 0 {
        return Err(RolegateError::PermissionDoesNotExist {
            name: permission.name.clone(),
            guard: permission.guard_name.clone(),
        });
    }

    txn.commit().await?;
    Ok(())
}

/// Every permission with its roles, ordered by permission id then role id.
pub async fn load_permissions_with_roles<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<(Permission, Vec<Role>)>, RolegateError> {
    let rows = permission::Entity::find()
        .order_by_asc(permission::Column::Id)
        .find_with_related(role::Entity)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(perm, roles)| {
            let mut roles: Vec<Role> = roles.into_iter().map(Role::from).collect();
            roles.sort_by_key(|r| r.id);
            (Permission::from(perm), roles)
        })
        .collect())
}

// Subject <-> role links

fn unique_ids(ids: &[i32]) -> BTreeSet<i32> {
    ids.iter().copied().collect()
}

/// Idempotent: links that already exist are left alone.
pub async fn attach_roles<C: ConnectionTrait>(
    db: &C,
    subject_type: &str,
    subject_id: &str,
    role_ids: &[i32],
) -> Result<(), RolegateError> {
    use subject_has_role::{ActiveModel, Column, Entity};

    if role_ids.is_empty() {
        return Ok(());
    }

    let rows = unique_ids(role_ids).into_iter().map(|role_id| ActiveModel {
        subject_type: Set(subject_type.to_string()),
        subject_id: Set(subject_id.to_string()),
        role_id: Set(role_id),
    });

    Entity::insert_many(rows)
        .on_conflict(
            OnConflict::columns([Column::SubjectType, Column::SubjectId, Column::RoleId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

/// `None` detaches every role of the subject.
pub async fn detach_roles<C: ConnectionTrait>(
    db: &C,
    subject_type: &str,
    subject_id: &str,
    role_ids: Option<&[i32]>,
) -> Result<u64, RolegateError> {
    use subject_has_role::{Column, Entity};

    let mut query = Entity::delete_many()
        .filter(Column::SubjectType.eq(subject_type))
        .filter(Column::SubjectId.eq(subject_id));
    if let Some(ids) = role_ids {
        if ids.is_empty() {
            return Ok(0);
        }
        query = query.filter(Column::RoleId.is_in(ids.iter().copied()));
    }

    let res = query.exec(db).await?;
    Ok(res.rows_affected)
}

pub async fn roles_for<C: ConnectionTrait>(
    db: &C,
    subject_type: &str,
    subject_id: &str,
) -> Result<Vec<Role>, RolegateError> {
    let models = role::Entity::find()
        .inner_join(subject_has_role::Entity)
        .filter(subject_has_role::Column::SubjectType.eq(subject_type))
        .filter(subject_has_role::Column::SubjectId.eq(subject_id))
        .order_by_asc(role::Column::Id)
        .all(db)
        .await?;

    Ok(models.into_iter().map(Role::from).collect())
}

/// Ids of subjects of `subject_type` holding any of `role_ids`.
pub async fn subjects_with_roles<C: ConnectionTrait>(
    db: &C,
    subject_type: &str,
    role_ids: &[i32],
) -> Result<Vec<String>, RolegateError> {
    use subject_has_role::{Column, Entity};

    if role_ids.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<String> = Entity::find()
        .select_only()
        .column(Column::SubjectId)
        .filter(Column::SubjectType.eq(subject_type))
        .filter(Column::RoleId.is_in(role_ids.iter().copied()))
        .distinct()
        .into_tuple()
        .all(db)
        .await?;

    let unique: BTreeSet<String> = ids.into_iter().collect();
    Ok(unique.into_iter().collect())
}

// Subject <-> permission links

/// Idempotent: links that already exist are left alone.
pub async fn attach_permissions<C: ConnectionTrait>(
    db: &C,
    subject_type: &str,
    subject_id: &str,
    permission_ids: &[i32],
) -> Result<(), RolegateError> {
    use subject_has_permission::{ActiveModel, Column, Entity};

    if permission_ids.is_empty() {
        return Ok(());
    }

    let rows = unique_ids(permission_ids)
        .into_iter()
        .map(|permission_id| ActiveModel {
            subject_type: Set(subject_type.to_string()),
            subject_id: Set(subject_id.to_string()),
            permission_id: Set(permission_id),
        });

    Entity::insert_many(rows)
        .on_conflict(
            OnConflict::columns([Column::SubjectType, Column::SubjectId, Column::PermissionId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

/// `None` detaches every direct permission of the subject.
pub async fn detach_permissions<C: ConnectionTrait>(
    db: &C,
    subject_type: &str,
    subject_id: &str,
    permission_ids: Option<&[i32]>,
) -> Result<u64, RolegateError> {
    use subject_has_permission::{Column, Entity};

    let mut query = Entity::delete_many()
        .filter(Column::SubjectType.eq(subject_type))
        .filter(Column::SubjectId.eq(subject_id));
    if let Some(ids) = permission_ids {
        if ids.is_empty() {
            return Ok(0);
        }
        query = query.filter(Column::PermissionId.is_in(ids.iter().copied()));
    }

    let res = query.exec(db).await?;
    Ok(res.rows_affected)
}

pub async fn permissions_for<C: ConnectionTrait>(
    db: &C,
    subject_type: &str,
    subject_id: &str,
) -> Result<Vec<Permission>, RolegateError> {
    let models = permission::Entity::find()
        .inner_join(subject_has_permission::Entity)
        .filter(subject_has_permission::Column::SubjectType.eq(subject_type))
        .filter(subject_has_permission::Column::SubjectId.eq(subject_id))
        .order_by_asc(permission::Column::Id)
        .all(db)
        .await?;

    Ok(models.into_iter().map(Permission::from).collect())
}

/// Ids of subjects of `subject_type` holding any of `permission_ids`
/// directly, or any of `role_ids`.
pub async fn subjects_with_permissions<C: ConnectionTrait>(
    db: &C,
    subject_type: &str,
    permission_ids: &[i32],
    role_ids: &[i32],
) -> Result<Vec<String>, RolegateError> {
    use subject_has_permission::{Column, Entity};

    let mut unique: BTreeSet<String> = BTreeSet::new();

    if !permission_ids.is_empty() {
        let direct: Vec<String> = Entity::find()
            .select_only()
            .column(Column::SubjectId)
            .filter(Column::SubjectType.eq(subject_type))
            .filter(Column::PermissionId.is_in(permission_ids.iter().copied()))
            .distinct()
            .into_tuple()
            .all(db)
            .await?;
        unique.extend(direct);
    }

    unique.extend(subjects_with_roles(db, subject_type, role_ids).await?);

    Ok(unique.into_iter().collect())
}

// Role <-> permission links

/// Idempotent: links that already exist are left alone.
pub async fn attach_role_permissions<C: ConnectionTrait>(
    db: &C,
    role_id: i32,
    permission_ids: &[i32],
) -> Result<(), RolegateError> {
    use role_has_permission::{ActiveModel, Column, Entity};

    if permission_ids.is_empty() {
        return Ok(());
    }

    let rows = unique_ids(permission_ids)
        .into_iter()
        .map(|permission_id| ActiveModel {
            role_id: Set(role_id),
            permission_id: Set(permission_id),
        });

    Entity::insert_many(rows)
        .on_conflict(
            OnConflict::columns([Column::RoleId, Column::PermissionId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

/// `None` detaches every permission of the role.
pub async fn detach_role_permissions<C: ConnectionTrait>(
    db: &C,
    role_id: i32,
    permission_ids: Option<&[i32]>,
) -> Result<u64, RolegateError> {
    use role_has_permission::{Column, Entity};

    let mut query = Entity::delete_many().filter(Column::RoleId.eq(role_id));
    if let Some(ids) = permission_ids {
        if ids.is_empty() {
            return Ok(0);
        }
        query = query.filter(Column::PermissionId.is_in(ids.iter().copied()));
    }

    let res = query.exec(db).await?;
    Ok(res.rows_affected)
}

/// Distinct permissions held by any of `role_ids`, ordered by id.
pub async fn permissions_for_roles<C: ConnectionTrait>(
    db: &C,
    role_ids: &[i32],
) -> Result<Vec<Permission>, RolegateError> {
    if role_ids.is_empty() {
        return Ok(Vec::new());
    }

    let models = permission::Entity::find()
        .inner_join(role_has_permission::Entity)
        .filter(role_has_permission::Column::RoleId.is_in(role_ids.iter().copied()))
        .distinct()
        .order_by_asc(permission::Column::Id)
        .all(db)
        .await?;

    Ok(models.into_iter().map(Permission::from).collect())
}

pub async fn roles_for_permission<C: ConnectionTrait>(
    db: &C,
    permission_id: i32,
) -> Result<Vec<Role>, RolegateError> {
    let models = role::Entity::find()
        .inner_join(role_has_permission::Entity)
        .filter(role_has_permission::Column::PermissionId.eq(permission_id))
        .order_by_asc(role::Column::Id)
        .all(db)
        .await?;

    Ok(models.into_iter().map(Role::from).collect())
}
