use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "permissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub guard_name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::subject_has_permission::Entity")]
    SubjectHasPermission,
    #[sea_orm(has_many = "super::role_has_permission::Entity")]
    RoleHasPermission,
}

impl Related<super::subject_has_permission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubjectHasPermission.def()
    }
}

impl Related<super::role_has_permission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RoleHasPermission.def()
    }
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        super::role_has_permission::Relation::Role.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::role_has_permission::Relation::Permission.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
