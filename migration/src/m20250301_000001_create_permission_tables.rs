use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Enable foreign keys for SQLite
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Sqlite {
            manager
                .get_connection()
                .execute_unprepared("PRAGMA foreign_keys = ON")
                .await?;
        }

        // Create roles table
        manager
            .create_table(
                Table::create()
                    .table(Roles::Table)
                    .if_not_exists()
                    .col(pk_auto(Roles::Id))
                    .col(string(Roles::Name))
                    .col(string(Roles::GuardName))
                    .col(big_integer(Roles::CreatedAt))
                    .col(big_integer(Roles::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_roles_name_guard")
                    .table(Roles::Table)
                    .col(Roles::Name)
                    .col(Roles::GuardName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create permissions table
        manager
            .create_table(
                Table::create()
                    .table(Permissions::Table)
                    .if_not_exists()
                    .col(pk_auto(Permissions::Id))
                    .col(string(Permissions::Name))
                    .col(string(Permissions::GuardName))
                    .col(big_integer(Permissions::CreatedAt))
                    .col(big_integer(Permissions::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_permissions_name_guard")
                    .table(Permissions::Table)
                    .col(Permissions::Name)
                    .col(Permissions::GuardName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create subject_has_roles link table
        manager
            .create_table(
                Table::create()
                    .table(SubjectHasRoles::Table)
                    .if_not_exists()
                    .col(string(SubjectHasRoles::SubjectType))
                    .col(string(SubjectHasRoles::SubjectId))
                    .col(integer(SubjectHasRoles::RoleId))
                    .primary_key(
                        Index::create()
                            .col(SubjectHasRoles::SubjectType)
                            .col(SubjectHasRoles::SubjectId)
                            .col(SubjectHasRoles::RoleId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subject_has_roles_role")
                            .from(SubjectHasRoles::Table, SubjectHasRoles::RoleId)
                            .to(Roles::Table, Roles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_subject_has_roles_subject")
                    .table(SubjectHasRoles::Table)
                    .col(SubjectHasRoles::SubjectId)
                    .col(SubjectHasRoles::SubjectType)
                    .to_owned(),
            )
            .await?;

        // Create subject_has_permissions link table
        manager
            .create_table(
                Table::create()
                    .table(SubjectHasPermissions::Table)
                    .if_not_exists()
                    .col(string(SubjectHasPermissions::SubjectType))
                    .col(string(SubjectHasPermissions::SubjectId))
                    .col(integer(SubjectHasPermissions::PermissionId))
                    .primary_key(
                        Index::create()
                            .col(SubjectHasPermissions::SubjectType)
                            .col(SubjectHasPermissions::SubjectId)
                            .col(SubjectHasPermissions::PermissionId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subject_has_permissions_permission")
                            .from(
                                SubjectHasPermissions::Table,
                                SubjectHasPermissions::PermissionId,
                            )
                            .to(Permissions::Table, Permissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_subject_has_permissions_subject")
                    .table(SubjectHasPermissions::Table)
                    .col(SubjectHasPermissions::SubjectId)
                    .col(SubjectHasPermissions::SubjectType)
                    .to_owned(),
            )
            .await?;

        // Create role_has_permissions link table
        manager
            .create_table(
                Table::create()
                    .table(RoleHasPermissions::Table)
                    .if_not_exists()
                    .col(integer(RoleHasPermissions::RoleId))
                    .col(integer(RoleHasPermissions::PermissionId))
                    .primary_key(
                        Index::create()
                            .col(RoleHasPermissions::RoleId)
                            .col(RoleHasPermissions::PermissionId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_has_permissions_role")
                            .from(RoleHasPermissions::Table, RoleHasPermissions::RoleId)
                            .to(Roles::Table, Roles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_has_permissions_permission")
                            .from(RoleHasPermissions::Table, RoleHasPermissions::PermissionId)
                            .to(Permissions::Table, Permissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RoleHasPermissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubjectHasPermissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubjectHasRoles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Permissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Roles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Roles {
    Table,
    Id,
    Name,
    GuardName,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Permissions {
    Table,
    Id,
    Name,
    GuardName,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SubjectHasRoles {
    Table,
    SubjectType,
    SubjectId,
    RoleId,
}

#[derive(DeriveIden)]
enum SubjectHasPermissions {
    Table,
    SubjectType,
    SubjectId,
    PermissionId,
}

#[derive(DeriveIden)]
enum RoleHasPermissions {
    Table,
    RoleId,
    PermissionId,
}
