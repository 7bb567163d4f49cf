pub mod permission;
pub mod role;
pub mod role_has_permission;
pub mod subject_has_permission;
pub mod subject_has_role;

pub use permission::Entity as Permission;
pub use role::Entity as Role;
pub use role_has_permission::Entity as RoleHasPermission;
pub use subject_has_permission::Entity as SubjectHasPermission;
pub use subject_has_role::Entity as SubjectHasRole;
