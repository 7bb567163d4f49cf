pub mod builders;
pub mod db;

pub use builders::{PermissionBuilder, RoleBuilder};
pub use db::{test_authorizer, TestDb};
