use rolegate::storage::{self, Permission, Role};
use sea_orm::DatabaseConnection;

/// Builder for creating test roles
pub struct RoleBuilder {
    name: String,
    guard_name: String,
    permissions: Vec<String>,
}

impl RoleBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            guard_name: "web".to_string(),
            permissions: Vec::new(),
        }
    }

    pub fn with_guard(mut self, guard_name: &str) -> Self {
        self.guard_name = guard_name.to_string();
        self
    }

    /// Permission is created in the role's guard if missing.
    pub fn with_permission(mut self, name: &str) -> Self {
        self.permissions.push(name.to_string());
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> Role {
        let role = storage::create_role(db, &self.name, &self.guard_name)
            .await
            .expect("Failed to create test role");

        let mut ids = Vec::new();
        for name in &self.permissions {
            let permission = match storage::find_permission_by_name(db, name, &self.guard_name).await
            {
                Ok(p) => p,
                Err(_) => storage::create_permission(db, name, &self.guard_name)
                    .await
                    .expect("Failed to create test permission"),
            };
            ids.push(permission.id);
        }
        storage::attach_role_permissions(db, role.id, &ids)
            .await
            .expect("Failed to attach role permissions");

        role
    }
}

/// Builder for creating test permissions
pub struct PermissionBuilder {
    name: String,
    guard_name: String,
}

impl PermissionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            guard_name: "web".to_string(),
        }
    }

    pub fn with_guard(mut self, guard_name: &str) -> Self {
        self.guard_name = guard_name.to_string();
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> Permission {
        storage::create_permission(db, &self.name, &self.guard_name)
            .await
            .expect("Failed to create test permission")
    }
}
