use rolegate::cache::{PermissionCache, TenantKey};
use rolegate::guard::GuardResolver;
use rolegate::settings::{Cache, Guard};
use rolegate::Authorizer;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tempfile::NamedTempFile;

/// Test database with automatic cleanup
pub struct TestDb {
    connection: DatabaseConnection,
    _temp_file: NamedTempFile,
}

impl TestDb {
    /// Create a new test database with migrations applied
    pub async fn new() -> Self {
        // Create temporary SQLite database file
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let db_path = temp_file.path().to_str().expect("Invalid temp file path");
        let db_url = format!("sqlite://{}?mode=rwc", db_path);

        let connection = Database::connect(&db_url)
            .await
            .expect("Failed to connect to test database");

        migration::Migrator::up(&connection, None)
            .await
            .expect("Failed to run migrations");

        Self {
            connection,
            _temp_file: temp_file,
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }
}

/// Authorizer over the test database. `User` subjects use the `web`
/// guard, `ApiClient` subjects the `api` guard.
pub fn test_authorizer(test_db: &TestDb) -> Authorizer {
    let guards = GuardResolver::new(
        "web",
        vec![
            Guard {
                name: "web".to_string(),
                model: "User".to_string(),
            },
            Guard {
                name: "api".to_string(),
                model: "ApiClient".to_string(),
            },
        ],
    );

    Authorizer::new(
        test_db.connection().clone(),
        guards,
        PermissionCache::from_settings(&Cache::default()),
        TenantKey::new("test"),
    )
}
