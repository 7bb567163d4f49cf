pub mod engine;
pub mod errors;
pub mod gate;
pub mod middleware;
pub mod mutations;
pub mod types;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::cache::{PermissionCache, PermissionSnapshot, TenantKey};
use crate::errors::RolegateError;
use crate::guard::GuardResolver;
use crate::settings::Settings;

/// Entry point for every role and permission query or mutation.
///
/// Per-subject links are always read fresh from the database. The shared
/// permission snapshot is only read by the gate hook and is forgotten for
/// this tenant after every write that goes through here.
#[derive(Clone)]
pub struct Authorizer {
    db: DatabaseConnection,
    guards: GuardResolver,
    cache: PermissionCache,
    tenant: TenantKey,
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("guards", &self.guards)
            .field("tenant", &self.tenant)
            .finish_non_exhaustive()
    }
}

impl Authorizer {
    pub fn new(
        db: DatabaseConnection,
        guards: GuardResolver,
        cache: PermissionCache,
        tenant: TenantKey,
    ) -> Self {
        Self {
            db,
            guards,
            cache,
            tenant,
        }
    }

    pub fn from_settings(db: DatabaseConnection, settings: &Settings, tenant: TenantKey) -> Self {
        Self::new(
            db,
            GuardResolver::from_settings(&settings.auth),
            PermissionCache::from_settings(&settings.cache),
            tenant,
        )
    }

    /// Same stores and cache, scoped to another tenant.
    pub fn with_tenant(&self, tenant: TenantKey) -> Self {
        Self {
            tenant,
            ..self.clone()
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn guards(&self) -> &GuardResolver {
        &self.guards
    }

    pub fn tenant(&self) -> &TenantKey {
        &self.tenant
    }

    /// Cached snapshot of every permission with its roles.
    pub async fn permissions(&self) -> Result<Arc<PermissionSnapshot>, RolegateError> {
        self.cache.get(&self.db, &self.tenant).await
    }

    pub async fn forget_cached_permissions(&self) -> Result<(), RolegateError> {
        self.cache.forget(&self.tenant).await
    }
}
