use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};

use crate::errors::RolegateError;
use crate::settings;
use crate::storage::{self, Permission, Role};

/// Cache namespace isolating snapshots per deployment tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantKey(String);

impl TenantKey {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// First DNS label of a request host, port stripped:
    /// `acme.example.com:8443` -> `acme`.
    pub fn from_host(host: &str) -> Self {
        let host = host.split(':').next().unwrap_or_default();
        let label = host.split('.').next().unwrap_or_default();
        Self(label.to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPermission {
    pub permission: Permission,
    pub roles: Vec<Role>,
}

/// Every permission with its roles, ordered by permission id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSnapshot {
    pub permissions: Vec<CachedPermission>,
}

impl PermissionSnapshot {
    pub fn find(&self, name: &str, guard_name: &str) -> Option<&CachedPermission> {
        self.permissions
            .iter()
            .find(|p| p.permission.name == name && p.permission.guard_name == guard_name)
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    async fn load<C: ConnectionTrait>(db: &C) -> Result<Self, RolegateError> {
        let permissions = storage::load_permissions_with_roles(db)
            .await?
            .into_iter()
            .map(|(permission, roles)| CachedPermission { permission, roles })
            .collect();
        Ok(Self { permissions })
    }
}

/// Key-value cache capability the permission cache is built on.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Arc<PermissionSnapshot>>, RolegateError>;

    async fn insert(
        &self,
        key: String,
        value: Arc<PermissionSnapshot>,
        ttl: Duration,
    ) -> Result<(), RolegateError>;

    async fn forget(&self, key: &str) -> Result<(), RolegateError>;
}

#[derive(Clone)]
struct Entry {
    snapshot: Arc<PermissionSnapshot>,
    ttl: Duration,
}

struct EntryTtl;

impl Expiry<String, Entry> for EntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process [`CacheStore`] honouring the TTL given on each insert.
#[derive(Clone)]
pub struct MokaCacheStore {
    inner: moka::future::Cache<String, Entry>,
}

impl MokaCacheStore {
    pub fn new(max_capacity: u64) -> Self {
        let inner = moka::future::Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryTtl)
            .build();
        Self { inner }
    }
}

#[async_trait]
impl CacheStore for MokaCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Arc<PermissionSnapshot>>, RolegateError> {
        Ok(self.inner.get(key).await.map(|e| e.snapshot))
    }

    async fn insert(
        &self,
        key: String,
        value: Arc<PermissionSnapshot>,
        ttl: Duration,
    ) -> Result<(), RolegateError> {
        self.inner
            .insert(
                key,
                Entry {
                    snapshot: value,
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn forget(&self, key: &str) -> Result<(), RolegateError> {
        self.inner.invalidate(key).await;
        Ok(())
    }
}

/// Read-through cache of the global permission snapshot.
#[derive(Clone)]
pub struct PermissionCache {
    store: Arc<dyn CacheStore>,
    key: String,
    ttl: Duration,
}

impl PermissionCache {
    pub fn new(store: Arc<dyn CacheStore>, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            ttl,
        }
    }

    pub fn from_settings(cfg: &settings::Cache) -> Self {
        Self::new(
            Arc::new(MokaCacheStore::new(cfg.max_capacity)),
            cfg.key.clone(),
            cfg.ttl(),
        )
    }

    pub fn cache_key(&self, tenant: &TenantKey) -> String {
        format!("{}.{}", tenant, self.key)
    }

    pub async fn get<C: ConnectionTrait>(
        &self,
        db: &C,
        tenant: &TenantKey,
    ) -> Result<Arc<PermissionSnapshot>, RolegateError> {
        let key = self.cache_key(tenant);
        if let Some(snapshot) = self.store.get(&key).await? {
            tracing::debug!(%key, "Permission cache hit");
            return Ok(snapshot);
        }

        let snapshot = Arc::new(PermissionSnapshot::load(db).await?);
        tracing::debug!(%key, permissions = snapshot.len(), "Permission cache miss, loaded snapshot");
        self.store
            .insert(key, Arc::clone(&snapshot), self.ttl)
            .await?;
        Ok(snapshot)
    }

    pub async fn forget(&self, tenant: &TenantKey) -> Result<(), RolegateError> {
        let key = self.cache_key(tenant);
        self.store.forget(&key).await?;
        tracing::debug!(%key, "Permission cache forgotten");
        Ok(())
    }
}
