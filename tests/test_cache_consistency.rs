// Integration tests for permission cache invalidation
//
// Every write through the authorizer must forget the tenant's cached
// snapshot before returning. Each test populates the cache, mutates, and
// reads the snapshot again.

mod helpers;

use helpers::{test_authorizer, RoleBuilder, TestDb};
use rolegate::authz::types::DeleteMode;
use rolegate::cache::TenantKey;
use rolegate::SubjectRef;

fn role_names(snapshot: &rolegate::cache::PermissionSnapshot, permission: &str) -> Vec<String> {
    snapshot
        .find(permission, "web")
        .map(|p| p.roles.iter().map(|r| r.name.clone()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_create_and_delete_permission() {
    let test_db = TestDb::new().await;
    let authz = test_authorizer(&test_db);

    assert!(authz.permissions().await.unwrap().is_empty());

    let publish = authz.create_permission("publish", None).await.unwrap();
    let snapshot = authz.permissions().await.unwrap();
    assert!(snapshot.find("publish", "web").is_some());

    authz.delete_permission(&publish).await.unwrap();
    assert!(authz.permissions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_role_permission_changes() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();
    let authz = test_authorizer(&test_db);

    let editor = RoleBuilder::new("editor")
        .with_permission("publish")
        .create(db)
        .await;
    // Written behind the authorizer's back, so tell it
    authz.on_after_mutate().await.unwrap();
    assert_eq!(role_names(&authz.permissions().await.unwrap(), "publish"), vec!["editor"]);

    let writer = authz.create_role("writer", None).await.unwrap();
    authz.give_permission_to_role(&writer, ["publish"]).await.unwrap();
    assert_eq!(
        role_names(&authz.permissions().await.unwrap(), "publish"),
        vec!["editor", "writer"]
    );

    authz.revoke_permission_from_role(&editor, "publish").await.unwrap();
    assert_eq!(role_names(&authz.permissions().await.unwrap(), "publish"), vec!["writer"]);

    authz.sync_role_permissions(&writer, Vec::<&str>::new()).await.unwrap();
    assert!(role_names(&authz.permissions().await.unwrap(), "publish").is_empty());

    authz.give_permission_to_role(&editor, ["publish"]).await.unwrap();
    authz.delete_role(&editor).await.unwrap();
    assert!(role_names(&authz.permissions().await.unwrap(), "publish").is_empty());
}

#[tokio::test]
async fn test_gate_sees_assign_and_revoke_immediately() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();
    let authz = test_authorizer(&test_db);
    let u = SubjectRef::new("User", "1");

    RoleBuilder::new("editor")
        .with_permission("publish")
        .create(db)
        .await;
    authz.create_permission("archive", None).await.unwrap();

    assert!(!authz.can(&u, "publish").await.unwrap());

    authz.assign_role(&u, ["editor"]).await.unwrap();
    assert!(authz.can(&u, "publish").await.unwrap());

    authz.remove_role(&u, "editor").await.unwrap();
    assert!(!authz.can(&u, "publish").await.unwrap());

    authz.give_permission_to(&u, ["archive"]).await.unwrap();
    assert!(authz.can(&u, "archive").await.unwrap());

    authz.revoke_permission_to(&u, "archive").await.unwrap();
    assert!(!authz.can(&u, "archive").await.unwrap());
}

#[tokio::test]
async fn test_new_permission_visible_to_gate() {
    let test_db = TestDb::new().await;
    let authz = test_authorizer(&test_db);
    let u = SubjectRef::new("User", "1");

    // Populates the snapshot without `publish`
    assert_eq!(authz.before(&u, "publish").await.unwrap(), None);

    authz.create_permission("publish", None).await.unwrap();
    authz.give_permission_to(&u, ["publish"]).await.unwrap();
    assert_eq!(authz.before(&u, "publish").await.unwrap(), Some(true));
}

#[tokio::test]
async fn test_other_tenant_grant_visible_to_gate() {
    let test_db = TestDb::new().await;
    let acme = test_authorizer(&test_db).with_tenant(TenantKey::new("acme"));
    let globex = acme.with_tenant(TenantKey::new("globex"));
    let u = SubjectRef::new("User", "1");

    // globex loads its snapshot before `publish` exists
    assert_eq!(globex.before(&u, "publish").await.unwrap(), None);

    // Writes through acme only forget acme's snapshot
    acme.create_permission("publish", None).await.unwrap();
    acme.give_permission_to(&u, ["publish"]).await.unwrap();
    assert!(globex.permissions().await.unwrap().find("publish", "web").is_none());

    assert_eq!(globex.before(&u, "publish").await.unwrap(), Some(true));
    assert!(globex.can(&u, "publish").await.unwrap());
    assert!(!globex.can(&SubjectRef::new("User", "2"), "publish").await.unwrap());
}

#[tokio::test]
async fn test_sync_roles_leaves_no_stale_snapshot() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();
    let authz = test_authorizer(&test_db);
    let u = SubjectRef::new("User", "1");

    RoleBuilder::new("admin").with_permission("manage").create(db).await;
    RoleBuilder::new("editor").with_permission("publish").create(db).await;
    authz.create_role("viewer", None).await.unwrap();
    authz.assign_role(&u, ["editor", "viewer"]).await.unwrap();

    let before = authz.permissions().await.unwrap();
    authz.sync_roles(&u, ["admin"]).await.unwrap();
    let after = authz.permissions().await.unwrap();

    assert!(!std::sync::Arc::ptr_eq(&before, &after));
    assert_eq!(authz.get_role_names(&u).await.unwrap(), vec!["admin"]);
    assert!(authz.can(&u, "manage").await.unwrap());
    assert!(!authz.can(&u, "publish").await.unwrap());
}

#[tokio::test]
async fn test_subject_delete_invalidates() {
    let test_db = TestDb::new().await;
    let authz = test_authorizer(&test_db);
    let u = SubjectRef::new("User", "1");

    authz.create_permission("publish", None).await.unwrap();
    authz.give_permission_to(&u, ["publish"]).await.unwrap();

    let before = authz.permissions().await.unwrap();
    authz.on_before_delete(&u, DeleteMode::Hard).await.unwrap();
    let after = authz.permissions().await.unwrap();

    assert!(!std::sync::Arc::ptr_eq(&before, &after));
    assert!(!authz.can(&u, "publish").await.unwrap());
}
