//! Bulk removal and namespace reset.

use fabryk_rbac::{Item, ItemKind, KeyTemplates, RbacConfig};

use crate::common::{TestHarness, blog_fixture};

#[tokio::test]
async fn test_remove_all_empties_namespace() {
    let harness = blog_fixture().await;
    harness.link(&[("admin", "author"), ("author", "posts.update.own")]).await;
    harness.store.assign("admin", "u1").await.unwrap();
    assert!(!harness.keys().await.is_empty());

    harness.store.remove_all().await.unwrap();

    assert!(harness.keys().await.is_empty());
    assert!(harness.engine.is_empty().await);
}

#[tokio::test]
async fn test_remove_all_leaves_other_namespaces() {
    let config = RbacConfig {
        namespace: "tenant-a:".to_string(),
        keys: KeyTemplates::with_namespace("tenant-a:"),
        ..RbacConfig::default()
    };
    let harness = TestHarness::with_config(&config);
    harness.store.add_item(&Item::role("admin")).await.unwrap();

    let other = fabryk_rbac::RbacStore::new(harness.engine.clone());
    other.add_item(&Item::role("admin")).await.unwrap();

    harness.store.remove_all().await.unwrap();
    assert!(harness.store.get_item("admin").await.unwrap().is_none());
    assert!(other.get_item("admin").await.unwrap().is_some());
}

#[tokio::test]
async fn test_remove_all_roles_cascades() {
    let harness = blog_fixture().await;
    harness.link(&[("admin", "author"), ("author", "posts.create")]).await;

    assert_eq!(harness.store.remove_all_roles().await.unwrap(), 2);
    assert!(harness.type_index(ItemKind::Role).await.is_empty());
    assert!(harness.store.get_parents("posts.create").await.unwrap().is_empty());
    assert_eq!(harness.type_index(ItemKind::Permission).await.len(), 2);
}

#[tokio::test]
async fn test_remove_all_assignments_keeps_items() {
    let harness = blog_fixture().await;
    harness.store.assign("admin", "u1").await.unwrap();
    harness.store.assign("author", "u2").await.unwrap();

    harness.store.remove_all_assignments().await.unwrap();

    assert!(harness.store.get_roles_by_user("u1").await.unwrap().is_empty());
    assert!(harness.store.get_roles_by_user("u2").await.unwrap().is_empty());
    assert_eq!(harness.store.get_items(ItemKind::Role).await.unwrap().len(), 2);
}
