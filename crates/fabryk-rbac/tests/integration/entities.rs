//! Rules and items: round trips, duplicates, renames and reclassification.

use fabryk_rbac::{EntityKind, Error, Item, ItemKind, Rule};
use serde::{Deserialize, Serialize};

use crate::common::{TestHarness, blog_fixture};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Ownership {
    field: String,
}

#[tokio::test]
async fn test_item_round_trip() {
    let harness = TestHarness::new();
    harness.store.add_rule(&Rule::new("isAuthor")).await.unwrap();
    let item = Item::permission("posts.update")
        .with_description("Edit any post")
        .with_rule("isAuthor")
        .with_data(vec![0u8, 159, 146, 150]);

    let stored = harness.store.add_item(&item).await.unwrap();
    let fetched = harness.store.get_item("posts.update").await.unwrap().unwrap();

    assert_eq!(fetched.name, item.name);
    assert_eq!(fetched.kind, ItemKind::Permission);
    assert_eq!(fetched.description, item.description);
    assert_eq!(fetched.rule_name.as_deref(), Some("isAuthor"));
    assert_eq!(fetched.data, item.data);
    assert_eq!(fetched, stored);
}

#[tokio::test]
async fn test_typed_payload_round_trip() {
    let harness = TestHarness::new();
    let payload = Ownership {
        field: "author_id".to_string(),
    };
    let rule = Rule::new("isAuthor").with_json_data(&payload).unwrap();
    harness.store.add_rule(&rule).await.unwrap();

    let fetched = harness.store.get_rule("isAuthor").await.unwrap().unwrap();
    assert_eq!(fetched.decode_data::<Ownership>(), Some(payload));
}

#[tokio::test]
async fn test_corrupt_payload_degrades_to_none() {
    let harness = TestHarness::new();
    harness
        .store
        .add_item(&Item::role("admin").with_data(b"not json".to_vec()))
        .await
        .unwrap();
    let item = harness.store.get_item("admin").await.unwrap().unwrap();
    assert_eq!(item.decode_data::<Ownership>(), None);
    assert_eq!(item.data.as_deref(), Some(&b"not json"[..]));
}

#[tokio::test]
async fn test_duplicate_item_leaves_indices_untouched() {
    let harness = blog_fixture().await;
    let before = harness.keys().await;
    let roles_before = harness.type_index(ItemKind::Role).await;
    let perms_before = harness.type_index(ItemKind::Permission).await;

    let err = harness
        .store
        .add_item(&Item::permission("admin"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateKey { kind: EntityKind::Item, .. }));

    assert_eq!(harness.keys().await, before);
    assert_eq!(harness.type_index(ItemKind::Role).await, roles_before);
    assert_eq!(harness.type_index(ItemKind::Permission).await, perms_before);
    let admin = harness.store.get_item("admin").await.unwrap().unwrap();
    assert_eq!(admin.kind, ItemKind::Role);
}

#[tokio::test]
async fn test_rename_preserves_identity() {
    let harness = blog_fixture().await;
    harness.link(&[("admin", "author"), ("author", "posts.create")]).await;
    harness.store.assign("author", "u1").await.unwrap();
    let id = harness.item_id("author").await;

    let renamed = Item::role("writer");
    harness.store.update_item("author", &renamed).await.unwrap();

    assert!(harness.store.get_item("author").await.unwrap().is_none());
    assert!(harness.store.get_item("writer").await.unwrap().is_some());
    assert_eq!(harness.item_id("writer").await, id);

    let parents = harness.store.get_parents("writer").await.unwrap();
    assert_eq!(parents[0].name, "admin");
    let children = harness.store.get_children("writer").await.unwrap();
    assert_eq!(children[0].name, "posts.create");
    let roles = harness.store.get_roles_by_user("u1").await.unwrap();
    assert_eq!(roles[0].name, "writer");
    assert_eq!(
        harness.store.get_user_ids_by_role("writer").await.unwrap(),
        vec!["u1"]
    );
}

#[tokio::test]
async fn test_rename_onto_taken_name_rejected() {
    let harness = blog_fixture().await;
    let err = harness
        .store
        .update_item("author", &Item::role("admin"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateKey { .. }));
    assert!(harness.store.get_item("author").await.unwrap().is_some());
}

#[tokio::test]
async fn test_update_missing_item_is_not_found() {
    let harness = TestHarness::new();
    let err = harness
        .store
        .update_item("ghost", &Item::role("ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: EntityKind::Item, .. }));
}

#[tokio::test]
async fn test_reclassification_moves_type_index() {
    let harness = blog_fixture().await;
    let id = harness.item_id("posts.create").await;

    harness
        .store
        .update_item("posts.create", &Item::role("posts.create"))
        .await
        .unwrap();

    let roles = harness.type_index(ItemKind::Role).await;
    let perms = harness.type_index(ItemKind::Permission).await;
    assert_eq!(roles.iter().filter(|m| **m == id).count(), 1);
    assert!(!perms.contains(&id));
    let item = harness.store.get_item("posts.create").await.unwrap().unwrap();
    assert!(item.is_role());
}

#[tokio::test]
async fn test_get_items_by_kind() {
    let harness = blog_fixture().await;
    let roles: Vec<String> = harness
        .store
        .get_items(ItemKind::Role)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(roles, vec!["admin", "author"]);
    let perms = harness.store.get_items(ItemKind::Permission).await.unwrap();
    assert_eq!(perms.len(), 2);
    assert!(perms.iter().all(Item::is_permission));
}

#[tokio::test]
async fn test_rule_rename_keeps_item_links() {
    let harness = blog_fixture().await;
    harness
        .store
        .update_rule("isAuthor", &Rule::new("ownsPost"))
        .await
        .unwrap();
    let item = harness
        .store
        .get_item("posts.update.own")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.rule_name.as_deref(), Some("ownsPost"));
}

#[tokio::test]
async fn test_rule_removal_detaches_items() {
    let harness = blog_fixture().await;
    harness.store.remove_rule("isAuthor").await.unwrap();

    assert!(harness.store.get_rule("isAuthor").await.unwrap().is_none());
    let item = harness
        .store
        .get_item("posts.update.own")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.rule_name, None);
    assert!(
        !harness
            .keys()
            .await
            .iter()
            .any(|k| k.starts_with("auth:rules:"))
    );
}
