//! Hierarchy edges, cascades and cycle rejection.

use fabryk_rbac::{Error, Item};

use crate::common::{TestHarness, blog_fixture};

#[tokio::test]
async fn test_cascade_delete_keeps_grandchild() {
    let harness = TestHarness::new();
    harness
        .add_items(&[Item::role("p"), Item::role("c"), Item::permission("g")])
        .await;
    harness.link(&[("p", "c"), ("c", "g")]).await;
    let c_id = harness.item_id("c").await;

    harness.store.remove_item("c").await.unwrap();

    assert!(harness.store.get_children("p").await.unwrap().is_empty());
    assert!(harness.store.get_parents("g").await.unwrap().is_empty());
    assert!(harness.store.get_item("g").await.unwrap().is_some());
    assert!(harness.store.get_item("c").await.unwrap().is_none());
    assert!(!harness.keys().await.iter().any(|k| k.contains(&c_id)));
}

#[tokio::test]
async fn test_cycle_rejected() {
    let harness = TestHarness::new();
    harness.add_items(&[Item::role("p"), Item::role("c")]).await;
    harness.link(&[("p", "c")]).await;
    let p = Item::role("p");
    let c = Item::role("c");

    let err = harness.store.add_child(&c, &p).await.unwrap_err();
    assert!(matches!(err, Error::LoopDetected { .. }));
    assert_eq!(
        err.to_string(),
        "Cannot add 'p' as a child of 'c'. A loop has been detected."
    );

    let err = harness.store.add_child(&p, &p).await.unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { .. }));
    assert!(harness.store.get_parents("p").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_type_constraint() {
    let harness = blog_fixture().await;
    let err = harness
        .store
        .add_child(&Item::permission("posts.create"), &Item::role("author"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { .. }));
    assert!(
        !harness
            .store
            .can_add_child(&Item::permission("posts.create"), &Item::role("author"))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_diamond_is_not_a_cycle() {
    let harness = TestHarness::new();
    harness
        .add_items(&[
            Item::role("top"),
            Item::role("left"),
            Item::role("right"),
            Item::permission("bottom"),
        ])
        .await;
    harness
        .link(&[("top", "left"), ("top", "right"), ("left", "bottom")])
        .await;

    assert!(
        harness
            .store
            .can_add_child(&Item::role("right"), &Item::permission("bottom"))
            .await
            .unwrap()
    );
    harness.link(&[("right", "bottom")]).await;
    assert_eq!(harness.store.get_parents("bottom").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_deep_chain_cycle_detected() {
    let harness = TestHarness::new();
    let names: Vec<String> = (0..200).map(|i| format!("r{i:03}")).collect();
    for name in &names {
        harness.store.add_item(&Item::role(name.as_str())).await.unwrap();
    }
    for pair in names.windows(2) {
        harness
            .store
            .add_child(&Item::role(pair[0].as_str()), &Item::role(pair[1].as_str()))
            .await
            .unwrap();
    }

    let last = Item::role(names[199].as_str());
    let first = Item::role(names[0].as_str());
    assert!(!harness.store.can_add_child(&last, &first).await.unwrap());
}

#[tokio::test]
async fn test_removing_parent_keeps_children() {
    let harness = blog_fixture().await;
    harness.link(&[("admin", "author"), ("admin", "posts.create")]).await;

    harness.store.remove_item("admin").await.unwrap();
    assert!(harness.store.get_parents("author").await.unwrap().is_empty());
    assert!(harness.store.get_item("author").await.unwrap().is_some());
    assert!(harness.store.get_item("posts.create").await.unwrap().is_some());
}
