//! Assignment symmetry between the user and role indices.

use fabryk_rbac::Item;

use crate::common::blog_fixture;

#[tokio::test]
async fn test_assignment_symmetry() {
    let harness = blog_fixture().await;
    let assignment = harness.store.assign("author", "u1").await.unwrap();

    let roles = harness.store.get_roles_by_user("u1").await.unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].name, "author");
    assert_eq!(
        harness.store.get_user_ids_by_role("author").await.unwrap(),
        vec!["u1"]
    );

    let user_side = harness.store.get_assignments("u1").await.unwrap();
    let role_side = harness.store.get_role_assignments("author").await.unwrap();
    assert_eq!(user_side, vec![assignment.clone()]);
    assert_eq!(role_side, vec![assignment]);
}

#[tokio::test]
async fn test_revoke_removes_both_sides() {
    let harness = blog_fixture().await;
    harness.store.assign("author", "u1").await.unwrap();

    assert!(harness.store.revoke("author", "u1").await.unwrap());
    assert!(harness.store.get_roles_by_user("u1").await.unwrap().is_empty());
    assert!(
        harness
            .store
            .get_user_ids_by_role("author")
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        !harness
            .keys()
            .await
            .iter()
            .any(|k| k.ends_with(":assignments"))
    );
}

#[tokio::test]
async fn test_revoke_all_clears_every_role() {
    let harness = blog_fixture().await;
    harness.store.assign("admin", "u1").await.unwrap();
    harness.store.assign("author", "u1").await.unwrap();
    harness.store.assign("author", "u2").await.unwrap();

    assert!(harness.store.revoke_all("u1").await.unwrap());

    assert!(harness.store.get_roles_by_user("u1").await.unwrap().is_empty());
    assert!(
        harness
            .store
            .get_user_ids_by_role("admin")
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        harness.store.get_user_ids_by_role("author").await.unwrap(),
        vec!["u2"]
    );
}

#[tokio::test]
async fn test_roles_materialize_current_record() {
    let harness = blog_fixture().await;
    harness.store.assign("admin", "u1").await.unwrap();
    harness
        .store
        .update_item("admin", &Item::role("admin").with_description("Root"))
        .await
        .unwrap();

    let roles = harness.store.get_roles_by_user("u1").await.unwrap();
    assert_eq!(roles[0].description.as_deref(), Some("Root"));
}
