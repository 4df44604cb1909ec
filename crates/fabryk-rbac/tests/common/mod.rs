//! Common harness for RBAC integration tests.

use fabryk_rbac::{Item, ItemKind, RbacConfig, RbacStore, Rule};
use fabryk_redis::{KvStore, MemoryStore};
use std::sync::Arc;

/// Store over a fresh in-memory engine, with direct engine access for
/// inspecting raw keys.
pub struct TestHarness {
    /// Store under test
    pub store: RbacStore,
    /// Engine backing `store`
    pub engine: Arc<MemoryStore>,
}

impl TestHarness {
    /// Empty store with the default key layout.
    pub fn new() -> Self {
        Self::with_config(&RbacConfig::default())
    }

    /// Empty store with a custom configuration.
    pub fn with_config(config: &RbacConfig) -> Self {
        let engine = Arc::new(MemoryStore::new());
        let store = RbacStore::with_config(engine.clone(), config).expect("valid config");
        Self { store, engine }
    }

    /// Internal id of an item, which must exist.
    pub async fn item_id(&self, name: &str) -> String {
        self.store
            .resolve_id(fabryk_rbac::EntityKind::Item, name)
            .await
            .unwrap()
            .expect("item should be bound")
    }

    /// Members of the Type Index for `kind`, sorted.
    pub async fn type_index(&self, kind: ItemKind) -> Vec<String> {
        let mut ids = self
            .engine
            .smembers(&self.store.keys().type_items(kind))
            .await
            .unwrap();
        ids.sort();
        ids
    }

    /// Every key in the namespace.
    pub async fn keys(&self) -> Vec<String> {
        self.store.keys_under_namespace().await.unwrap()
    }

    /// Add the given items in order.
    pub async fn add_items(&self, items: &[Item]) {
        for item in items {
            self.store.add_item(item).await.unwrap();
        }
    }

    /// Link each `(parent, child)` pair, looking up stored kinds by name.
    pub async fn link(&self, edges: &[(&str, &str)]) {
        for (parent, child) in edges {
            let parent = self.store.get_item(parent).await.unwrap().unwrap();
            let child = self.store.get_item(child).await.unwrap().unwrap();
            self.store.add_child(&parent, &child).await.unwrap();
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A blog-style fixture: two roles, two permissions, one rule.
pub async fn blog_fixture() -> TestHarness {
    let harness = TestHarness::new();
    harness
        .store
        .add_rule(&Rule::new("isAuthor").with_data(br#"{"field":"author_id"}"#.to_vec()))
        .await
        .unwrap();
    harness
        .add_items(&[
            Item::role("admin").with_description("Site administrator"),
            Item::role("author"),
            Item::permission("posts.create"),
            Item::permission("posts.update.own").with_rule("isAuthor"),
        ])
        .await;
    harness
}
