//! # Collaborator Interfaces
//!
//! The executor reaches the outside world only through these traits and
//! [`docproof_relay::RelayConnector`]:
//!
//! - [`SecretStore`]: the user's persistent secret from secure storage.
//! - [`ProtocolState`]: read-only tree snapshots and the nullifier
//!   registry.
//!
//! In-memory implementations back the CLI and the tests.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use docproof_circuits::TreeRegistry;
use docproof_core::{DocumentCategory, PipelineError};
use docproof_crypto::{FieldElement, TreeSnapshot, UserSecret};
use serde::Deserialize;

/// Secure storage holding the user's secret material.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// The persistent user secret. `None` when none has been provisioned.
    async fn get_secret(&self) -> Result<Option<UserSecret>, PipelineError>;

    /// The device private key, if one exists.
    async fn get_private_key(&self) -> Result<Option<Vec<u8>>, PipelineError>;
}

/// Protocol data a session reads while proving.
#[async_trait]
pub trait ProtocolState: Send + Sync {
    /// Trees for `category`. The returned snapshot stays fixed for the
    /// whole session.
    async fn fetch_trees(&self, category: DocumentCategory) -> Result<Arc<TreeRegistry>, PipelineError>;

    /// Whether `nullifier` has already been registered.
    async fn is_nullifier_registered(
        &self,
        category: DocumentCategory,
        nullifier: &FieldElement,
    ) -> Result<bool, PipelineError>;
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

/// A secret held in memory.
#[derive(Clone, Default)]
pub struct MemorySecretStore {
    secret: Option<UserSecret>,
    private_key: Option<Vec<u8>>,
}

impl MemorySecretStore {
    pub fn new(secret: UserSecret) -> Self {
        Self {
            secret: Some(secret),
            private_key: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemorySecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySecretStore")
            .field("has_secret", &self.secret.is_some())
            .finish()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get_secret(&self) -> Result<Option<UserSecret>, PipelineError> {
        Ok(self.secret.clone())
    }

    async fn get_private_key(&self) -> Result<Option<Vec<u8>>, PipelineError> {
        Ok(self.private_key.clone())
    }
}

/// Protocol state frozen from a snapshot file.
#[derive(Default)]
pub struct StaticProtocolState {
    trees: Arc<TreeRegistry>,
    registered: HashSet<FieldElement>,
}

/// On-disk form: tree snapshots per category plus registered nullifiers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolSnapshot {
    #[serde(default)]
    pub trees: Vec<CategoryTree>,
    #[serde(default)]
    pub registered_nullifiers: Vec<FieldElement>,
}

/// One tree snapshot bound to a document category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryTree {
    pub category: DocumentCategory,
    #[serde(flatten)]
    pub tree: TreeSnapshot,
}

impl StaticProtocolState {
    pub fn new(trees: TreeRegistry, registered: impl IntoIterator<Item = FieldElement>) -> Self {
        Self {
            trees: Arc::new(trees),
            registered: registered.into_iter().collect(),
        }
    }

    /// Build every tree in `snapshot`.
    pub fn from_snapshot(snapshot: &ProtocolSnapshot) -> Result<Self, PipelineError> {
        let mut trees = TreeRegistry::new();
        for entry in &snapshot.trees {
            let tree = entry.tree.build()?;
            tracing::info!(
                category = %entry.category,
                kind = %tree.kind(),
                leaves = entry.tree.leaves.len(),
                root = %tree.root(),
                "tree built from snapshot"
            );
            trees.insert(entry.category, tree);
        }
        Ok(Self::new(trees, snapshot.registered_nullifiers.iter().copied()))
    }
}

#[async_trait]
impl ProtocolState for StaticProtocolState {
    async fn fetch_trees(&self, _category: DocumentCategory) -> Result<Arc<TreeRegistry>, PipelineError> {
        Ok(Arc::clone(&self.trees))
    }

    async fn is_nullifier_registered(
        &self,
        _category: DocumentCategory,
        nullifier: &FieldElement,
    ) -> Result<bool, PipelineError> {
        Ok(self.registered.contains(nullifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docproof_circuits::TreeLookup;
    use docproof_crypto::TreeKind;

    #[tokio::test]
    async fn snapshot_builds_trees_per_category() {
        let leaf = FieldElement::from_u64(42);
        let json = serde_json::json!({
            "trees": [{
                "category": "passport",
                "kind": "commitment",
                "leaves": [{"key": leaf, "value": leaf}],
            }],
            "registered_nullifiers": [FieldElement::from_u64(7)],
        });
        let snapshot: ProtocolSnapshot = serde_json::from_value(json).unwrap();
        let state = StaticProtocolState::from_snapshot(&snapshot).unwrap();

        let trees = state.fetch_trees(DocumentCategory::Passport).await.unwrap();
        let tree = trees.get_tree(DocumentCategory::Passport, "commitment").unwrap();
        assert_eq!(tree.kind(), TreeKind::Commitment);
        assert!(trees.get_tree(DocumentCategory::IdCard, "commitment").is_err());

        let seven = FieldElement::from_u64(7);
        assert!(state.is_nullifier_registered(DocumentCategory::Passport, &seven).await.unwrap());
        assert!(!state.is_nullifier_registered(DocumentCategory::Passport, &leaf).await.unwrap());
    }

    #[tokio::test]
    async fn empty_store_has_no_secret() {
        assert!(MemorySecretStore::empty().get_secret().await.unwrap().is_none());
        let store = MemorySecretStore::new(UserSecret::new(vec![1, 2, 3]));
        assert_eq!(store.get_secret().await.unwrap().unwrap().expose(), [1, 2, 3]);
        assert!(!format!("{store:?}").contains("1, 2, 3"));
    }
}
