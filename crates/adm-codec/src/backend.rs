//! Pluggable tree syntax.
//!
//! The codec decides which nodes and attributes represent the graph; a
//! [`TreeBackend`] only turns [`TreeNode`]s into text and back. Backends are
//! registered by name and chosen at runtime.

use std::collections::BTreeMap;
use std::sync::Arc;

use adm_model::TreeNode;

use crate::error::{CodecError, Result};
use crate::xml::QuickXmlBackend;

/// A text syntax for attributed trees.
pub trait TreeBackend: Send + Sync {
    /// Registry key, e.g. `"quick-xml"`.
    fn name(&self) -> &str;

    /// Parse a document into its root node.
    fn parse(&self, text: &[u8]) -> Result<TreeNode>;

    /// Serialize a root node into a document.
    fn serialize(&self, root: &TreeNode, indent: usize) -> Result<Vec<u8>>;
}

/// Named backends. The first registered backend is the default.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: BTreeMap<String, Arc<dyn TreeBackend>>,
    default: Option<String>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.backends.keys().collect::<Vec<_>>())
            .field("default", &self.default)
            .finish()
    }
}

impl BackendRegistry {
    /// An empty registry; encoding and decoding fail until a backend is
    /// registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in quick-xml backend.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(QuickXmlBackend::new());
        registry
    }

    /// Register `backend` under its name, replacing any previous one.
    pub fn register(&mut self, backend: impl TreeBackend + 'static) {
        let name = backend.name().to_string();
        tracing::debug!(backend = %name, "Registering tree backend");
        if self.default.is_none() {
            self.default = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(backend));
    }

    pub fn names(&self) -> Vec<&str> {
        self.backends.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TreeBackend>> {
        self.backends.get(name).cloned()
    }

    /// Resolve a backend by name, or the default when `name` is `None`.
    ///
    /// # Errors
    ///
    /// [`CodecError::NoBackend`] for an empty registry,
    /// [`CodecError::UnknownBackend`] for an unregistered name.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn TreeBackend>> {
        if self.backends.is_empty() {
            return Err(CodecError::NoBackend);
        }
        let name = match name {
            Some(name) => name,
            None => self.default.as_deref().ok_or(CodecError::NoBackend)?,
        };
        self.get(name)
            .ok_or_else(|| CodecError::UnknownBackend(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl TreeBackend for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn parse(&self, text: &[u8]) -> Result<TreeNode> {
            Ok(TreeNode::new(String::from_utf8_lossy(text)))
        }

        fn serialize(&self, root: &TreeNode, _indent: usize) -> Result<Vec<u8>> {
            Ok(root.name.clone().into_bytes())
        }
    }

    #[test]
    fn test_empty_registry_fails() {
        let registry = BackendRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(registry.resolve(None), Err(CodecError::NoBackend)));
        assert!(matches!(
            registry.resolve(Some("quick-xml")),
            Err(CodecError::NoBackend)
        ));
    }

    #[test]
    fn test_first_registered_is_default() {
        let mut registry = BackendRegistry::with_defaults();
        registry.register(Echo);
        assert_eq!(registry.names(), vec!["echo", "quick-xml"]);
        assert_eq!(registry.resolve(None).unwrap().name(), "quick-xml");
        assert_eq!(registry.resolve(Some("echo")).unwrap().name(), "echo");
        assert!(matches!(
            registry.resolve(Some("libxml")),
            Err(CodecError::UnknownBackend(name)) if name == "libxml"
        ));
    }
}
