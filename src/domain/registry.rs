//! Kind registry: resolves encoded (namespace, kind) pairs to declarations.
//!
//! Populated once at startup, then shared read-only behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::domain::encoding::NodeEncoding;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::kind::{KindId, NodeKind};
use crate::domain::property::PropertyValue;

#[derive(Debug, Default)]
pub struct ClassRegistry {
    kinds: Vec<Arc<NodeKind>>,
    index: HashMap<KindId, usize>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind under its own id. A second registration of the same
    /// id is rejected.
    pub fn register(&mut self, kind: NodeKind) -> DomainResult<Arc<NodeKind>> {
        let id = kind.id().clone();
        if self.index.contains_key(&id) {
            return Err(DomainError::DuplicateKind(id));
        }
        debug!("register kind {}", id);
        let kind = Arc::new(kind);
        self.index.insert(id, self.kinds.len());
        self.kinds.push(kind.clone());
        Ok(kind)
    }

    pub fn resolve(&self, namespace: &str, name: &str) -> DomainResult<Arc<NodeKind>> {
        self.resolve_id(&KindId::new(namespace, name))
    }

    pub fn resolve_id(&self, id: &KindId) -> DomainResult<Arc<NodeKind>> {
        self.index
            .get(id)
            .map(|&i| self.kinds[i].clone())
            .ok_or_else(|| DomainError::UnknownKind(id.clone()))
    }

    pub fn contains(&self, id: &KindId) -> bool {
        self.index.contains_key(id)
    }

    /// Registered kinds in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &Arc<NodeKind>> {
        self.kinds.iter()
    }

    /// Check that every child kind and reference target declared by a
    /// registered kind is itself registered.
    pub fn verify(&self) -> DomainResult<()> {
        for kind in &self.kinds {
            for child in kind.child_kinds() {
                self.resolve_id(child)?;
            }
            for (_, template) in kind.property_templates().iter() {
                if let PropertyValue::ObjectRef(r) = template {
                    self.resolve_id(r.target_kind())?;
                }
            }
        }
        Ok(())
    }

    /// Check that `encoding` would decode into a node of `kind` without error:
    /// every child kind and reference target resolves, every property is
    /// declared and well-formed.
    pub fn check_encoding(&self, kind: &NodeKind, encoding: &NodeEncoding) -> DomainResult<()> {
        kind.property_templates()
            .check(kind.id(), &encoding.props, self)?;
        for child in &encoding.children {
            let child_kind = self.resolve(&child.namespace, &child.kind)?;
            self.check_encoding(&child_kind, &child.node)?;
        }
        Ok(())
    }
}
