//! The object model: the root container and every operation on its nodes.
//!
//! All nodes live in one [`TreeArena`]. Naming on creation and on decode goes
//! through [`naming::increment`], so sibling names stay unique under every
//! mutation this module offers.

use std::collections::HashMap;
use std::fmt;
use std::iter;
use std::sync::Arc;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::arena::{NodeId, Owner, SiblingLookup, TreeArena, TreeNode};
use crate::domain::encoding::{ChildEncoding, ModelEncoding, NodeEncoding};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::kind::{KindId, NodeKind};
use crate::domain::naming;
use crate::domain::property::{EditorDescriptor, PropertySet, PropertyValue, Value};
use crate::domain::registry::ClassRegistry;

/// How a clone treats references that targeted nodes of the source subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferencePolicy {
    /// Re-resolve every reference by name in the clone's context.
    #[default]
    PreserveOriginal,
    /// Redirect references into the source subtree to the matching cloned node.
    RebindToClone,
}

/// What a failing decode leaves behind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecodePolicy {
    /// Validate the whole encoding first; a failing decode changes nothing.
    #[default]
    Discard,
    /// Decode eagerly and keep whatever was built before the failure.
    KeepPartial,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelOptions {
    pub references: ReferencePolicy,
    pub on_decode_error: DecodePolicy,
}

/// Receives structural change notifications, e.g. to auto-expand a view.
pub trait ModelObserver {
    fn node_inserted(&mut self, owner: Owner, node: NodeId, index: usize);

    fn node_removed(&mut self, owner: Owner, node: NodeId) {
        let _ = (owner, node);
    }
}

/// Entry of a node's context menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeAction {
    Insert(KindId),
    Clone,
    Remove,
}

impl fmt::Display for NodeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeAction::Insert(kind) => write!(f, "Insert {}", kind.name),
            NodeAction::Clone => write!(f, "Clone"),
            NodeAction::Remove => write!(f, "Remove"),
        }
    }
}

/// Root container of named, typed nodes.
pub struct Model {
    registry: Arc<ClassRegistry>,
    tree: TreeArena,
    options: ModelOptions,
    observers: Vec<Box<dyn ModelObserver>>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("tree", &self.tree)
            .field("options", &self.options)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Model {
    pub fn new(registry: Arc<ClassRegistry>) -> Self {
        Self::with_options(registry, ModelOptions::default())
    }

    pub fn with_options(registry: Arc<ClassRegistry>, options: ModelOptions) -> Self {
        Self {
            registry,
            tree: TreeArena::new(),
            options,
            observers: Vec::new(),
        }
    }

    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    pub fn options(&self) -> ModelOptions {
        self.options
    }

    pub fn set_options(&mut self, options: ModelOptions) {
        self.options = options;
    }

    pub fn tree(&self) -> &TreeArena {
        &self.tree
    }

    pub fn add_observer(&mut self, observer: Box<dyn ModelObserver>) {
        self.observers.push(observer);
    }

    pub fn roots(&self) -> &[NodeId] {
        self.tree.roots()
    }

    pub fn children(&self, owner: Owner) -> &[NodeId] {
        self.tree.children_of(owner)
    }

    pub fn node(&self, id: NodeId) -> DomainResult<&TreeNode> {
        self.tree.get_node(id).ok_or(DomainError::NodeNotFound(id))
    }

    pub fn name(&self, id: NodeId) -> DomainResult<&str> {
        self.node(id).map(|n| n.name.as_str())
    }

    pub fn owner_of(&self, id: NodeId) -> DomainResult<Owner> {
        self.node(id).map(|n| n.owner)
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Create a node of `kind` as the last child of `owner`.
    pub fn insert(&mut self, owner: Owner, kind: &KindId) -> DomainResult<NodeId> {
        let kind = self.registry.resolve_id(kind)?;
        self.construct(owner, kind)
    }

    /// Name the node against its future siblings, give it fresh property
    /// cells bound to `owner`, then append it.
    fn construct(&mut self, owner: Owner, kind: Arc<NodeKind>) -> DomainResult<NodeId> {
        if let Owner::Node(parent) = owner {
            if !self.tree.contains(parent) {
                return Err(DomainError::NodeNotFound(parent));
            }
        }
        let name = naming::increment(kind.standard_name(), self.tree.sibling_names(owner, None));
        let mut properties = kind.instantiate_properties();
        properties.bind_parent(owner, &self.tree);

        let id = self.tree.insert_node(TreeNode::new(name, kind, owner, properties));
        let index = self.tree.children_of(owner).len().saturating_sub(1);
        debug!("inserted {} under {} at {}", id, owner, index);
        for observer in self.observers.iter_mut() {
            observer.node_inserted(owner, id, index);
        }
        Ok(id)
    }

    /// Kinds a view may offer to insert under `owner`. Not enforced by
    /// [`Model::insert`].
    pub fn insertable_kinds(&self, owner: Owner) -> DomainResult<Vec<KindId>> {
        match owner {
            Owner::Container => Ok(self.registry.kinds().map(|k| k.id().clone()).collect()),
            Owner::Node(id) => Ok(self.node(id)?.kind.child_kinds().to_vec()),
        }
    }

    /// Detach a node and release its subtree. References to removed nodes
    /// read back as "no reference".
    pub fn remove(&mut self, id: NodeId) -> DomainResult<()> {
        let owner = self.owner_of(id)?;
        let removed = self.tree.remove_subtree(id);
        debug!("removed {} ({} nodes) from {}", id, removed.len(), owner);
        for observer in self.observers.iter_mut() {
            observer.node_removed(owner, id);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    fn property(&self, id: NodeId, name: &str) -> DomainResult<&PropertyValue> {
        let node = self.node(id)?;
        node.properties
            .get(name)
            .ok_or_else(|| DomainError::UnknownProperty {
                kind: node.kind.id().clone(),
                property: name.to_string(),
            })
    }

    /// Run `f` on a node's property set with read access to the tree.
    ///
    /// The set is moved out of the node for the duration of the call; sibling
    /// lookups only read names, kinds and children.
    fn with_properties<T>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut PropertySet, &TreeArena) -> DomainResult<T>,
    ) -> DomainResult<T> {
        let node = self
            .tree
            .get_node_mut(id)
            .ok_or(DomainError::NodeNotFound(id))?;
        let mut properties = std::mem::take(&mut node.properties);
        let result = f(&mut properties, &self.tree);
        if let Some(node) = self.tree.get_node_mut(id) {
            node.properties = properties;
        }
        result
    }

    fn with_property<T>(
        &mut self,
        id: NodeId,
        name: &str,
        f: impl FnOnce(&mut PropertyValue, &TreeArena) -> DomainResult<T>,
    ) -> DomainResult<T> {
        self.property(id, name)?;
        self.with_properties(id, |properties, tree| match properties.get_mut(name) {
            Some(cell) => f(cell, tree),
            None => Err(DomainError::NodeNotFound(id)),
        })
    }

    pub fn get(&self, id: NodeId, name: &str) -> DomainResult<Value> {
        Ok(self.property(id, name)?.get(&self.tree))
    }

    pub fn set(&mut self, id: NodeId, name: &str, value: Value) -> DomainResult<()> {
        self.with_property(id, name, |cell, tree| cell.set(name, value, tree))
    }

    pub fn apply_edited_value(&mut self, id: NodeId, name: &str, raw: &str) -> DomainResult<()> {
        self.with_property(id, name, |cell, tree| cell.apply_edited_value(name, raw, tree))
    }

    pub fn describe_editor(&self, id: NodeId, name: &str) -> DomainResult<EditorDescriptor> {
        Ok(self.property(id, name)?.describe_editor(&self.tree))
    }

    pub fn display_value(&self, id: NodeId, name: &str) -> DomainResult<String> {
        Ok(self.property(id, name)?.display(&self.tree))
    }

    /// Live candidates of an object reference; empty for other variants.
    pub fn potential_targets(&self, id: NodeId, name: &str) -> DomainResult<Vec<NodeId>> {
        Ok(self
            .property(id, name)?
            .as_object_ref()
            .map(|r| r.potential_targets(&self.tree))
            .unwrap_or_default())
    }

    // ------------------------------------------------------------------
    // Encode / decode / clone
    // ------------------------------------------------------------------

    pub fn encode(&self, id: NodeId) -> DomainResult<NodeEncoding> {
        let node = self.node(id)?;
        let children = node
            .children
            .iter()
            .map(|&child| -> DomainResult<ChildEncoding> {
                let kind = self.node(child)?.kind.id();
                Ok(ChildEncoding::new(kind, self.encode(child)?))
            })
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(NodeEncoding {
            text: node.name.clone(),
            children,
            props: node.properties.encode(&self.tree),
        })
    }

    pub fn encode_all(&self) -> DomainResult<ModelEncoding> {
        let roots = self
            .roots()
            .iter()
            .map(|&root| -> DomainResult<ChildEncoding> {
                Ok(ChildEncoding::new(self.node(root)?.kind.id(), self.encode(root)?))
            })
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(ModelEncoding { roots })
    }

    /// Restore a node from `encoding`: rename, decode properties, then build
    /// and decode each encoded child in order. Existing children are kept.
    #[instrument(level = "debug", skip(self, encoding), fields(text = %encoding.text))]
    pub fn decode(&mut self, id: NodeId, encoding: &NodeEncoding) -> DomainResult<()> {
        let kind = self.node(id)?.kind.clone();
        if self.options.on_decode_error == DecodePolicy::Discard {
            self.registry.check_encoding(&kind, encoding)?;
        }
        self.decode_unchecked(id, encoding)
    }

    fn decode_unchecked(&mut self, id: NodeId, encoding: &NodeEncoding) -> DomainResult<()> {
        let (owner, kind) = {
            let node = self.node(id)?;
            (node.owner, node.kind.id().clone())
        };

        let name = naming::increment(&encoding.text, self.tree.sibling_names(owner, Some(id)));
        if let Some(node) = self.tree.get_node_mut(id) {
            node.name = name;
        }

        // Properties before children: references to not-yet-built children
        // decode to "no reference".
        let registry = self.registry.clone();
        self.with_properties(id, |properties, tree| {
            properties.decode(&kind, &encoding.props, &registry, tree)
        })?;

        for child in &encoding.children {
            let child_kind = self.registry.resolve(&child.namespace, &child.kind)?;
            let child_id = self.construct(Owner::Node(id), child_kind)?;
            self.decode_unchecked(child_id, &child.node)?;
        }
        Ok(())
    }

    /// Build a node of `kind` under `owner` and decode `encoding` into it.
    pub fn insert_encoded(
        &mut self,
        owner: Owner,
        kind: &KindId,
        encoding: &NodeEncoding,
    ) -> DomainResult<NodeId> {
        let kind = self.registry.resolve_id(kind)?;
        self.insert_encoded_kind(owner, kind, encoding)
    }

    fn insert_encoded_kind(
        &mut self,
        owner: Owner,
        kind: Arc<NodeKind>,
        encoding: &NodeEncoding,
    ) -> DomainResult<NodeId> {
        let discard = self.options.on_decode_error == DecodePolicy::Discard;
        if discard {
            self.registry.check_encoding(&kind, encoding)?;
        }
        let id = self.construct(owner, kind)?;
        if let Err(err) = self.decode_unchecked(id, encoding) {
            if discard {
                self.remove(id)?;
            }
            return Err(err);
        }
        Ok(id)
    }

    /// Append every encoded root to the container.
    pub fn decode_all(&mut self, encoding: &ModelEncoding) -> DomainResult<Vec<NodeId>> {
        if self.options.on_decode_error == DecodePolicy::Discard {
            for root in &encoding.roots {
                let kind = self.registry.resolve(&root.namespace, &root.kind)?;
                self.registry.check_encoding(&kind, &root.node)?;
            }
        }
        encoding
            .roots
            .iter()
            .map(|root| self.insert_encoded(Owner::Container, &root.kind_id(), &root.node))
            .collect()
    }

    /// Deep-copy a node as its own last sibling.
    ///
    /// The copy gets a fresh name, then the source's encoding is decoded into
    /// it, which re-disambiguates names and re-resolves references in the
    /// copy's context.
    #[instrument(level = "debug", skip(self))]
    pub fn clone_node(&mut self, id: NodeId) -> DomainResult<NodeId> {
        let encoding = self.encode(id)?;
        let (owner, kind) = {
            let node = self.node(id)?;
            (node.owner, node.kind.clone())
        };
        let clone = self.insert_encoded_kind(owner, kind, &encoding)?;
        if self.options.references == ReferencePolicy::RebindToClone {
            self.rebind_references(id, clone)?;
        }
        debug!("cloned {} as {}", id, clone);
        Ok(clone)
    }

    /// Point references of the clone that targeted a node of the source
    /// subtree at the corresponding node of the clone subtree.
    fn rebind_references(&mut self, source: NodeId, clone: NodeId) -> DomainResult<()> {
        let pairs: Vec<(NodeId, NodeId)> = self
            .tree
            .iter_subtree(source)
            .map(|(id, _)| id)
            .zip(self.tree.iter_subtree(clone).map(|(id, _)| id))
            .collect();
        let mapping: HashMap<NodeId, NodeId> = pairs.iter().copied().collect();

        for &(original, copy) in &pairs {
            let redirects: Vec<(String, NodeId)> = self
                .node(original)?
                .properties
                .iter()
                .filter_map(|(name, cell)| {
                    let target = cell.as_object_ref()?.get(&self.tree)?;
                    mapping.get(&target).map(|&mapped| (name.to_string(), mapped))
                })
                .collect();
            for (name, target) in redirects {
                self.set(copy, &name, Value::Reference(Some(target)))?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Presentation helpers
    // ------------------------------------------------------------------

    /// Context menu entries: one insert per allowed child kind, then clone and
    /// remove.
    pub fn context_actions(&self, id: NodeId) -> DomainResult<Vec<NodeAction>> {
        let node = self.node(id)?;
        Ok(node
            .kind
            .child_kinds()
            .iter()
            .cloned()
            .map(NodeAction::Insert)
            .chain([NodeAction::Clone, NodeAction::Remove])
            .collect())
    }

    /// Execute a context menu entry; returns the node it created, if any.
    pub fn perform(&mut self, id: NodeId, action: &NodeAction) -> DomainResult<Option<NodeId>> {
        match action {
            NodeAction::Insert(kind) => self.insert(Owner::Node(id), kind).map(Some),
            NodeAction::Clone => self.clone_node(id).map(Some),
            NodeAction::Remove => self.remove(id).map(|_| None),
        }
    }

    /// Resolve a slash-separated path of names, e.g. `A/B1`.
    pub fn find_path(&self, path: &str) -> Option<NodeId> {
        let mut owner = Owner::Container;
        let mut found = None;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let next = self
                .children(owner)
                .iter()
                .copied()
                .find(|&child| self.tree.name_of(child) == Some(segment))?;
            owner = Owner::Node(next);
            found = Some(next);
        }
        found
    }

    pub fn path_of(&self, id: NodeId) -> DomainResult<String> {
        let mut names = Vec::new();
        let mut current = Owner::Node(id);
        while let Owner::Node(node_id) = current {
            let node = self.node(node_id)?;
            names.push(node.name.as_str());
            current = node.owner;
        }
        Ok(names.iter().rev().join("/"))
    }

    /// Check the sibling-name invariant over the whole container.
    ///
    /// A duplicate means an operation bypassed the naming policy; it is
    /// reported as an invariant violation, not repaired.
    pub fn validate(&self) -> DomainResult<()> {
        let owners =
            iter::once(Owner::Container).chain(self.tree.iter().map(|(id, _)| Owner::Node(id)));
        for owner in owners {
            let names = self.tree.sibling_names(owner, None);
            if let Some(name) = names.iter().duplicates().next() {
                let owner = match owner {
                    Owner::Container => owner.to_string(),
                    Owner::Node(id) => self.path_of(id)?,
                };
                return Err(DomainError::NameCollision {
                    owner,
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<ClassRegistry> {
        let mut registry = ClassRegistry::new();
        registry
            .register(
                NodeKind::builder("test", "Dir")
                    .child_kind(KindId::new("test", "Dir"))
                    .build(),
            )
            .unwrap();
        Arc::new(registry)
    }

    fn dir() -> KindId {
        KindId::new("test", "Dir")
    }

    #[test]
    fn given_nested_nodes_when_asking_path_then_joins_names() {
        let mut model = Model::new(registry());
        let root = model.insert(Owner::Container, &dir()).unwrap();
        let child = model.insert(Owner::Node(root), &dir()).unwrap();
        let grandchild = model.insert(Owner::Node(child), &dir()).unwrap();

        assert_eq!(model.path_of(grandchild).unwrap(), "Dir/Dir/Dir");
        assert_eq!(model.find_path("Dir/Dir/Dir"), Some(grandchild));
        assert_eq!(model.tree().depth(), 3);
    }

    #[test]
    fn given_bypassed_naming_when_validating_then_reports_collision() {
        let mut model = Model::new(registry());
        let root = model.insert(Owner::Container, &dir()).unwrap();
        model.insert(Owner::Node(root), &dir()).unwrap();
        let second = model.insert(Owner::Node(root), &dir()).unwrap();
        model.validate().unwrap();

        model.tree.get_node_mut(second).unwrap().name = "Dir".to_string();

        assert_eq!(
            model.validate().unwrap_err(),
            DomainError::NameCollision {
                owner: "Dir".to_string(),
                name: "Dir".to_string(),
            }
        );
    }

    #[test]
    fn given_removed_node_when_operating_then_node_not_found() {
        let mut model = Model::new(registry());
        let root = model.insert(Owner::Container, &dir()).unwrap();
        model.remove(root).unwrap();

        assert_eq!(model.remove(root), Err(DomainError::NodeNotFound(root)));
        assert_eq!(
            model.insert(Owner::Node(root), &dir()),
            Err(DomainError::NodeNotFound(root))
        );
        assert!(model.clone_node(root).is_err());
        assert!(model.tree().is_empty());
    }
}
