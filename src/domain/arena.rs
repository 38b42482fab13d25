use std::fmt;
use std::sync::Arc;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::kind::{KindId, NodeKind};
use crate::domain::property::PropertySet;

/// Generation-checked handle to a node in a [`TreeArena`].
///
/// A handle to a removed node never resolves again, even if its slot is
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "#{slot}.{generation}")
    }
}

/// What a node hangs under: the root container or another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Container,
    Node(NodeId),
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Container => write!(f, "<root>"),
            Owner::Node(id) => write!(f, "{id}"),
        }
    }
}

/// Read access the property layer needs to resolve sibling references.
pub trait SiblingLookup {
    /// Children of `owner` in order; empty for an unknown node.
    fn children_of(&self, owner: Owner) -> &[NodeId];
    fn kind_of(&self, node: NodeId) -> Option<&KindId>;
    fn name_of(&self, node: NodeId) -> Option<&str>;
}

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug)]
pub struct TreeNode {
    /// Name, unique among the node's siblings
    pub name: String,
    /// Declared kind of this node
    pub kind: Arc<NodeKind>,
    /// Container or parent node this node is a child of
    pub owner: Owner,
    /// Child handles in display order
    pub children: Vec<NodeId>,
    /// Property cells, one per declared template
    pub properties: PropertySet,
}

impl TreeNode {
    pub fn new(
        name: impl Into<String>,
        kind: Arc<NodeKind>,
        owner: Owner,
        properties: PropertySet,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            owner,
            children: Vec::new(),
            properties,
        }
    }
}

/// Arena-based storage for every node of a model.
///
/// Uses a generational arena for memory-safe node handles and O(1) lookups.
/// Root nodes are listed in `roots`; every other node is listed in its
/// parent's `children`.
#[derive(Debug)]
pub struct TreeArena {
    arena: Arena<TreeNode>,
    roots: Vec<NodeId>,
}

impl Default for TreeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            roots: Vec::new(),
        }
    }

    /// Store `node` and append it to its owner's child list.
    ///
    /// A node whose owner is gone is still stored but unreachable; callers
    /// check the owner first.
    #[instrument(level = "trace", skip(self, node), fields(name = %node.name))]
    pub fn insert_node(&mut self, node: TreeNode) -> NodeId {
        let owner = node.owner;
        let node_idx = NodeId(self.arena.insert(node));

        match owner {
            Owner::Container => self.roots.push(node_idx),
            Owner::Node(parent_idx) => {
                if let Some(parent) = self.arena.get_mut(parent_idx.0) {
                    parent.children.push(node_idx);
                }
            }
        }

        node_idx
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_node(&self, idx: NodeId) -> Option<&TreeNode> {
        self.arena.get(idx.0)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_node_mut(&mut self, idx: NodeId) -> Option<&mut TreeNode> {
        self.arena.get_mut(idx.0)
    }

    pub fn contains(&self, idx: NodeId) -> bool {
        self.arena.contains(idx.0)
    }

    pub fn owner_exists(&self, owner: Owner) -> bool {
        match owner {
            Owner::Container => true,
            Owner::Node(id) => self.contains(id),
        }
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Names of `owner`'s children, optionally leaving one node out.
    pub fn sibling_names(&self, owner: Owner, excluding: Option<NodeId>) -> Vec<String> {
        self.children_of(owner)
            .iter()
            .filter(|&&child| Some(child) != excluding)
            .filter_map(|&child| self.get_node(child).map(|n| n.name.clone()))
            .collect()
    }

    /// Detach `idx` from its owner and free it together with its subtree.
    ///
    /// Returns the removed handles in post-order (descendants first).
    #[instrument(level = "trace", skip(self))]
    pub fn remove_subtree(&mut self, idx: NodeId) -> Vec<NodeId> {
        let Some(owner) = self.get_node(idx).map(|n| n.owner) else {
            return Vec::new();
        };
        match owner {
            Owner::Container => self.roots.retain(|&r| r != idx),
            Owner::Node(parent_idx) => {
                if let Some(parent) = self.arena.get_mut(parent_idx.0) {
                    parent.children.retain(|&c| c != idx);
                }
            }
        }

        let doomed: Vec<NodeId> = PostOrderIterator::new(self, &[idx])
            .map(|(id, _)| id)
            .collect();
        for &id in &doomed {
            self.arena.remove(id.0);
        }
        doomed
    }

    /// Pre-order traversal of every tree in the container.
    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self) -> TreeIterator {
        TreeIterator::new(self, &self.roots)
    }

    /// Pre-order traversal of the subtree rooted at `idx`.
    #[instrument(level = "trace", skip(self))]
    pub fn iter_subtree(&self, idx: NodeId) -> TreeIterator {
        TreeIterator::new(self, &[idx])
    }

    #[instrument(level = "trace", skip(self))]
    pub fn iter_postorder(&self) -> PostOrderIterator {
        PostOrderIterator::new(self, &self.roots)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.roots
            .iter()
            .map(|&root| self.calculate_depth(root))
            .max()
            .unwrap_or(0)
    }

    #[instrument(level = "trace", skip(self))]
    fn calculate_depth(&self, node_idx: NodeId) -> usize {
        if let Some(node) = self.get_node(node_idx) {
            1 + node
                .children
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }
}

impl SiblingLookup for TreeArena {
    fn children_of(&self, owner: Owner) -> &[NodeId] {
        match owner {
            Owner::Container => &self.roots,
            Owner::Node(id) => self
                .get_node(id)
                .map(|n| n.children.as_slice())
                .unwrap_or(&[]),
        }
    }

    fn kind_of(&self, node: NodeId) -> Option<&KindId> {
        self.get_node(node).map(|n| n.kind.id())
    }

    fn name_of(&self, node: NodeId) -> Option<&str> {
        self.get_node(node).map(|n| n.name.as_str())
    }
}

pub struct TreeIterator<'a> {
    arena: &'a TreeArena,
    stack: Vec<NodeId>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a TreeArena, starts: &[NodeId]) -> Self {
        // Reversed so the first start is visited first
        let stack = starts.iter().rev().copied().collect();
        Self { arena, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    arena: &'a TreeArena,
    stack: Vec<(NodeId, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(arena: &'a TreeArena, starts: &[NodeId]) -> Self {
        let stack = starts.iter().rev().map(|&s| (s, false)).collect();
        Self { arena, stack }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}
