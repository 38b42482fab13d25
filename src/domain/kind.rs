//! Node kinds: identity and per-kind declarations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::property::{PropertySet, PropertyValue};

/// Identifies a node kind by namespace and name, as carried in encodings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KindId {
    pub namespace: String,
    pub name: String,
}

impl KindId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.namespace, self.name)
    }
}

/// Static declaration of a node kind.
///
/// Carries the standard name new instances start from, the kinds that may be
/// inserted below an instance, and the ordered property templates every
/// instance receives a fresh copy of.
#[derive(Debug, Clone)]
pub struct NodeKind {
    id: KindId,
    standard_name: String,
    child_kinds: Vec<KindId>,
    properties: PropertySet,
}

impl NodeKind {
    /// Start declaring a kind. The standard name defaults to `name`.
    pub fn builder(namespace: impl Into<String>, name: impl Into<String>) -> NodeKindBuilder {
        let id = KindId::new(namespace, name);
        NodeKindBuilder {
            kind: NodeKind {
                standard_name: id.name.clone(),
                id,
                child_kinds: Vec::new(),
                properties: PropertySet::default(),
            },
        }
    }

    pub fn id(&self) -> &KindId {
        &self.id
    }

    pub fn standard_name(&self) -> &str {
        &self.standard_name
    }

    pub fn child_kinds(&self) -> &[KindId] {
        &self.child_kinds
    }

    pub fn property_templates(&self) -> &PropertySet {
        &self.properties
    }

    /// Fresh, independent property cells for a new instance.
    pub fn instantiate_properties(&self) -> PropertySet {
        self.properties.clone()
    }
}

/// Builder returned by [`NodeKind::builder`].
#[derive(Debug)]
pub struct NodeKindBuilder {
    kind: NodeKind,
}

impl NodeKindBuilder {
    pub fn standard_name(mut self, name: impl Into<String>) -> Self {
        self.kind.standard_name = name.into();
        self
    }

    pub fn child_kind(mut self, kind: KindId) -> Self {
        if !self.kind.child_kinds.contains(&kind) {
            self.kind.child_kinds.push(kind);
        }
        self
    }

    pub fn text(self, name: impl Into<String>, initial: impl Into<String>) -> Self {
        self.property(name, PropertyValue::text(initial))
    }

    pub fn numeric(self, name: impl Into<String>, initial: f64) -> Self {
        self.property(name, PropertyValue::numeric(initial))
    }

    pub fn object_ref(self, name: impl Into<String>, target_kind: KindId) -> Self {
        self.property(name, PropertyValue::object_ref(target_kind))
    }

    /// Declare a property from an arbitrary template. Redeclaring a name
    /// replaces the earlier template in place.
    pub fn property(mut self, name: impl Into<String>, template: PropertyValue) -> Self {
        self.kind.properties.insert(name, template);
        self
    }

    pub fn build(self) -> NodeKind {
        self.kind
    }
}
