//! Typed property cells and the ordered per-node property set.
//!
//! Text and numeric cells are self-contained. Object references point at a
//! sibling node and need a [`SiblingLookup`] to resolve their live set of
//! potential targets; they never own the node they reference.

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::arena::{NodeId, Owner, SiblingLookup};
use crate::domain::encoding::{ObjectRefEncoding, PropertyEncoding};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::kind::KindId;
use crate::domain::registry::ClassRegistry;

/// Text shown for an object reference that points at nothing.
pub const NO_REFERENCE: &str = "None";

/// Variant tag of a property; fixed at declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Text,
    Numeric,
    ObjectRef,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKind::Text => write!(f, "text"),
            PropertyKind::Numeric => write!(f, "numeric"),
            PropertyKind::ObjectRef => write!(f, "object reference"),
        }
    }
}

/// Typed value read from or written to a property.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Reference(Option<NodeId>),
}

impl Value {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Value::Text(_) => PropertyKind::Text,
            Value::Number(_) => PropertyKind::Numeric,
            Value::Reference(_) => PropertyKind::ObjectRef,
        }
    }
}

/// Edit affordance a view should offer for a property.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorDescriptor {
    LineEdit { text: String },
    SpinBox { value: f64 },
    ComboBox {
        options: Vec<String>,
        selected: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextProperty {
    value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericProperty {
    value: f64,
}

/// Reference to a sibling node of `target_kind`.
///
/// Holds the owner whose children are candidate targets and a
/// generation-checked handle to the selected one. A handle whose node is gone
/// or has left the candidate set reads as "no reference".
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRefProperty {
    target_kind: KindId,
    owner: Option<Owner>,
    current: Option<NodeId>,
}

impl ObjectRefProperty {
    pub fn target_kind(&self) -> &KindId {
        &self.target_kind
    }

    pub fn owner(&self) -> Option<Owner> {
        self.owner
    }

    /// Bind the owner whose children are candidates and default to the first
    /// candidate, if any.
    pub fn bind_parent(&mut self, owner: Owner, lookup: &impl SiblingLookup) {
        self.owner = Some(owner);
        self.current = self.potential_targets(lookup).first().copied();
    }

    /// Children of the bound owner that are of the target kind, in order.
    pub fn potential_targets(&self, lookup: &impl SiblingLookup) -> Vec<NodeId> {
        let Some(owner) = self.owner else {
            return Vec::new();
        };
        lookup
            .children_of(owner)
            .iter()
            .copied()
            .filter(|&child| lookup.kind_of(child) == Some(&self.target_kind))
            .collect()
    }

    pub fn get(&self, lookup: &impl SiblingLookup) -> Option<NodeId> {
        self.current
            .filter(|node| self.potential_targets(lookup).contains(node))
    }

    pub fn target_name(&self, lookup: &impl SiblingLookup) -> Option<String> {
        self.get(lookup)
            .and_then(|node| lookup.name_of(node).map(str::to_string))
    }

    fn find_by_name(&self, name: &str, lookup: &impl SiblingLookup) -> Option<NodeId> {
        self.potential_targets(lookup)
            .into_iter()
            .find(|&node| lookup.name_of(node) == Some(name))
    }
}

/// A property cell: one of the supported variants.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(TextProperty),
    Numeric(NumericProperty),
    ObjectRef(ObjectRefProperty),
}

impl PropertyValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(TextProperty {
            value: value.into(),
        })
    }

    pub fn numeric(value: f64) -> Self {
        Self::Numeric(NumericProperty { value })
    }

    /// Unbound reference template; instances are bound on node construction.
    pub fn object_ref(target_kind: KindId) -> Self {
        Self::ObjectRef(ObjectRefProperty {
            target_kind,
            owner: None,
            current: None,
        })
    }

    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Text(_) => PropertyKind::Text,
            Self::Numeric(_) => PropertyKind::Numeric,
            Self::ObjectRef(_) => PropertyKind::ObjectRef,
        }
    }

    pub fn as_object_ref(&self) -> Option<&ObjectRefProperty> {
        match self {
            Self::ObjectRef(r) => Some(r),
            _ => None,
        }
    }

    pub fn get(&self, lookup: &impl SiblingLookup) -> Value {
        match self {
            Self::Text(p) => Value::Text(p.value.clone()),
            Self::Numeric(p) => Value::Number(p.value),
            Self::ObjectRef(p) => Value::Reference(p.get(lookup)),
        }
    }

    /// Store a typed value. On error the cell is left unchanged.
    pub fn set(&mut self, name: &str, value: Value, lookup: &impl SiblingLookup) -> DomainResult<()> {
        match (self, value) {
            (Self::Text(p), Value::Text(v)) => {
                p.value = v;
                Ok(())
            }
            (Self::Numeric(p), Value::Number(v)) => {
                p.value = check_finite(name, v)?;
                Ok(())
            }
            (Self::ObjectRef(p), Value::Reference(target)) => {
                if let Some(node) = target {
                    if !p.potential_targets(lookup).contains(&node) {
                        return Err(DomainError::validation(
                            name,
                            format!("{node} is not a {} sibling", p.target_kind),
                        ));
                    }
                }
                p.current = target;
                Ok(())
            }
            (cell, value) => Err(DomainError::validation(
                name,
                format!("expected a {} value, got {}", cell.kind(), value.kind()),
            )),
        }
    }

    /// Text form as shown in a property table.
    pub fn display(&self, lookup: &impl SiblingLookup) -> String {
        match self {
            Self::Text(p) => p.value.clone(),
            Self::Numeric(p) => p.value.to_string(),
            Self::ObjectRef(p) => p
                .target_name(lookup)
                .unwrap_or_else(|| NO_REFERENCE.to_string()),
        }
    }

    pub fn describe_editor(&self, lookup: &impl SiblingLookup) -> EditorDescriptor {
        match self {
            Self::Text(p) => EditorDescriptor::LineEdit {
                text: p.value.clone(),
            },
            Self::Numeric(p) => EditorDescriptor::SpinBox { value: p.value },
            Self::ObjectRef(p) => {
                let targets = p.potential_targets(lookup);
                let current = p.get(lookup);
                EditorDescriptor::ComboBox {
                    selected: current.and_then(|c| targets.iter().position(|&t| t == c)),
                    options: targets
                        .iter()
                        .filter_map(|&t| lookup.name_of(t).map(str::to_string))
                        .collect(),
                }
            }
        }
    }

    /// Commit raw text coming back from an editor widget.
    ///
    /// Numbers are parsed; references are looked up by name among the
    /// current candidates, with `"None"` or an empty string clearing them.
    pub fn apply_edited_value(
        &mut self,
        name: &str,
        raw: &str,
        lookup: &impl SiblingLookup,
    ) -> DomainResult<()> {
        let value = match &*self {
            Self::Text(_) => Value::Text(raw.to_string()),
            Self::Numeric(_) => Value::Number(parse_number(name, raw)?),
            Self::ObjectRef(p) => {
                let raw = raw.trim();
                if raw.is_empty() || raw == NO_REFERENCE {
                    Value::Reference(None)
                } else {
                    let node = p.find_by_name(raw, lookup).ok_or_else(|| {
                        DomainError::validation(
                            name,
                            format!("no {} sibling named '{raw}'", p.target_kind),
                        )
                    })?;
                    Value::Reference(Some(node))
                }
            }
        };
        self.set(name, value, lookup)
    }

    pub fn encode(&self, lookup: &impl SiblingLookup) -> PropertyEncoding {
        match self {
            Self::Text(p) => PropertyEncoding::Scalar(p.value.clone()),
            Self::Numeric(p) => PropertyEncoding::Scalar(p.value.to_string()),
            Self::ObjectRef(p) => PropertyEncoding::ObjectRef(ObjectRefEncoding {
                target: p.target_name(lookup),
                kind: p.target_kind.name.clone(),
                namespace: p.target_kind.namespace.clone(),
            }),
        }
    }

    /// Verify that `encoding` would decode into this cell without error.
    pub fn check(
        &self,
        name: &str,
        encoding: &PropertyEncoding,
        registry: &ClassRegistry,
    ) -> DomainResult<()> {
        match (self, encoding) {
            (Self::Text(_), PropertyEncoding::Scalar(_)) => Ok(()),
            (Self::Numeric(_), PropertyEncoding::Scalar(raw)) => parse_number(name, raw).map(|_| ()),
            (Self::ObjectRef(_), PropertyEncoding::ObjectRef(r)) => {
                registry.resolve_id(&r.target_kind()).map(|_| ())
            }
            (cell, _) => Err(DomainError::EncodingMismatch {
                property: name.to_string(),
                expected: encoding_shape(cell.kind()),
            }),
        }
    }

    /// Restore state from `encoding`. On error the cell is left unchanged.
    ///
    /// A referenced name missing from the current candidates decodes to "no
    /// reference": the sibling may simply not exist yet.
    pub fn decode(
        &mut self,
        name: &str,
        encoding: &PropertyEncoding,
        registry: &ClassRegistry,
        lookup: &impl SiblingLookup,
    ) -> DomainResult<()> {
        self.check(name, encoding, registry)?;
        match (self, encoding) {
            (Self::Text(p), PropertyEncoding::Scalar(raw)) => p.value = raw.clone(),
            (Self::Numeric(p), PropertyEncoding::Scalar(raw)) => p.value = parse_number(name, raw)?,
            (Self::ObjectRef(p), PropertyEncoding::ObjectRef(r)) => {
                p.target_kind = registry.resolve_id(&r.target_kind())?.id().clone();
                p.current = r
                    .target
                    .as_deref()
                    .and_then(|target| p.find_by_name(target, lookup));
            }
            _ => unreachable!("shape verified by check"),
        }
        Ok(())
    }
}

fn encoding_shape(kind: PropertyKind) -> &'static str {
    match kind {
        PropertyKind::Text | PropertyKind::Numeric => "a string",
        PropertyKind::ObjectRef => "a { target, kind, namespace } table",
    }
}

fn parse_number(name: &str, raw: &str) -> DomainResult<f64> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| DomainError::validation(name, format!("'{raw}' is not a number")))?;
    check_finite(name, value)
}

fn check_finite(name: &str, value: f64) -> DomainResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DomainError::validation(name, format!("{value} is not a finite number")))
    }
}

/// Ordered, named collection of property cells owned by one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySet {
    entries: Vec<(String, PropertyValue)>,
}

impl PropertySet {
    /// Add a property, replacing an existing one of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut PropertyValue> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut PropertyValue)> {
        self.entries.iter_mut().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bind every object reference to `owner`.
    pub fn bind_parent(&mut self, owner: Owner, lookup: &impl SiblingLookup) {
        for (_, value) in self.entries.iter_mut() {
            if let PropertyValue::ObjectRef(r) = value {
                r.bind_parent(owner, lookup);
            }
        }
    }

    pub fn encode(&self, lookup: &impl SiblingLookup) -> BTreeMap<String, PropertyEncoding> {
        self.entries
            .iter()
            .map(|(name, value)| (name.clone(), value.encode(lookup)))
            .collect()
    }

    /// Verify every encoded property names a declared cell of matching shape.
    pub fn check(
        &self,
        kind: &KindId,
        encoded: &BTreeMap<String, PropertyEncoding>,
        registry: &ClassRegistry,
    ) -> DomainResult<()> {
        for (name, encoding) in encoded {
            let cell = self.get(name).ok_or_else(|| DomainError::UnknownProperty {
                kind: kind.clone(),
                property: name.clone(),
            })?;
            cell.check(name, encoding, registry)?;
        }
        Ok(())
    }

    /// Decode the encoded properties; properties absent from the encoding keep
    /// their current value.
    pub fn decode(
        &mut self,
        kind: &KindId,
        encoded: &BTreeMap<String, PropertyEncoding>,
        registry: &ClassRegistry,
        lookup: &impl SiblingLookup,
    ) -> DomainResult<()> {
        for (name, encoding) in encoded {
            let cell = self.get_mut(name).ok_or_else(|| DomainError::UnknownProperty {
                kind: kind.clone(),
                property: name.clone(),
            })?;
            cell.decode(name, encoding, registry, lookup)?;
        }
        Ok(())
    }
}
